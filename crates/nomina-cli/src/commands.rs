//! Subcommand implementations. Each returns the rendered output; the caller
//! decides where it goes.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nomina_calculator::trace::amount;
use nomina_calculator::{EvaluationError, EvaluationLimits, EvaluationResult, Evaluator, validate};
use nomina_core::{FormulaRegistry, PayrollReport, PayrollRun};
use nomina_types::{ClassRecord, EvaluationContext, Formula, FormulaAssignment, Id};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::cli::OutputFormat;
use crate::config::NominaConfig;

/// Rendered command output and, when the command did not succeed, why.
#[derive(Debug)]
pub struct CommandOutput {
    pub body: String,
    pub failure: Option<String>,
}

impl CommandOutput {
    fn success(body: String) -> Self {
        Self { body, failure: None }
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing '{}'", path.display()))
}

#[instrument(skip_all, fields(formula = %formula_path.display()))]
pub fn evaluate(
    formula_path: &Path,
    context_path: &Path,
    limits: EvaluationLimits,
    format: OutputFormat,
) -> Result<CommandOutput> {
    let formula: Formula = read_json(formula_path)?;
    let context: EvaluationContext = read_json(context_path)?;
    let result = Evaluator::new(limits).evaluate(&formula, &context);

    let body = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Text => render_evaluation(&result)?,
    };
    let failure = result
        .error
        .as_ref()
        .map(|error| format!("evaluation of formula '{}' failed: {}", formula.id, error.code()));
    Ok(CommandOutput { body, failure })
}

fn render_evaluation(result: &EvaluationResult) -> Result<String, fmt::Error> {
    let mut out = String::new();
    match (&result.amount, &result.error) {
        (_, Some(error)) => {
            writeln!(out, "Error {}: {error}", error.code())?;
        }
        (Some(payment), None) => {
            writeln!(out, "Payment: {}", amount(*payment))?;
        }
        (None, None) => {}
    }
    if let (Some(kind), Some(rate)) = (&result.tariff_type, result.applied_rate) {
        writeln!(out, "Tariff: {kind} at {} per reservation", amount(rate))?;
        writeln!(
            out,
            "Minimum applied: {}, maximum applied: {}",
            yes_no(result.minimum_applied),
            yes_no(result.maximum_applied)
        )?;
    }
    if let Some(bonus) = result.bonus {
        writeln!(out, "Bonus (not included): {}", amount(bonus))?;
    }
    writeln!(out, "Steps:")?;
    for (n, step) in result.steps.iter().enumerate() {
        writeln!(out, "  {:>2}. {step}", n + 1)?;
    }
    Ok(out)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FormulaFile {
    One(Formula),
    Many(Vec<Formula>),
}

#[derive(Serialize)]
struct ValidationEntry<'a> {
    #[serde(rename = "formulaId")]
    formula_id: &'a Id,
    #[serde(rename = "valido")]
    valid: bool,
    error: Option<EvaluationError>,
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn validate_formulas(
    path: &Path,
    limits: EvaluationLimits,
    format: OutputFormat,
) -> Result<CommandOutput> {
    let formulas = match read_json(path)? {
        FormulaFile::One(formula) => vec![formula],
        FormulaFile::Many(formulas) => formulas,
    };

    let entries: Vec<_> = formulas
        .iter()
        .map(|formula| {
            let error = validate::validate(formula, &limits).err();
            ValidationEntry { formula_id: &formula.id, valid: error.is_none(), error }
        })
        .collect();
    let invalid = entries.iter().filter(|entry| !entry.valid).count();
    info!(formulas = entries.len(), invalid, "formulas validated");

    let body = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&entries)?,
        OutputFormat::Text => render_validation(&entries)?,
    };

    let failure = (invalid > 0).then(|| format!("{invalid} of {} formulas invalid", entries.len()));
    Ok(CommandOutput { body, failure })
}

fn render_validation(entries: &[ValidationEntry<'_>]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for entry in entries {
        match &entry.error {
            None => writeln!(out, "{}: ok", entry.formula_id)?,
            Some(error) => writeln!(out, "{}: {} {error}", entry.formula_id, error.code())?,
        }
    }
    Ok(out)
}

#[instrument(skip_all)]
pub fn payroll(
    formulas_path: &Path,
    classes_path: &Path,
    config: &NominaConfig,
    format: OutputFormat,
    strict: bool,
) -> Result<CommandOutput> {
    let assignments: Vec<FormulaAssignment> = read_json(formulas_path)?;
    let classes: Vec<ClassRecord> = read_json(classes_path)?;
    let registry = FormulaRegistry::from_assignments(assignments);
    info!(formulas = registry.len(), classes = classes.len(), "starting payroll");

    let evaluator = Evaluator::new(config.evaluation.limits());
    let report =
        PayrollRun::new(&registry, evaluator, config.payroll.payroll_config()).run(&classes);

    let body = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => render_report(&report)?,
    };
    let failure = (strict && !report.is_complete())
        .then(|| format!("{} classes could not be paid", report.failures.len()));
    Ok(CommandOutput { body, failure })
}

fn render_report(report: &PayrollReport) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Payroll run {} ({})", report.run_id, report.generated_at.to_rfc3339())?;
    writeln!(
        out,
        "Paid classes: {}, failed classes: {}",
        report.payments.len(),
        report.failures.len()
    )?;
    writeln!(out)?;
    writeln!(out, "{:<20}{:>8}{:>16}{:>14}", "Instructor", "Classes", "Amount", "Bonus")?;
    for total in &report.totals {
        writeln!(
            out,
            "{:<20}{:>8}{:>16}{:>14}",
            total.instructor_id.as_str(),
            total.classes,
            amount(total.amount),
            amount(total.bonus)
        )?;
    }
    writeln!(
        out,
        "{:<20}{:>8}{:>16}{:>14}",
        "Total",
        report.payments.len(),
        amount(report.total),
        amount(report.bonus_total)
    )?;

    if !report.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failures:")?;
        for failure in &report.failures {
            writeln!(
                out,
                "  class {} (instructor {}): {} {}",
                failure.class_id, failure.instructor_id, failure.code, failure.message
            )?;
        }
    }
    Ok(out)
}

pub fn show_config(config: &NominaConfig) -> Result<CommandOutput> {
    Ok(CommandOutput::success(config.to_toml_string()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomina_types::{Decimal, InstructorCategory};

    #[test]
    fn text_evaluation_lists_every_step() {
        let result = EvaluationResult {
            amount: Some(Decimal::from(80)),
            applied_rate: Some(Decimal::from(4)),
            tariff_type: Some("Hasta 30 reservas".to_string()),
            minimum_applied: false,
            maximum_applied: false,
            bonus: Some(Decimal::from(40)),
            steps: vec!["uno".to_string(), "dos".to_string()],
            error: None,
        };

        let text = render_evaluation(&result).unwrap();
        assert!(text.starts_with("Payment: 80\n"));
        assert!(text.contains("Tariff: Hasta 30 reservas at 4 per reservation"));
        assert!(text.contains("Bonus (not included): 40"));
        assert!(text.contains("   2. dos"));
    }

    #[test]
    fn text_validation_has_one_line_per_formula() {
        let ok = Id::from("ok");
        let broken = Id::from("roto");
        let entries = [
            ValidationEntry { formula_id: &ok, valid: true, error: None },
            ValidationEntry {
                formula_id: &broken,
                valid: false,
                error: Some(EvaluationError::DivisionByZero { node: "q".to_string() }),
            },
        ];

        let text = render_validation(&entries).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "ok: ok");
        assert!(lines[1].starts_with("roto: DIVISION_BY_ZERO_ERROR "));
    }

    #[test]
    fn text_report_has_a_total_row() {
        let registry = FormulaRegistry::new();
        let class = ClassRecord {
            id: "c1".into(),
            instructor_id: "ana".into(),
            discipline_id: "d".into(),
            period_id: "p".into(),
            category: InstructorCategory::Instructor,
            reservations: 3,
            capacity: 10,
            waitlist: 0,
            courtesies: 0,
            paid_reservations: 0,
        };
        let report = PayrollRun::new(&registry, Evaluator::default(), Default::default())
            .run(&[class]);

        let text = render_report(&report).unwrap();
        assert!(text.contains("Paid classes: 0, failed classes: 1"));
        assert!(text.contains("class c1 (instructor ana): MISSING_FORMULA_ERROR"));
        assert!(text.lines().any(|line| line.starts_with("Total")));
    }
}
