//! Batch payroll
//!
//! A run looks up the formula for every class by `(discipline, period)`,
//! evaluates it and folds the outcomes into a [`PayrollReport`]. Per-class
//! failures are collected, never fatal. Above
//! [`PayrollConfig::parallel_threshold`] classes are evaluated on a rayon pool;
//! outcomes are always reported in input order, so the report is the same
//! whichever path ran.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use nomina_calculator::trace::amount as amount_text;
use nomina_calculator::{EvaluationError, EvaluationResult, Evaluator};
use nomina_types::{ClassRecord, Decimal, Formula, Id};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::FailureReason;
use crate::registry::FormulaRegistry;

/// Batch evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayrollConfig {
    /// Minimum number of classes to evaluate in parallel.
    /// Smaller batches run on the calling thread.
    pub parallel_threshold: usize,

    /// Worker threads for parallel evaluation
    pub max_workers: usize,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 256,
            max_workers: num_cpus::get(),
        }
    }
}

/// Payment for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPayment {
    #[serde(rename = "claseId")]
    pub class_id: Id,
    #[serde(rename = "instructorId")]
    pub instructor_id: Id,
    #[serde(rename = "formulaId")]
    pub formula_id: Id,
    #[serde(rename = "montoPago")]
    pub amount: Decimal,
    #[serde(rename = "tarifaAplicada")]
    pub applied_rate: Option<Decimal>,
    #[serde(rename = "tipoTarifa")]
    pub tariff_type: Option<String>,
    #[serde(rename = "minimoAplicado")]
    pub minimum_applied: bool,
    #[serde(rename = "maximoAplicado")]
    pub maximum_applied: bool,
    #[serde(rename = "bonoAplicado")]
    pub bonus: Option<Decimal>,
    #[serde(rename = "detalleCalculo")]
    pub steps: Vec<String>,
}

/// A class that could not be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailure {
    #[serde(rename = "claseId")]
    pub class_id: Id,
    #[serde(rename = "instructorId")]
    pub instructor_id: Id,
    /// Formula that failed; absent when none was registered
    #[serde(rename = "formulaId")]
    pub formula_id: Option<Id>,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "detalleCalculo", default)]
    pub steps: Vec<String>,
}

impl PaymentFailure {
    fn new(
        class: &ClassRecord,
        formula: Option<&Formula>,
        reason: FailureReason,
        steps: Vec<String>,
    ) -> Self {
        Self {
            class_id: class.id.clone(),
            instructor_id: class.instructor_id.clone(),
            formula_id: formula.map(|f| f.id.clone()),
            code: reason.code().to_string(),
            message: reason.to_string(),
            steps,
        }
    }

    fn unfolded(payment: ClassPayment, reason: FailureReason) -> Self {
        Self {
            class_id: payment.class_id,
            instructor_id: payment.instructor_id,
            formula_id: Some(payment.formula_id),
            code: reason.code().to_string(),
            message: reason.to_string(),
            steps: payment.steps,
        }
    }
}

/// Paid classes and amounts for one instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorTotal {
    #[serde(rename = "instructorId")]
    pub instructor_id: Id,
    /// Classes paid; failed classes are not counted
    #[serde(rename = "clases")]
    pub classes: usize,
    #[serde(rename = "montoTotal")]
    pub amount: Decimal,
    /// Bonuses, kept apart from `amount`
    #[serde(rename = "bonoTotal")]
    pub bonus: Decimal,
}

/// Result of a payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollReport {
    #[serde(rename = "ejecucionId")]
    pub run_id: Uuid,
    #[serde(rename = "generadoEn")]
    pub generated_at: DateTime<Utc>,
    /// Successful payments, in input order
    #[serde(rename = "pagos")]
    pub payments: Vec<ClassPayment>,
    /// Failed classes, in input order
    #[serde(rename = "fallos")]
    pub failures: Vec<PaymentFailure>,
    /// One entry per paid instructor, ordered by instructor id
    #[serde(rename = "totalesPorInstructor")]
    pub totals: Vec<InstructorTotal>,
    /// Sum of all payments, bonuses excluded
    #[serde(rename = "totalGeneral")]
    pub total: Decimal,
    #[serde(rename = "bonoTotal")]
    pub bonus_total: Decimal,
}

impl PayrollReport {
    fn from_outcomes(outcomes: Vec<Result<ClassPayment, PaymentFailure>>) -> Self {
        let mut payments = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        let mut totals: BTreeMap<Id, InstructorTotal> = BTreeMap::new();
        let mut total = Decimal::ZERO;
        let mut bonus_total = Decimal::ZERO;

        for outcome in outcomes {
            match outcome {
                Ok(payment) => {
                    let bonus = payment.bonus.unwrap_or_default();
                    let instructor = totals
                        .get(&payment.instructor_id)
                        .map_or((Decimal::ZERO, Decimal::ZERO), |t| (t.amount, t.bonus));
                    let folded = add_payment(instructor, payment.amount, bonus)
                        .zip(add_payment((total, bonus_total), payment.amount, bonus));

                    let Some(((paid, paid_bonus), (new_total, new_bonus_total))) = folded else {
                        let reason = FailureReason::TotalOverflow {
                            instructor_id: payment.instructor_id.clone(),
                            amount: amount_text(payment.amount),
                        };
                        warn!(class = %payment.class_id, code = reason.code(), "class not paid");
                        failures.push(PaymentFailure::unfolded(payment, reason));
                        continue;
                    };

                    let entry = totals.entry(payment.instructor_id.clone()).or_insert_with(|| {
                        InstructorTotal {
                            instructor_id: payment.instructor_id.clone(),
                            classes: 0,
                            amount: Decimal::ZERO,
                            bonus: Decimal::ZERO,
                        }
                    });
                    entry.classes += 1;
                    entry.amount = paid;
                    entry.bonus = paid_bonus;
                    total = new_total;
                    bonus_total = new_bonus_total;
                    payments.push(payment);
                }
                Err(failure) => failures.push(failure),
            }
        }

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            payments,
            failures,
            totals: totals.into_values().collect(),
            total,
            bonus_total,
        }
    }

    /// Totals for one instructor, if any of their classes was paid.
    pub fn instructor(&self, instructor_id: &Id) -> Option<&InstructorTotal> {
        self.totals.iter().find(|t| &t.instructor_id == instructor_id)
    }

    /// True when every class was paid.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Adds a payment and its bonus to a pair of running sums; `None` on overflow.
fn add_payment(
    (sum, bonus_sum): (Decimal, Decimal),
    amount: Decimal,
    bonus: Decimal,
) -> Option<(Decimal, Decimal)> {
    Some((sum.checked_add(amount)?, bonus_sum.checked_add(bonus)?))
}

/// One payroll batch over a formula registry.
#[derive(Debug, Clone)]
pub struct PayrollRun<'a> {
    registry: &'a FormulaRegistry,
    evaluator: Evaluator,
    config: PayrollConfig,
}

impl<'a> PayrollRun<'a> {
    pub fn new(registry: &'a FormulaRegistry, evaluator: Evaluator, config: PayrollConfig) -> Self {
        Self { registry, evaluator, config }
    }

    /// Pays every class. Never fails as a whole; see [`PayrollReport::failures`].
    #[instrument(skip_all, fields(classes = classes.len()))]
    pub fn run(&self, classes: &[ClassRecord]) -> PayrollReport {
        let start = Instant::now();
        let report = PayrollReport::from_outcomes(self.evaluate_all(classes));

        info!(
            run_id = %report.run_id,
            paid = report.payments.len(),
            failed = report.failures.len(),
            total = %report.total,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "payroll run finished"
        );
        report
    }

    fn evaluate_all(&self, classes: &[ClassRecord]) -> Vec<Result<ClassPayment, PaymentFailure>> {
        if classes.len() < self.config.parallel_threshold || self.config.max_workers <= 1 {
            debug!(classes = classes.len(), "evaluating sequentially");
            return classes.iter().map(|class| self.pay(class)).collect();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(self.config.max_workers).build() {
            Ok(pool) => {
                debug!(
                    classes = classes.len(),
                    workers = self.config.max_workers,
                    "evaluating in parallel"
                );
                pool.install(|| classes.par_iter().map(|class| self.pay(class)).collect())
            }
            Err(error) => {
                warn!(%error, "worker pool unavailable, evaluating sequentially");
                classes.iter().map(|class| self.pay(class)).collect()
            }
        }
    }

    fn pay(&self, class: &ClassRecord) -> Result<ClassPayment, PaymentFailure> {
        let Some(formula) = self.registry.get(&class.discipline_id, &class.period_id) else {
            let reason = FailureReason::MissingFormula {
                discipline_id: class.discipline_id.clone(),
                period_id: class.period_id.clone(),
            };
            warn!(class = %class.id, code = reason.code(), "class not paid");
            return Err(PaymentFailure::new(class, None, reason, Vec::new()));
        };

        let EvaluationResult {
            amount,
            applied_rate,
            tariff_type,
            minimum_applied,
            maximum_applied,
            bonus,
            steps,
            error,
        } = self.evaluator.evaluate(formula, &class.context());

        let amount = match (amount, error) {
            (_, Some(error)) => Err(FailureReason::from(error)),
            (Some(amount), None) => Ok(amount),
            (None, None) => Err(FailureReason::from(EvaluationError::Configuration {
                message: "evaluation produced no amount".to_string(),
            })),
        };

        match amount {
            Ok(amount) => Ok(ClassPayment {
                class_id: class.id.clone(),
                instructor_id: class.instructor_id.clone(),
                formula_id: formula.id.clone(),
                amount,
                applied_rate,
                tariff_type,
                minimum_applied,
                maximum_applied,
                bonus,
                steps,
            }),
            Err(reason) => {
                warn!(
                    class = %class.id,
                    formula = %formula.id,
                    code = reason.code(),
                    "class not paid"
                );
                Err(PaymentFailure::new(class, Some(formula), reason, steps))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomina_types::{FormulaAssignment, InstructorCategory, Node, TariffParams, Tier};

    fn registry() -> FormulaRegistry {
        let params = TariffParams::new(vec![Tier::new(30, Decimal::from(4))], Decimal::from(5))
            .with_bonus(Decimal::ONE);
        FormulaRegistry::from_assignments([FormulaAssignment {
            discipline_id: "cycling".into(),
            period_id: "p1".into(),
            formula: Formula::new("f1", "Cycling")
                .with_node(Node::tariff("t", [(InstructorCategory::Instructor, params)]))
                .with_result("t"),
        }])
    }

    fn class(id: &str, instructor: &str, discipline: &str, reservations: u32) -> ClassRecord {
        ClassRecord {
            id: id.into(),
            instructor_id: instructor.into(),
            discipline_id: discipline.into(),
            period_id: "p1".into(),
            category: InstructorCategory::Instructor,
            reservations,
            capacity: 40,
            waitlist: 0,
            courtesies: 0,
            paid_reservations: 0,
        }
    }

    #[test]
    fn totals_group_by_instructor_and_keep_bonus_apart() {
        let registry = registry();
        let run = PayrollRun::new(&registry, Evaluator::default(), PayrollConfig::default());
        let report = run.run(&[
            class("c1", "ana", "cycling", 10),
            class("c2", "ana", "cycling", 20),
            class("c3", "luis", "cycling", 40),
        ]);

        assert!(report.is_complete());
        let ana = report.instructor(&"ana".into()).unwrap();
        assert_eq!(ana.classes, 2);
        assert_eq!(ana.amount, Decimal::from(120));
        assert_eq!(ana.bonus, Decimal::from(30));

        assert_eq!(report.total, Decimal::from(320));
        assert_eq!(report.bonus_total, Decimal::from(70));
    }

    #[test]
    fn missing_formula_fails_only_that_class() {
        let registry = registry();
        let run = PayrollRun::new(&registry, Evaluator::default(), PayrollConfig::default());
        let report = run.run(&[class("c1", "ana", "yoga", 10), class("c2", "ana", "cycling", 10)]);

        assert_eq!(report.payments.len(), 1);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.class_id, Id::from("c1"));
        assert_eq!(failure.code, "MISSING_FORMULA_ERROR");
        assert_eq!(failure.formula_id, None);
    }

    #[test]
    fn evaluation_error_is_reported_with_its_trace() {
        let registry = registry();
        let run = PayrollRun::new(&registry, Evaluator::default(), PayrollConfig::default());
        let mut senior = class("c1", "ana", "cycling", 10);
        senior.category = InstructorCategory::EmbajadorSenior;

        let report = run.run(&[senior]);
        let failure = &report.failures[0];
        assert_eq!(failure.code, "MISSING_PARAMETERS_ERROR");
        assert_eq!(failure.formula_id, Some(Id::from("f1")));
        assert!(failure.steps.last().is_some_and(|s| s.starts_with("Error: ")));
    }

    #[test]
    fn payment_that_overflows_the_totals_becomes_a_failure() {
        let registry = FormulaRegistry::from_assignments([FormulaAssignment {
            discipline_id: "max".into(),
            period_id: "p1".into(),
            formula: Formula::new("tope", "Tope")
                .with_node(Node::constant("m", Decimal::MAX))
                .with_result("m"),
        }]);
        let run = PayrollRun::new(&registry, Evaluator::default(), PayrollConfig::default());
        let report = run.run(&[
            class("c1", "ana", "max", 1),
            class("c2", "luis", "max", 1),
            class("c3", "luis", "cycling", 1),
        ]);

        assert_eq!(report.payments.len(), 1);
        assert_eq!(report.total, Decimal::MAX);
        let failure = &report.failures[0];
        assert_eq!(failure.class_id, Id::from("c2"));
        assert_eq!(failure.code, "OVERFLOW_ERROR");
        assert_eq!(failure.formula_id, Some(Id::from("tope")));
        assert_eq!(report.failures[1].code, "MISSING_FORMULA_ERROR");
        assert!(report.instructor(&"luis".into()).is_none());
    }
}
