//! The payment formula evaluator.
//!
//! A formula is a graph of nodes (context inputs, constants, arithmetic,
//! conditionals and tiered tariff tables) wired by id. This crate evaluates such
//! a graph against one class's attendance and returns the instructor's payment,
//! the tariff decisions behind it and a readable trace of the calculation.
//!
//! Evaluation is a pure function of `(Formula, EvaluationContext)`: the
//! evaluator keeps no state between calls, so any number of evaluations can run
//! concurrently.

#![deny(clippy::all)]

pub mod error;
pub mod evaluator;
pub mod graph;
pub mod result;
pub mod tariff;
pub mod trace;
pub mod validate;

pub use error::EvaluationError;
pub use evaluator::{EvaluationLimits, Evaluator};
pub use result::EvaluationResult;
pub use tariff::{TariffKind, TariffOutcome, select_rate};
pub use trace::CalculationTrace;

use nomina_types::{EvaluationContext, Formula};

/// Evaluates `formula` against `context` with the default limits.
pub fn evaluate(formula: &Formula, context: &EvaluationContext) -> EvaluationResult {
    Evaluator::default().evaluate(formula, context)
}

/// Checks a formula's structure with the default limits. See [`validate::validate`].
pub fn validate_formula(formula: &Formula) -> Result<(), EvaluationError> {
    validate::validate(formula, &EvaluationLimits::default())
}
