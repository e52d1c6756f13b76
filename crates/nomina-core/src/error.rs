//! Per-class failure reasons for payroll runs.

use nomina_calculator::EvaluationError;
use nomina_types::Id;
use thiserror::Error;

/// Why a single class could not be paid.
///
/// A failure never stops the run; it is reported next to the successful
/// payments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No formula is registered for the class's discipline and period
    #[error("no formula registered for discipline '{discipline_id}' in period '{period_id}'")]
    MissingFormula { discipline_id: Id, period_id: Id },

    /// The formula was found but its evaluation failed
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The payment was computed but adding it to the run totals overflows
    #[error("payment of {amount} overflows the totals for instructor '{instructor_id}'")]
    TotalOverflow { instructor_id: Id, amount: String },
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::MissingFormula { .. } => "MISSING_FORMULA_ERROR",
            FailureReason::Evaluation(error) => error.code(),
            FailureReason::TotalOverflow { .. } => "OVERFLOW_ERROR",
        }
    }

    /// True when the class itself is fine and only configuration is missing.
    pub fn is_configuration_gap(&self) -> bool {
        matches!(
            self,
            FailureReason::MissingFormula { .. }
                | FailureReason::Evaluation(EvaluationError::MissingParameters { .. })
        )
    }
}
