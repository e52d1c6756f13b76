use nomina_types::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::tariff::TariffOutcome;
use crate::trace::CalculationTrace;

/// Outcome of evaluating one formula against one class.
///
/// Exactly one of `amount` and `error` is set. The tariff fields describe the
/// last tariff node evaluated, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Payment after all clamps. Never includes the bonus.
    #[serde(rename = "montoPago", alias = "valor")]
    pub amount: Option<Decimal>,
    #[serde(rename = "tarifaAplicada")]
    pub applied_rate: Option<Decimal>,
    /// e.g. `"Hasta 30 reservas"` or `"Full House"`
    #[serde(rename = "tipoTarifa")]
    pub tariff_type: Option<String>,
    #[serde(rename = "minimoAplicado")]
    pub minimum_applied: bool,
    #[serde(rename = "maximoAplicado")]
    pub maximum_applied: bool,
    /// Bonus for separate accounting
    #[serde(rename = "bonoAplicado")]
    pub bonus: Option<Decimal>,
    /// Human-readable calculation steps, in order
    #[serde(rename = "detalleCalculo", alias = "pasos")]
    pub steps: Vec<String>,
    pub error: Option<EvaluationError>,
}

impl EvaluationResult {
    pub(crate) fn success(
        amount: Decimal,
        tariff: Option<TariffOutcome>,
        trace: CalculationTrace,
    ) -> Self {
        let mut result = Self {
            amount: Some(amount),
            applied_rate: None,
            tariff_type: None,
            minimum_applied: false,
            maximum_applied: false,
            bonus: None,
            steps: trace.into_steps(),
            error: None,
        };
        if let Some(outcome) = tariff {
            result.applied_rate = Some(outcome.rate);
            result.tariff_type = Some(outcome.kind.to_string());
            result.minimum_applied = outcome.minimum_applied;
            result.maximum_applied = outcome.maximum_applied;
            result.bonus = outcome.bonus;
        }
        result
    }

    pub(crate) fn failure(error: EvaluationError, trace: CalculationTrace) -> Self {
        Self {
            amount: None,
            applied_rate: None,
            tariff_type: None,
            minimum_applied: false,
            maximum_applied: false,
            bonus: None,
            steps: trace.into_steps(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
