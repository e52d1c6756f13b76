//! Tariff table resolution.
//!
//! Policy, in this exact order:
//! 1. A class is full house when reservations >= capacity; it pays the full-house rate.
//! 2. Otherwise tiers are scanned by ascending threshold and the first tier with
//!    `reservations <= threshold` wins.
//! 3. No covering tier falls back to the full-house rate, tagged as a default.
//! 4. Amount = rate * reservations, plus the fixed fee when positive.
//! 5. The guaranteed minimum (when positive) raises the amount, then the maximum
//!    lowers it. Both can fire; the maximum has the last word.
//! 6. The bonus is computed separately and never added to the amount.

use std::fmt;

use nomina_types::{Decimal, TariffParams};
use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::trace::{CalculationTrace, amount};

/// Why a rate was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffKind {
    /// Reservations reached capacity.
    FullHouse,
    /// First tier covering the reservation count.
    Tier { threshold: u32 },
    /// No tier covered the count and the class was not full.
    DefaultFullHouse,
}

impl fmt::Display for TariffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TariffKind::FullHouse => f.write_str("Full House"),
            TariffKind::Tier { threshold } => write!(f, "Hasta {threshold} reservas"),
            TariffKind::DefaultFullHouse => f.write_str("Full House (por defecto)"),
        }
    }
}

/// Full breakdown of one tariff node evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TariffOutcome {
    pub kind: TariffKind,
    /// Rate applied per reservation
    pub rate: Decimal,
    /// `rate * reservations`, before fee and clamps
    pub base_amount: Decimal,
    /// Final amount after fee and clamps
    pub amount: Decimal,
    pub minimum_applied: bool,
    pub maximum_applied: bool,
    /// Bonus reported alongside, not included in `amount`
    pub bonus: Option<Decimal>,
}

/// Selects the rate for a reservation count. Pure; used by [`apply`].
pub fn select_rate(
    params: &TariffParams,
    reservations: Decimal,
    capacity: Decimal,
) -> (TariffKind, Decimal) {
    if reservations >= capacity {
        return (TariffKind::FullHouse, params.full_house_rate);
    }

    params
        .sorted_tiers()
        .into_iter()
        .find(|tier| reservations <= Decimal::from(tier.threshold))
        .map(|tier| (TariffKind::Tier { threshold: tier.threshold }, tier.rate))
        .unwrap_or((TariffKind::DefaultFullHouse, params.full_house_rate))
}

/// Applies a tariff parameter set, recording each decision in `trace`.
pub fn apply(
    node: &str,
    params: &TariffParams,
    reservations: Decimal,
    capacity: Decimal,
    trace: &mut CalculationTrace,
) -> Result<TariffOutcome, EvaluationError> {
    let overflow = || EvaluationError::Overflow { node: node.to_string() };

    trace.record(format!(
        "Reservaciones: {} de {} lugares",
        amount(reservations),
        amount(capacity)
    ));

    let (kind, rate) = select_rate(params, reservations, capacity);
    match kind {
        TariffKind::FullHouse => trace.record(format!(
            "Full House ({} >= {}): tarifa {}",
            amount(reservations),
            amount(capacity),
            amount(rate)
        )),
        TariffKind::Tier { .. } => {
            trace.record(format!("Tarifa seleccionada: {kind} ({} por reserva)", amount(rate)))
        }
        TariffKind::DefaultFullHouse => trace.record(format!(
            "Ningún tramo cubre {} reservas: {kind}, tarifa {}",
            amount(reservations),
            amount(rate)
        )),
    }

    let base_amount = rate.checked_mul(reservations).ok_or_else(overflow)?;
    trace.record(format!(
        "Monto base: {} x {} = {}",
        amount(rate),
        amount(reservations),
        amount(base_amount)
    ));

    let mut total = base_amount;
    if params.fixed_fee > Decimal::ZERO {
        total = total.checked_add(params.fixed_fee).ok_or_else(overflow)?;
        trace.record(format!("Cuota fija: +{} = {}", amount(params.fixed_fee), amount(total)));
    }

    let mut minimum_applied = false;
    if params.guaranteed_minimum > Decimal::ZERO && total < params.guaranteed_minimum {
        trace.record(format!(
            "Mínimo garantizado aplicado: {} -> {}",
            amount(total),
            amount(params.guaranteed_minimum)
        ));
        total = params.guaranteed_minimum;
        minimum_applied = true;
    }

    let mut maximum_applied = false;
    if let Some(maximum) = params.maximum {
        if total > maximum {
            trace.record(format!("Máximo aplicado: {} -> {}", amount(total), amount(maximum)));
            total = maximum;
            maximum_applied = true;
        }
    }

    let bonus = if params.bonus_per_reservation > Decimal::ZERO {
        let bonus = params.bonus_per_reservation.checked_mul(reservations).ok_or_else(overflow)?;
        trace.record(format!(
            "Bono: {} x {} = {} (no incluido en el pago)",
            amount(params.bonus_per_reservation),
            amount(reservations),
            amount(bonus)
        ));
        Some(bonus)
    } else {
        None
    };

    Ok(TariffOutcome {
        kind,
        rate,
        base_amount,
        amount: total,
        minimum_applied,
        maximum_applied,
        bonus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomina_types::Tier;

    fn params() -> TariffParams {
        TariffParams::new(
            vec![Tier::new(30, Decimal::from(4)), Tier::new(10, Decimal::from(5))],
            Decimal::new(35, 1),
        )
        .with_maximum(Decimal::from(1000))
    }

    fn run(params: &TariffParams, reservations: u32, capacity: u32) -> TariffOutcome {
        apply(
            "t",
            params,
            Decimal::from(reservations),
            Decimal::from(capacity),
            &mut CalculationTrace::new(),
        )
        .unwrap()
    }

    #[test]
    fn first_covering_tier_wins() {
        assert_eq!(
            select_rate(&params(), Decimal::from(10), Decimal::from(50)),
            (TariffKind::Tier { threshold: 10 }, Decimal::from(5))
        );
        assert_eq!(
            select_rate(&params(), Decimal::from(11), Decimal::from(50)),
            (TariffKind::Tier { threshold: 30 }, Decimal::from(4))
        );
    }

    #[test]
    fn uncovered_count_falls_back_to_full_house_rate() {
        let (kind, rate) = select_rate(&params(), Decimal::from(40), Decimal::from(50));
        assert_eq!(kind, TariffKind::DefaultFullHouse);
        assert_eq!(rate, Decimal::new(35, 1));
        assert_eq!(kind.to_string(), "Full House (por defecto)");
    }

    #[test]
    fn empty_capacity_counts_as_full_house() {
        let (kind, _) = select_rate(&params(), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(kind, TariffKind::FullHouse);
    }

    #[test]
    fn fixed_fee_is_added_before_clamps() {
        let outcome = run(&params().with_fixed_fee(Decimal::from(15)), 20, 50);
        assert_eq!(outcome.base_amount, Decimal::from(80));
        assert_eq!(outcome.amount, Decimal::from(95));
        assert!(!outcome.minimum_applied);
    }

    #[test]
    fn fee_can_lift_amount_over_minimum() {
        let tuned = params().with_fixed_fee(Decimal::from(30)).with_minimum(Decimal::from(100));
        let outcome = run(&tuned, 20, 50);
        assert_eq!(outcome.amount, Decimal::from(110));
        assert!(!outcome.minimum_applied);
    }

    #[test]
    fn zero_bonus_is_not_reported() {
        let outcome = run(&params(), 20, 50);
        assert_eq!(outcome.bonus, None);
    }

    #[test]
    fn trace_explains_every_decision() {
        let tuned = params()
            .with_minimum(Decimal::from(200))
            .with_maximum(Decimal::from(150))
            .with_bonus(Decimal::TWO);
        let mut trace = CalculationTrace::new();
        apply("t", &tuned, Decimal::from(20), Decimal::from(50), &mut trace).unwrap();

        let steps = trace.into_steps();
        assert_eq!(steps[0], "Reservaciones: 20 de 50 lugares");
        assert_eq!(steps[1], "Tarifa seleccionada: Hasta 30 reservas (4 por reserva)");
        assert_eq!(steps[2], "Monto base: 4 x 20 = 80");
        assert_eq!(steps[3], "Mínimo garantizado aplicado: 80 -> 200");
        assert_eq!(steps[4], "Máximo aplicado: 200 -> 150");
        assert_eq!(steps[5], "Bono: 2 x 20 = 40 (no incluido en el pago)");
    }
}
