use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One tier of a tariff table: classes with up to `threshold` reservations pay
/// `rate` per reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Highest reservation count covered by this tier (inclusive).
    #[serde(rename = "numeroReservas")]
    pub threshold: u32,
    /// Pay per reservation.
    #[serde(rename = "tarifa")]
    pub rate: Decimal,
}

impl Tier {
    /// Creates a tier.
    pub fn new(threshold: u32, rate: Decimal) -> Self {
        Self { threshold, rate }
    }
}

/// Tariff parameter set for one instructor category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffParams {
    /// Tiers in any order; evaluation sorts them by threshold.
    #[serde(rename = "tarifas", default)]
    pub tiers: Vec<Tier>,
    /// Rate for full classes, also the fallback when no tier covers the count.
    #[serde(rename = "tarifaFullHouse")]
    pub full_house_rate: Decimal,
    /// Fixed amount added on top of the per-reservation amount.
    #[serde(rename = "cuotaFija", default)]
    pub fixed_fee: Decimal,
    /// Floor for the final amount. Zero disables it.
    #[serde(rename = "minimoGarantizado", default)]
    pub guaranteed_minimum: Decimal,
    /// Ceiling for the final amount, checked after the floor.
    #[serde(rename = "maximo", default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Decimal>,
    /// Bonus per reservation, reported apart from the payment.
    #[serde(rename = "bono", default)]
    pub bonus_per_reservation: Decimal,
}

impl TariffParams {
    /// Creates a parameter set with no fee, floor, ceiling or bonus.
    pub fn new(tiers: Vec<Tier>, full_house_rate: Decimal) -> Self {
        Self {
            tiers,
            full_house_rate,
            fixed_fee: Decimal::ZERO,
            guaranteed_minimum: Decimal::ZERO,
            maximum: None,
            bonus_per_reservation: Decimal::ZERO,
        }
    }

    /// Sets the fixed fee.
    pub fn with_fixed_fee(mut self, fee: Decimal) -> Self {
        self.fixed_fee = fee;
        self
    }

    /// Sets the guaranteed minimum.
    pub fn with_minimum(mut self, minimum: Decimal) -> Self {
        self.guaranteed_minimum = minimum;
        self
    }

    /// Sets the maximum.
    pub fn with_maximum(mut self, maximum: Decimal) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Sets the bonus paid per reservation.
    pub fn with_bonus(mut self, bonus: Decimal) -> Self {
        self.bonus_per_reservation = bonus;
        self
    }

    /// Tiers sorted by ascending threshold. Equal thresholds keep their
    /// configured order.
    pub fn sorted_tiers(&self) -> Vec<&Tier> {
        let mut tiers: Vec<&Tier> = self.tiers.iter().collect();
        tiers.sort_by_key(|tier| tier.threshold);
        tiers
    }
}
