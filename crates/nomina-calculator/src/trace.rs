use rust_decimal::Decimal;

/// Ordered, human-readable record of the decisions taken during one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationTrace {
    steps: Vec<String>,
}

impl CalculationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn record(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }
}

/// Formats an amount for display in a trace step. Trailing zeros are dropped;
/// the value itself is never rounded.
pub fn amount(value: Decimal) -> String {
    value.normalize().to_string()
}
