use std::collections::BTreeMap;

use nomina_types::{Formula, FormulaAssignment, Id};
use tracing::{debug, info};

/// Formulas keyed by `(discipline, period)`.
///
/// Holds at most one formula per key. Registering another formula for an
/// existing key replaces it, which is how a formula is versioned within a
/// period.
#[derive(Debug, Clone, Default)]
pub struct FormulaRegistry {
    formulas: BTreeMap<(Id, Id), Formula>,
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from stored assignments. Later assignments for the same
    /// key win.
    pub fn from_assignments(assignments: impl IntoIterator<Item = FormulaAssignment>) -> Self {
        let mut registry = Self::new();
        for assignment in assignments {
            registry.insert(assignment);
        }
        registry
    }

    /// Registers a formula, returning the one it replaced.
    pub fn insert(&mut self, assignment: FormulaAssignment) -> Option<Formula> {
        let FormulaAssignment { discipline_id, period_id, formula } = assignment;
        let formula_id = formula.id.clone();
        let replaced =
            self.formulas.insert((discipline_id.clone(), period_id.clone()), formula);

        match &replaced {
            Some(previous) => info!(
                discipline = %discipline_id,
                period = %period_id,
                previous = %previous.id,
                formula = %formula_id,
                "formula replaced"
            ),
            None => debug!(
                discipline = %discipline_id,
                period = %period_id,
                formula = %formula_id,
                "formula registered"
            ),
        }
        replaced
    }

    pub fn get(&self, discipline_id: &Id, period_id: &Id) -> Option<&Formula> {
        self.formulas.get(&(discipline_id.clone(), period_id.clone()))
    }

    /// Removes the formula for a key.
    pub fn remove(&mut self, discipline_id: &Id, period_id: &Id) -> Option<Formula> {
        self.formulas.remove(&(discipline_id.clone(), period_id.clone()))
    }

    /// Iterates `(discipline, period, formula)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &Id, &Formula)> {
        self.formulas.iter().map(|((discipline, period), formula)| (discipline, period, formula))
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}
