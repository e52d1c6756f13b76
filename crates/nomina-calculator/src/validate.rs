use nomina_types::{ContextField, Formula, NodeKind};
use tracing::debug;

use crate::error::EvaluationError;
use crate::evaluator::EvaluationLimits;
use crate::graph::FormulaGraph;

/// Structural check for a formula before it is saved.
///
/// Stricter than evaluation, which only touches the nodes a particular class
/// reaches: here every node must have its required ports connected, every input
/// node must name a known field and every tariff node must carry at least one
/// parameter set. Reports the first problem found.
pub fn validate(formula: &Formula, limits: &EvaluationLimits) -> Result<(), EvaluationError> {
    let graph = FormulaGraph::build(formula, limits)?;

    for node in &formula.nodes {
        let id = node.id.as_str();
        for &port in node.kind.required_ports() {
            if graph.input(id, port).is_none() {
                return Err(EvaluationError::MissingInput { node: id.to_string(), port });
            }
        }

        match &node.kind {
            NodeKind::Input { field } if ContextField::from_name(field).is_none() => {
                return Err(EvaluationError::UnknownField {
                    node: id.to_string(),
                    field: field.clone(),
                });
            }
            NodeKind::Tariff { parameters } if parameters.is_empty() => {
                return Err(EvaluationError::configuration(format!(
                    "tariff node '{id}' has no parameter sets"
                )));
            }
            _ => {}
        }
    }

    debug!(formula = %formula.id, nodes = graph.len(), "formula validated");
    Ok(())
}
