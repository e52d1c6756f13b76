//! Evaluation errors.
//!
//! Every error short-circuits the evaluation it occurs in and is reported through
//! [`EvaluationResult::error`](crate::EvaluationResult) rather than returned to the
//! caller, so batch runs can record it and move on to the next class.

use nomina_types::{InstructorCategory, Port};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised while resolving or evaluating a formula.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codigo")]
pub enum EvaluationError {
    /// The formula is structurally unusable (no result node, duplicate ids,
    /// illegal or doubly connected ports).
    #[serde(rename = "CONFIGURATION_ERROR")]
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The connection graph contains a cycle.
    #[serde(rename = "CYCLIC_GRAPH_ERROR")]
    #[error("Cyclic graph: nodes {} cannot be ordered", .nodes.join(", "))]
    CyclicGraph { nodes: Vec<String> },

    /// An input node names a field the context does not have.
    #[serde(rename = "UNKNOWN_FIELD_ERROR")]
    #[error("Unknown field '{field}' read by node '{node}'")]
    UnknownField { node: String, field: String },

    /// An arithmetic node divided by zero.
    #[serde(rename = "DIVISION_BY_ZERO_ERROR")]
    #[error("Division by zero in node '{node}'")]
    DivisionByZero { node: String },

    /// A tariff node has no parameter set for the instructor's category.
    #[serde(rename = "MISSING_PARAMETERS_ERROR")]
    #[error("Tariff node '{node}' has no parameters for category {category}")]
    MissingParameters { node: String, category: InstructorCategory },

    /// A connection names a node that does not exist.
    #[serde(rename = "UNRESOLVED_REFERENCE_ERROR")]
    #[error("Node '{node}' is connected to unknown node '{reference}'")]
    UnresolvedReference { node: String, reference: String },

    /// A required input port has nothing connected to it.
    #[serde(rename = "MISSING_INPUT_ERROR")]
    #[error("Node '{node}' has no input connected to port '{port}'")]
    MissingInput { node: String, port: Port },

    /// A decimal operation overflowed.
    #[serde(rename = "OVERFLOW_ERROR")]
    #[error("Arithmetic overflow in node '{node}'")]
    Overflow { node: String },

    /// The formula is larger than the evaluator is configured to accept.
    #[serde(rename = "BUDGET_EXCEEDED_ERROR")]
    #[error("Evaluation budget exceeded: {size} {resource} (limit {limit})")]
    BudgetExceeded { resource: String, size: usize, limit: usize },
}

impl EvaluationError {
    /// Stable machine-readable code, identical to the serialized tag.
    pub fn code(&self) -> &'static str {
        match self {
            EvaluationError::Configuration { .. } => "CONFIGURATION_ERROR",
            EvaluationError::CyclicGraph { .. } => "CYCLIC_GRAPH_ERROR",
            EvaluationError::UnknownField { .. } => "UNKNOWN_FIELD_ERROR",
            EvaluationError::DivisionByZero { .. } => "DIVISION_BY_ZERO_ERROR",
            EvaluationError::MissingParameters { .. } => "MISSING_PARAMETERS_ERROR",
            EvaluationError::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE_ERROR",
            EvaluationError::MissingInput { .. } => "MISSING_INPUT_ERROR",
            EvaluationError::Overflow { .. } => "OVERFLOW_ERROR",
            EvaluationError::BudgetExceeded { .. } => "BUDGET_EXCEEDED_ERROR",
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        EvaluationError::Configuration { message: message.into() }
    }
}
