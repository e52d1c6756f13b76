//! Nomina Types
//!
//! This crate defines the data model shared by the Nomina crates (currently
//! `nomina-calculator`, `nomina-core` and `nomina-cli`): payment formulas as
//! id-referenced node graphs, the per-category tariff tables they carry, and the
//! class attendance records they are evaluated against.
//!
//! Everything here is plain serde data. The wire names follow the persisted JSON
//! produced by the formula builder (`nodos`, `conexiones`, `nodoResultado`, ...).

#![deny(clippy::all)]
#![warn(missing_docs)]

mod context;
mod formula;
mod id;
mod tariff;

pub use context::{ClassRecord, ContextField, EvaluationContext, InstructorCategory};
pub use formula::{
    ArithmeticOperator, Comparison, Connection, Formula, FormulaAssignment, Node, NodeKind, Port,
};
pub use id::Id;
pub use tariff::{TariffParams, Tier};

/// Decimal type used for every currency amount and rate.
pub use rust_decimal::Decimal;
