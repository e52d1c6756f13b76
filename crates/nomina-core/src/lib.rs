//! Payroll over class records.
//!
//! Formulas are registered per discipline and period in a [`FormulaRegistry`];
//! a [`PayrollRun`] pays a batch of [`ClassRecord`](nomina_types::ClassRecord)s
//! against it and returns a [`PayrollReport`] with per-class payments, per-class
//! failures and per-instructor totals.

#![deny(clippy::all)]

pub mod error;
pub mod payroll;
pub mod registry;

pub use error::FailureReason;
pub use payroll::{
    ClassPayment, InstructorTotal, PaymentFailure, PayrollConfig, PayrollReport, PayrollRun,
};
pub use registry::FormulaRegistry;

pub use nomina_calculator::{EvaluationLimits, Evaluator};
