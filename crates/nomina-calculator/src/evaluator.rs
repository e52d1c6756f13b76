//! Formula evaluator
//!
//! Evaluation is demand-driven from the result node over an explicit work stack,
//! with a memo table local to the call:
//! - every node is computed at most once, however many nodes read it;
//! - a conditional only evaluates the branch it selects;
//! - nesting depth is bounded by the heap, not the call stack.
//!
//! The graph is checked for cycles before the first node is computed.

use std::collections::HashMap;

use nomina_types::{
    ArithmeticOperator, ContextField, Decimal, EvaluationContext, Formula, Node, NodeKind, Port,
};
use tracing::{debug, instrument, warn};

use crate::error::EvaluationError;
use crate::graph::FormulaGraph;
use crate::result::EvaluationResult;
use crate::tariff::{self, TariffOutcome};
use crate::trace::{CalculationTrace, amount};

/// Size limits applied to every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationLimits {
    /// Largest formula accepted, in nodes
    pub max_nodes: usize,
    /// Upper bound on work-stack iterations for one evaluation
    pub max_steps: usize,
}

impl Default for EvaluationLimits {
    fn default() -> Self {
        Self { max_nodes: 1_000, max_steps: 100_000 }
    }
}

/// Stateless formula evaluator. Cheap to copy and safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    limits: EvaluationLimits,
}

impl Evaluator {
    pub fn new(limits: EvaluationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &EvaluationLimits {
        &self.limits
    }

    /// Evaluates `formula` against `context`.
    ///
    /// Never panics on malformed formulas: every failure is returned in
    /// [`EvaluationResult::error`] together with the steps recorded up to it.
    #[instrument(skip_all, fields(formula = %formula.id, category = %context.category))]
    pub fn evaluate(&self, formula: &Formula, context: &EvaluationContext) -> EvaluationResult {
        let graph = match FormulaGraph::build(formula, &self.limits) {
            Ok(graph) => graph,
            Err(error) => return fail(error, CalculationTrace::new()),
        };

        let mut session = Session::new(graph, context, self.limits.max_steps);
        let target = session.graph.result();
        match session.resolve(target) {
            Ok(payment) => {
                debug!(amount = %payment, steps = session.steps, "formula evaluated");
                session.trace.record(format!("Monto a pagar: {}", amount(payment)));
                EvaluationResult::success(payment, session.tariff, session.trace)
            }
            Err(error) => fail(error, session.trace),
        }
    }
}

fn fail(error: EvaluationError, mut trace: CalculationTrace) -> EvaluationResult {
    warn!(code = error.code(), %error, "formula evaluation failed");
    trace.record(format!("Error: {error}"));
    EvaluationResult::failure(error, trace)
}

/// Working state of a single evaluation.
struct Session<'a> {
    graph: FormulaGraph<'a>,
    context: &'a EvaluationContext,
    memo: HashMap<&'a str, Decimal>,
    trace: CalculationTrace,
    tariff: Option<TariffOutcome>,
    steps: usize,
    max_steps: usize,
}

impl<'a> Session<'a> {
    fn new(graph: FormulaGraph<'a>, context: &'a EvaluationContext, max_steps: usize) -> Self {
        Self {
            memo: HashMap::with_capacity(graph.len()),
            graph,
            context,
            trace: CalculationTrace::new(),
            tariff: None,
            steps: 0,
            max_steps,
        }
    }

    fn resolve(&mut self, target: &'a str) -> Result<Decimal, EvaluationError> {
        let mut stack = vec![target];

        while let Some(&id) = stack.last() {
            self.steps += 1;
            if self.steps > self.max_steps {
                return Err(EvaluationError::BudgetExceeded {
                    resource: "steps".to_string(),
                    size: self.steps,
                    limit: self.max_steps,
                });
            }

            if self.memo.contains_key(id) {
                stack.pop();
                continue;
            }

            let node = self.node(id)?;
            match self.next_dependency(node)? {
                Some(dependency) => stack.push(dependency),
                None => {
                    let value = self.compute(node)?;
                    debug!(node = id, kind = node.kind.label(), %value, "node evaluated");
                    self.memo.insert(id, value);
                    stack.pop();
                }
            }
        }

        self.memoized(target, target)
    }

    /// First input of `node` that still has to be computed, if any.
    fn next_dependency(&self, node: &'a Node) -> Result<Option<&'a str>, EvaluationError> {
        let id = node.id.as_str();
        match &node.kind {
            NodeKind::Input { .. } | NodeKind::Constant { .. } => Ok(None),
            NodeKind::Arithmetic { .. } => self.pending(id, &[Port::Left, Port::Right]),
            NodeKind::Conditional { comparison } => {
                if let Some(operand) = self.pending(id, &[Port::Left, Port::Right])? {
                    return Ok(Some(operand));
                }
                let left = self.operand(id, Port::Left)?;
                let right = self.operand(id, Port::Right)?;
                let (_, branch) = self.branch(id, comparison.holds(left, right))?;
                Ok((!self.memo.contains_key(branch)).then_some(branch))
            }
            NodeKind::Tariff { .. } => Ok(self
                .graph
                .input(id, Port::Reservations)
                .filter(|source| !self.memo.contains_key(source))),
        }
    }

    fn compute(&mut self, node: &'a Node) -> Result<Decimal, EvaluationError> {
        let id = node.id.as_str();
        match &node.kind {
            NodeKind::Input { field } => {
                self.context.lookup(field).ok_or_else(|| EvaluationError::UnknownField {
                    node: id.to_string(),
                    field: field.clone(),
                })
            }
            NodeKind::Constant { value } => Ok(*value),
            NodeKind::Arithmetic { operator } => {
                let left = self.operand(id, Port::Left)?;
                let right = self.operand(id, Port::Right)?;
                arithmetic(id, *operator, left, right)
            }
            NodeKind::Conditional { comparison } => {
                let left = self.operand(id, Port::Left)?;
                let right = self.operand(id, Port::Right)?;
                let holds = comparison.holds(left, right);
                let (port, branch) = self.branch(id, holds)?;
                self.trace.record(format!(
                    "Condición '{id}': {} {} {} es {} -> {port}",
                    amount(left),
                    comparison.symbol(),
                    amount(right),
                    if holds { "verdadero" } else { "falso" }
                ));
                self.memoized(id, branch)
            }
            NodeKind::Tariff { parameters } => {
                let category = self.context.category;
                let params = parameters.get(&category).ok_or_else(|| {
                    EvaluationError::MissingParameters { node: id.to_string(), category }
                })?;
                let reservations = match self.graph.input(id, Port::Reservations) {
                    Some(source) => self.memoized(id, source)?,
                    None => self.context.value(ContextField::Reservations),
                };
                let capacity = self.context.value(ContextField::Capacity);

                self.trace.record(format!("Tarifa '{id}' para categoría {category}"));
                let outcome =
                    tariff::apply(id, params, reservations, capacity, &mut self.trace)?;
                let payment = outcome.amount;
                self.tariff = Some(outcome);
                Ok(payment)
            }
        }
    }

    fn node(&self, id: &str) -> Result<&'a Node, EvaluationError> {
        self.graph.node(id).ok_or_else(|| EvaluationError::UnresolvedReference {
            node: self.graph.result().to_string(),
            reference: id.to_string(),
        })
    }

    /// First of `ports` whose source has not been computed yet.
    fn pending(&self, id: &str, ports: &[Port]) -> Result<Option<&'a str>, EvaluationError> {
        for &port in ports {
            let source = self.source(id, port)?;
            if !self.memo.contains_key(source) {
                return Ok(Some(source));
            }
        }
        Ok(None)
    }

    /// Port and source of the branch a conditional takes.
    fn branch(&self, id: &str, holds: bool) -> Result<(Port, &'a str), EvaluationError> {
        let port = if holds { Port::WhenTrue } else { Port::WhenFalse };
        Ok((port, self.source(id, port)?))
    }

    fn source(&self, id: &str, port: Port) -> Result<&'a str, EvaluationError> {
        self.graph
            .input(id, port)
            .ok_or_else(|| EvaluationError::MissingInput { node: id.to_string(), port })
    }

    fn operand(&self, id: &str, port: Port) -> Result<Decimal, EvaluationError> {
        let source = self.source(id, port)?;
        self.memoized(id, source)
    }

    fn memoized(&self, reader: &str, source: &str) -> Result<Decimal, EvaluationError> {
        self.memo.get(source).copied().ok_or_else(|| EvaluationError::UnresolvedReference {
            node: reader.to_string(),
            reference: source.to_string(),
        })
    }
}

fn arithmetic(
    node: &str,
    operator: ArithmeticOperator,
    left: Decimal,
    right: Decimal,
) -> Result<Decimal, EvaluationError> {
    let result = match operator {
        ArithmeticOperator::Add => left.checked_add(right),
        ArithmeticOperator::Subtract => left.checked_sub(right),
        ArithmeticOperator::Multiply => left.checked_mul(right),
        ArithmeticOperator::Divide => {
            if right.is_zero() {
                return Err(EvaluationError::DivisionByZero { node: node.to_string() });
            }
            left.checked_div(right)
        }
    };
    result.ok_or_else(|| EvaluationError::Overflow { node: node.to_string() })
}
