//! Resolution of a formula's id-referenced node graph.
//!
//! Nodes stay in the formula's own arena (`Formula::nodes`); this module only
//! builds lookup tables over them keyed by id and checks that the connections
//! form a well-formed, acyclic graph before anything is evaluated.

use std::collections::{BTreeSet, HashMap};

use nomina_types::{Formula, Node, Port};
use tracing::debug;

use crate::error::EvaluationError;
use crate::evaluator::EvaluationLimits;

/// Indexed, validated view of a formula's graph.
#[derive(Debug)]
pub struct FormulaGraph<'a> {
    nodes: HashMap<&'a str, &'a Node>,
    /// `(destination, port) -> source`
    inputs: HashMap<(&'a str, Port), &'a str>,
    /// `source -> destinations`, one entry per connection
    outputs: HashMap<&'a str, Vec<&'a str>>,
    result: &'a str,
}

impl<'a> FormulaGraph<'a> {
    /// Indexes the formula and rejects structural problems: oversized formulas,
    /// a missing result node, duplicate node ids, dangling or illegal connections
    /// and cycles.
    pub fn build(formula: &'a Formula, limits: &EvaluationLimits) -> Result<Self, EvaluationError> {
        if formula.nodes.len() > limits.max_nodes {
            return Err(EvaluationError::BudgetExceeded {
                resource: "nodes".to_string(),
                size: formula.nodes.len(),
                limit: limits.max_nodes,
            });
        }

        let result = formula
            .result_node
            .as_ref()
            .ok_or_else(|| EvaluationError::configuration("no result node defined"))?
            .as_str();

        let mut nodes = HashMap::with_capacity(formula.nodes.len());
        for node in &formula.nodes {
            if nodes.insert(node.id.as_str(), node).is_some() {
                return Err(EvaluationError::configuration(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }

        if !nodes.contains_key(result) {
            return Err(EvaluationError::configuration(format!(
                "result node '{result}' does not exist"
            )));
        }

        let mut inputs = HashMap::with_capacity(formula.connections.len());
        let mut outputs: HashMap<&str, Vec<&str>> = HashMap::new();
        for connection in &formula.connections {
            let from = connection.from.as_str();
            let to = connection.to.as_str();

            let Some(target) = nodes.get(to) else {
                return Err(EvaluationError::UnresolvedReference {
                    node: from.to_string(),
                    reference: to.to_string(),
                });
            };
            if !nodes.contains_key(from) {
                return Err(EvaluationError::UnresolvedReference {
                    node: to.to_string(),
                    reference: from.to_string(),
                });
            }
            if !target.kind.accepts(connection.port) {
                return Err(EvaluationError::configuration(format!(
                    "node '{to}' ({}) has no port '{}'",
                    target.kind.label(),
                    connection.port
                )));
            }
            if inputs.insert((to, connection.port), from).is_some() {
                return Err(EvaluationError::configuration(format!(
                    "port '{}' of node '{to}' is connected more than once",
                    connection.port
                )));
            }
            outputs.entry(from).or_default().push(to);
        }

        let graph = Self { nodes, inputs, outputs, result };
        let order = graph.topological_order()?;
        debug!(nodes = order.len(), result, "formula graph resolved");
        Ok(graph)
    }

    /// Orders every node so that each comes after all nodes feeding it
    /// (Kahn's algorithm). Ready nodes are taken in id order so the ordering is
    /// deterministic. Fails with [`EvaluationError::CyclicGraph`] naming every
    /// node that could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<&'a str>, EvaluationError> {
        let mut in_degree: HashMap<&str, usize> = self.nodes.keys().map(|&id| (id, 0)).collect();
        for &(to, _) in self.inputs.keys() {
            if let Some(degree) = in_degree.get_mut(to) {
                *degree += 1;
            }
        }

        let mut ready: BTreeSet<&str> =
            in_degree.iter().filter(|&(_, &degree)| degree == 0).map(|(&id, _)| id).collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            for &next in self.outputs.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let mut stuck: Vec<String> = in_degree
                .into_iter()
                .filter(|&(_, degree)| degree > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            stuck.sort();
            return Err(EvaluationError::CyclicGraph { nodes: stuck });
        }

        Ok(order)
    }

    pub fn node(&self, id: &str) -> Option<&'a Node> {
        self.nodes.get(id).copied()
    }

    /// Node feeding `port` of `node`, if connected.
    pub fn input(&self, node: &str, port: Port) -> Option<&'a str> {
        self.inputs.get(&(node, port)).copied()
    }

    /// Id of the result node.
    pub fn result(&self) -> &'a str {
        self.result
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
