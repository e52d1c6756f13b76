use crate::context::InstructorCategory;
use crate::id::Id;
use crate::tariff::TariffParams;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// User-authored payment formula: a graph of nodes wired by id.
///
/// Node order in `nodes` carries no meaning. Evaluation order is derived from
/// `connections` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    /// Formula id
    pub id: Id,
    /// Display name
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Display description
    #[serde(rename = "descripcion", default)]
    pub description: String,
    /// Computation nodes
    #[serde(rename = "nodos", default)]
    pub nodes: Vec<Node>,
    /// Directed edges feeding node outputs into node inputs
    #[serde(rename = "conexiones", default)]
    pub connections: Vec<Connection>,
    /// Node whose output is the formula's value
    #[serde(rename = "nodoResultado", default, skip_serializing_if = "Option::is_none")]
    pub result_node: Option<Id>,
}

impl Formula {
    /// Creates an empty formula.
    pub fn new(id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            connections: Vec::new(),
            result_node: None,
        }
    }

    /// Adds a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Feeds the output of `from` into `port` of `to`.
    pub fn connect(mut self, from: impl Into<Id>, to: impl Into<Id>, port: Port) -> Self {
        self.connections.push(Connection { from: from.into(), to: to.into(), port });
        self
    }

    /// Marks the result node.
    pub fn with_result(mut self, node: impl Into<Id>) -> Self {
        self.result_node = Some(node.into());
        self
    }

    /// Finds a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id.as_str() == id)
    }
}

/// One computation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Id, unique within the owning formula
    pub id: Id,
    /// What the node computes
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Node reading a context field.
    pub fn input(id: impl Into<Id>, field: impl Into<String>) -> Self {
        Self { id: id.into(), kind: NodeKind::Input { field: field.into() } }
    }

    /// Node producing a literal.
    pub fn constant(id: impl Into<Id>, value: Decimal) -> Self {
        Self { id: id.into(), kind: NodeKind::Constant { value } }
    }

    /// Binary arithmetic node.
    pub fn arithmetic(id: impl Into<Id>, operator: ArithmeticOperator) -> Self {
        Self { id: id.into(), kind: NodeKind::Arithmetic { operator } }
    }

    /// Conditional node.
    pub fn conditional(id: impl Into<Id>, comparison: Comparison) -> Self {
        Self { id: id.into(), kind: NodeKind::Conditional { comparison } }
    }

    /// Tariff table node.
    pub fn tariff(
        id: impl Into<Id>,
        parameters: impl IntoIterator<Item = (InstructorCategory, TariffParams)>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Tariff { parameters: parameters.into_iter().collect() },
        }
    }
}

/// Node variants. Persisted with a `tipo` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum NodeKind {
    /// Reads a named field of the evaluation context.
    #[serde(rename = "entrada")]
    Input {
        /// Field name, e.g. `reservaciones`
        #[serde(rename = "campo")]
        field: String,
    },
    /// Literal value.
    #[serde(rename = "constante")]
    Constant {
        /// The value
        #[serde(rename = "valor")]
        value: Decimal,
    },
    /// `izquierda <op> derecha`.
    #[serde(rename = "aritmetica")]
    Arithmetic {
        /// Operator
        #[serde(rename = "operador")]
        operator: ArithmeticOperator,
    },
    /// `siVerdadero` when `izquierda <cmp> derecha` holds, `siFalso` otherwise.
    #[serde(rename = "condicional")]
    Conditional {
        /// Comparison
        #[serde(rename = "comparacion")]
        comparison: Comparison,
    },
    /// Tiered tariff table, one parameter set per instructor category.
    #[serde(rename = "tarifa")]
    Tariff {
        /// Parameters by category
        #[serde(rename = "parametros", default)]
        parameters: BTreeMap<InstructorCategory, TariffParams>,
    },
}

impl NodeKind {
    /// Short name used in traces and logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Input { .. } => "entrada",
            Self::Constant { .. } => "constante",
            Self::Arithmetic { .. } => "aritmetica",
            Self::Conditional { .. } => "condicional",
            Self::Tariff { .. } => "tarifa",
        }
    }

    /// Ports this kind of node reads.
    pub const fn ports(&self) -> &'static [Port] {
        match self {
            Self::Input { .. } | Self::Constant { .. } => &[],
            Self::Arithmetic { .. } => &[Port::Left, Port::Right],
            Self::Conditional { .. } => {
                &[Port::Left, Port::Right, Port::WhenTrue, Port::WhenFalse]
            }
            Self::Tariff { .. } => &[Port::Reservations],
        }
    }

    /// Ports that must be connected for the node to evaluate.
    pub const fn required_ports(&self) -> &'static [Port] {
        match self {
            Self::Tariff { .. } => &[],
            other => other.ports(),
        }
    }

    /// Whether this kind of node reads `port`.
    pub fn accepts(&self, port: Port) -> bool {
        self.ports().contains(&port)
    }
}

/// Directed edge: the output of `from` feeds `port` of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Upstream node
    #[serde(rename = "origen")]
    pub from: Id,
    /// Downstream node
    #[serde(rename = "destino")]
    pub to: Id,
    /// Input of the downstream node
    #[serde(rename = "puerto")]
    pub port: Port,
}

/// Named input of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Port {
    /// Left operand
    #[serde(rename = "izquierda")]
    Left,
    /// Right operand
    #[serde(rename = "derecha")]
    Right,
    /// Branch taken when the comparison holds
    #[serde(rename = "siVerdadero")]
    WhenTrue,
    /// Branch taken when it does not
    #[serde(rename = "siFalso")]
    WhenFalse,
    /// Reservation count read by a tariff table
    #[serde(rename = "reservas")]
    Reservations,
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "izquierda",
            Self::Right => "derecha",
            Self::WhenTrue => "siVerdadero",
            Self::WhenFalse => "siFalso",
            Self::Reservations => "reservas",
        };
        f.write_str(name)
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    /// `+`
    #[serde(rename = "+", alias = "suma")]
    Add,
    /// `-`
    #[serde(rename = "-", alias = "resta")]
    Subtract,
    /// `*`
    #[serde(rename = "*", alias = "multiplicacion")]
    Multiply,
    /// `/`
    #[serde(rename = "/", alias = "division")]
    Divide,
}

impl ArithmeticOperator {
    /// Operator symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

/// Comparisons available to conditional nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// `>`
    #[serde(rename = ">")]
    Greater,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// `<`
    #[serde(rename = "<")]
    Less,
    /// `<=`
    #[serde(rename = "<=")]
    LessOrEqual,
    /// `==`
    #[serde(rename = "==")]
    Equal,
    /// `!=`
    #[serde(rename = "!=")]
    NotEqual,
}

impl Comparison {
    /// Applies the comparison.
    pub fn holds(self, left: Decimal, right: Decimal) -> bool {
        match self {
            Self::Greater => left > right,
            Self::GreaterOrEqual => left >= right,
            Self::Less => left < right,
            Self::LessOrEqual => left <= right,
            Self::Equal => left == right,
            Self::NotEqual => left != right,
        }
    }

    /// Comparison symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

/// Binding of a formula to the (discipline, period) it pays for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaAssignment {
    /// Discipline id
    #[serde(rename = "disciplinaId")]
    pub discipline_id: Id,
    /// Period id
    #[serde(rename = "periodoId")]
    pub period_id: Id,
    /// The formula
    pub formula: Formula,
}
