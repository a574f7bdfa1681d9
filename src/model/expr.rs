//! Expression IR used by constant folding
//!
//! Tree expressions and field initializers stored in the symbol table both
//! lower to [`Expr`], so one folding algorithm serves source trees and
//! cross-unit constants alike.

use super::{NodeId, NodeKind, Tree};
use std::fmt;

/// A compile-time value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `int`, `short` and `byte` values
    Int(i32),
    Long(i64),
    /// `float` and `double` values
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Null,
}

impl Literal {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(i64::from(*v)),
            Literal::Long(v) => Some(*v),
            Literal::Char(c) => Some(i64::from(u32::from(*c))),
            _ => None,
        }
    }

    /// Numeric equality across `int`, `long` and `char`; structural otherwise
    pub fn same_value(&self, other: &Literal) -> bool {
        match (self.as_int(), other.as_int()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Float(v) => Some(*v),
            other => other.as_int().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Java type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Long(_) => "long",
            Literal::Float(_) => "double",
            Literal::Bool(_) => "boolean",
            Literal::Char(_) => "char",
            Literal::Str(_) => "java.lang.String",
            Literal::Null => "null",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Long(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Char(c) => write!(f, "{}", c),
            Literal::Str(s) => write!(f, "{}", s),
            Literal::Null => write!(f, "null"),
        }
    }
}

/// Foldable expression shape; anything else is `Unknown`
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// `NAME` or `Qualifier.NAME`
    Reference {
        qualifier: Option<String>,
        name: String,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Cast {
        type_name: String,
        operand: Box<Expr>,
    },
    Array(Vec<Expr>),
    Unknown,
}

impl Expr {
    /// Lower a tree expression
    pub fn from_node(tree: &Tree, id: NodeId) -> Expr {
        let data = tree.node(id);
        let child = |i: usize| {
            data.children
                .get(i)
                .map(|&c| Box::new(Expr::from_node(tree, c)))
                .unwrap_or_else(|| Box::new(Expr::Unknown))
        };

        match data.kind {
            NodeKind::Literal => data
                .literal
                .clone()
                .map(Expr::Literal)
                .unwrap_or(Expr::Unknown),
            NodeKind::Reference => match &data.name {
                Some(name) => Expr::Reference {
                    qualifier: None,
                    name: name.clone(),
                },
                None => Expr::Unknown,
            },
            NodeKind::Select => {
                let qualifier = data.qualifier.and_then(|q| tree.dotted_name(q));
                match (&data.name, qualifier) {
                    (Some(name), Some(qualifier)) => Expr::Reference {
                        qualifier: Some(qualifier),
                        name: name.clone(),
                    },
                    _ => Expr::Unknown,
                }
            }
            NodeKind::Parenthesized => *child(0),
            NodeKind::Unary => Expr::Unary {
                op: data.operator.clone().unwrap_or_default(),
                operand: child(0),
            },
            NodeKind::Binary => Expr::Binary {
                op: data.operator.clone().unwrap_or_default(),
                lhs: child(0),
                rhs: child(1),
            },
            NodeKind::Conditional => Expr::Conditional {
                condition: child(0),
                then: child(1),
                otherwise: child(2),
            },
            NodeKind::Cast => Expr::Cast {
                type_name: data.type_name.clone().unwrap_or_default(),
                operand: child(0),
            },
            NodeKind::ArrayInit => Expr::Array(
                data.children
                    .iter()
                    .map(|&c| Expr::from_node(tree, c))
                    .collect(),
            ),
            // `new int[] { ... }` keeps its initializer as the only child
            NodeKind::New if data.type_name.as_deref().is_some_and(|t| t.ends_with("[]")) => {
                match data.children.iter().find(|&&c| tree.node_kind(c) == NodeKind::ArrayInit) {
                    Some(&init) => Expr::from_node(tree, init),
                    None => Expr::Unknown,
                }
            }
            _ => Expr::Unknown,
        }
    }

    pub fn literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// String elements of a literal or array of literals, as used by
    /// `@SuppressLint("a")` and `@SuppressLint({"a", "b"})`
    pub fn string_values(&self) -> Vec<String> {
        match self {
            Expr::Literal(Literal::Str(s)) => vec![s.clone()],
            Expr::Array(items) => items.iter().flat_map(Expr::string_values).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Literal::Str(s)) => write!(f, "\"{}\"", s),
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::Reference {
                qualifier: Some(q),
                name,
            } => write!(f, "{}.{}", q, name),
            Expr::Reference { name, .. } => write!(f, "{}", name),
            Expr::Unary { op, operand } => write!(f, "{}{}", op, operand),
            Expr::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => write!(f, "{} ? {} : {}", condition, then, otherwise),
            Expr::Cast { type_name, operand } => write!(f, "({}) {}", type_name, operand),
            Expr::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Expr::Unknown => write!(f, "?"),
        }
    }
}
