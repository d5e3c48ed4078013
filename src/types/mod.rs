//! Core enumerations shared by the parser, binder and evaluator.

mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use value::Value;

/// Static type of a node or symbol.
///
/// Drives type-transform dispatch. `AnyType` defers the choice of a binary
/// operation's type to the right-hand operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Bool,
    Datetime,
    Float64,
    Int64,
    String,
    AnyType,
    Other,
}

impl NodeType {
    /// Returns the human-facing name of the type.
    ///
    /// `Int64` and `Float64` both render as `number`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::String => "string",
            NodeType::Int64 | NodeType::Float64 => "number",
            NodeType::Datetime => "date",
            NodeType::Bool => "bool",
            NodeType::Other => "other",
            NodeType::AnyType => "any",
        }
    }

    /// Returns whether this type is numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, NodeType::Int64 | NodeType::Float64)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Between,
    NotBetween,
    Contains,
    NotContains,
}

impl BinaryOp {
    /// Returns the canonical rendering of this operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Between => "between",
            BinaryOp::NotBetween => "not between",
            BinaryOp::Contains => "contains",
            BinaryOp::NotContains => "not contains",
        }
    }

    /// Parses a comparison operator token.
    #[must_use]
    pub fn parse_comparison(s: &str) -> Option<Self> {
        match s {
            "=" => Some(BinaryOp::Eq),
            "!=" | "<>" => Some(BinaryOp::Neq),
            "<" => Some(BinaryOp::Lt),
            "<=" => Some(BinaryOp::Lte),
            ">" => Some(BinaryOp::Gt),
            ">=" => Some(BinaryOp::Gte),
            _ => None,
        }
    }

    /// Returns true for the six ordering/equality comparisons.
    #[must_use]
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Lt
                | BinaryOp::Lte
                | BinaryOp::Gt
                | BinaryOp::Gte
        )
    }

    /// Returns true for the negated forms (`not in`, `not between`, `not contains`).
    #[must_use]
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            BinaryOp::NotIn | BinaryOp::NotBetween | BinaryOp::NotContains
        )
    }

    /// Applies a comparison operator to an ordering.
    ///
    /// Returns false for operators that are not comparisons.
    #[must_use]
    pub fn matches(&self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            BinaryOp::Eq => ord == Equal,
            BinaryOp::Neq => ord != Equal,
            BinaryOp::Lt => ord == Less,
            BinaryOp::Lte => ord != Greater,
            BinaryOp::Gt => ord == Greater,
            BinaryOp::Gte => ord != Less,
            _ => false,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set functions applicable to a set symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetFunction {
    AllOf,
    AnyOf,
    NoneOf,
    Count,
    IsEmpty,
}

impl SetFunction {
    /// Returns the query-text name of this function.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SetFunction::AllOf => "allOf",
            SetFunction::AnyOf => "anyOf",
            SetFunction::NoneOf => "noneOf",
            SetFunction::Count => "count",
            SetFunction::IsEmpty => "isEmpty",
        }
    }

    /// Returns true for the quantifiers that wrap a member predicate.
    #[must_use]
    pub fn is_quantifier(&self) -> bool {
        matches!(
            self,
            SetFunction::AllOf | SetFunction::AnyOf | SetFunction::NoneOf
        )
    }
}

impl fmt::Display for SetFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Traversal or sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Orients an ascending ordering to this direction.
    #[must_use]
    pub fn apply(&self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    }
}
