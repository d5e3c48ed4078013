//! Typed expression nodes.
//!
//! The binder rewrites the untyped parse tree into these closed enums. Every
//! variant is directly evaluable: a [`BoolExpr`] evaluates to a bool, the
//! scalar enums evaluate to an optional value where `None` is an absent value.

mod visit;

use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::parser::literal::{format_datetime, format_float64, quote_string};
use crate::query::Query;
use crate::types::{BinaryOp, NodeType, SetFunction};

pub use visit::{dump_tree, walk_bool, NodeRef, NodeVisitor};

/// A comparison between two operands of the same scalar type.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison<T> {
    pub left: T,
    pub op: BinaryOp,
    pub right: T,
}

/// Membership test of a scalar against a literal array.
#[derive(Debug, Clone, PartialEq)]
pub struct InArray<T> {
    pub left: T,
    pub negated: bool,
    pub elements: Vec<T>,
}

/// Half-open range test: `lower <= left < upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct Between<T> {
    pub left: T,
    pub lower: T,
    pub upper: T,
    pub negated: bool,
}

/// Predicate evaluated per member of a set symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantified {
    /// Name of the set symbol.
    pub set: String,
    /// Predicate evaluated against each member.
    pub predicate: Box<BoolExpr>,
}

/// A boolean-valued node.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpr {
    Const(bool),
    Symbol(String),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Not(Box<BoolExpr>),
    /// `symbol = null` (or `!= null` when negated).
    IsNil { symbol: String, negated: bool },
    BoolCompare(Box<Comparison<BoolExpr>>),
    Int64Compare(Comparison<Int64Expr>),
    Float64Compare(Comparison<Float64Expr>),
    /// Also carries `contains` / `not contains`.
    StringCompare(Comparison<StringExpr>),
    DatetimeCompare(Comparison<DatetimeExpr>),
    InInt64Array(InArray<Int64Expr>),
    InFloat64Array(InArray<Float64Expr>),
    InStringArray(InArray<StringExpr>),
    InDatetimeArray(InArray<DatetimeExpr>),
    Int64Between(Between<Int64Expr>),
    Float64Between(Between<Float64Expr>),
    DatetimeBetween(Between<DatetimeExpr>),
    AllOf(Quantified),
    AnyOf(Quantified),
    NoneOf(Quantified),
    /// True when the set (optionally narrowed by a sub-query) has no members.
    IsEmpty {
        set: String,
        filter: Option<Box<Query>>,
    },
}

/// An integer-valued node.
#[derive(Debug, Clone, PartialEq)]
pub enum Int64Expr {
    Const(i64),
    Symbol(String),
    /// Number of members of a set, optionally narrowed by a sub-query.
    Count {
        set: String,
        filter: Option<Box<Query>>,
    },
}

/// A float-valued node.
#[derive(Debug, Clone, PartialEq)]
pub enum Float64Expr {
    Const(f64),
    Symbol(String),
    /// Integer operand promoted for a mixed int/float operation.
    FromInt64(Int64Expr),
}

/// A string-valued node.
#[derive(Debug, Clone, PartialEq)]
pub enum StringExpr {
    Const(String),
    Symbol(String),
    /// Integer rendered in base 10.
    FromInt64(Int64Expr),
    /// Float rendered as the shortest round-trip decimal.
    FromFloat64(Float64Expr),
}

/// A datetime-valued node.
#[derive(Debug, Clone, PartialEq)]
pub enum DatetimeExpr {
    Const(DateTime<FixedOffset>),
    Symbol(String),
}

impl BoolExpr {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        NodeType::Bool
    }

    /// Creates a conjunction.
    #[must_use]
    pub fn and(left: BoolExpr, right: BoolExpr) -> Self {
        BoolExpr::And(Box::new(left), Box::new(right))
    }

    /// Creates a disjunction.
    #[must_use]
    pub fn or(left: BoolExpr, right: BoolExpr) -> Self {
        BoolExpr::Or(Box::new(left), Box::new(right))
    }

    /// Wraps `predicate` in the quantifier `func` over `set`.
    ///
    /// Returns None for set functions that are not quantifiers.
    #[must_use]
    pub fn quantify(func: SetFunction, set: String, predicate: BoolExpr) -> Option<Self> {
        let quantified = Quantified {
            set,
            predicate: Box::new(predicate),
        };
        match func {
            SetFunction::AllOf => Some(BoolExpr::AllOf(quantified)),
            SetFunction::AnyOf => Some(BoolExpr::AnyOf(quantified)),
            SetFunction::NoneOf => Some(BoolExpr::NoneOf(quantified)),
            SetFunction::Count | SetFunction::IsEmpty => None,
        }
    }
}

impl Int64Expr {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        NodeType::Int64
    }

    /// Promotes this node for a float operation.
    #[must_use]
    pub fn to_float64(self) -> Float64Expr {
        match self {
            Int64Expr::Const(v) => Float64Expr::Const(v as f64),
            other => Float64Expr::FromInt64(other),
        }
    }
}

impl Float64Expr {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        NodeType::Float64
    }
}

impl StringExpr {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        NodeType::String
    }
}

impl DatetimeExpr {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        NodeType::Datetime
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolExpr::Const(b) => write!(f, "{b}"),
            BoolExpr::Symbol(name) => f.write_str(name),
            BoolExpr::And(l, r) => write!(f, "({l} and {r})"),
            BoolExpr::Or(l, r) => write!(f, "({l} or {r})"),
            BoolExpr::Not(inner) => write!(f, "not ({inner})"),
            BoolExpr::IsNil { symbol, negated } => {
                let op = if *negated { BinaryOp::Neq } else { BinaryOp::Eq };
                write!(f, "{symbol} {op} null")
            }
            BoolExpr::BoolCompare(c) => write!(f, "{c}"),
            BoolExpr::Int64Compare(c) => write!(f, "{c}"),
            BoolExpr::Float64Compare(c) => write!(f, "{c}"),
            BoolExpr::StringCompare(c) => write!(f, "{c}"),
            BoolExpr::DatetimeCompare(c) => write!(f, "{c}"),
            BoolExpr::InInt64Array(a) => write!(f, "{a}"),
            BoolExpr::InFloat64Array(a) => write!(f, "{a}"),
            BoolExpr::InStringArray(a) => write!(f, "{a}"),
            BoolExpr::InDatetimeArray(a) => write!(f, "{a}"),
            BoolExpr::Int64Between(b) => write!(f, "{b}"),
            BoolExpr::Float64Between(b) => write!(f, "{b}"),
            BoolExpr::DatetimeBetween(b) => write!(f, "{b}"),
            BoolExpr::AllOf(q) => write!(f, "allOf({}){{{}}}", q.set, q.predicate),
            BoolExpr::AnyOf(q) => write!(f, "anyOf({}){{{}}}", q.set, q.predicate),
            BoolExpr::NoneOf(q) => write!(f, "noneOf({}){{{}}}", q.set, q.predicate),
            BoolExpr::IsEmpty { set, filter } => write_set_call(f, "isEmpty", set, filter.as_deref()),
        }
    }
}

fn write_set_call(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    set: &str,
    filter: Option<&Query>,
) -> fmt::Result {
    match filter {
        Some(query) => write!(f, "{name}({set} where {})", query.predicate()),
        None => write!(f, "{name}({set})"),
    }
}

impl<T: fmt::Display> fmt::Display for Comparison<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

impl<T: fmt::Display> fmt::Display for InArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.negated { BinaryOp::NotIn } else { BinaryOp::In };
        write!(f, "{} {op} (", self.left)?;
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{e}")?;
        }
        f.write_str(")")
    }
}

impl<T: fmt::Display> fmt::Display for Between<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.negated {
            BinaryOp::NotBetween
        } else {
            BinaryOp::Between
        };
        write!(f, "{} {op} {} and {}", self.left, self.lower, self.upper)
    }
}

impl fmt::Display for Int64Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Int64Expr::Const(v) => write!(f, "{v}"),
            Int64Expr::Symbol(name) => f.write_str(name),
            Int64Expr::Count { set, filter } => write_set_call(f, "count", set, filter.as_deref()),
        }
    }
}

impl fmt::Display for Float64Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Float64Expr::Const(v) => f.write_str(&format_float64(*v)),
            Float64Expr::Symbol(name) => f.write_str(name),
            Float64Expr::FromInt64(inner) => write!(f, "float64({inner})"),
        }
    }
}

impl fmt::Display for StringExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringExpr::Const(s) => f.write_str(&quote_string(s)),
            StringExpr::Symbol(name) => f.write_str(name),
            StringExpr::FromInt64(inner) => write!(f, "string({inner})"),
            StringExpr::FromFloat64(inner) => write!(f, "string({inner})"),
        }
    }
}

impl fmt::Display for DatetimeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatetimeExpr::Const(d) => f.write_str(&format_datetime(d)),
            DatetimeExpr::Symbol(name) => f.write_str(name),
        }
    }
}
