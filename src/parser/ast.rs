//! Untyped abstract syntax tree produced by the query builder.
//!
//! Nodes carry literal values and symbol names but no symbol types; the
//! binder turns them into typed nodes.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::literal::{format_datetime, format_float64, quote_string};
use crate::types::{BinaryOp, SetFunction};

/// A parsed, unbound query.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// Filter predicate.
    pub predicate: Expr,
    /// SORT BY fields, in order.
    pub sort_by: Option<Vec<SortField>>,
    /// SKIP amount.
    pub skip: Option<i64>,
    /// LIMIT amount; `-1` for `limit none`.
    pub limit: Option<i64>,
}

impl ParsedQuery {
    /// Creates a query with only a predicate.
    #[must_use]
    pub fn new(predicate: Expr) -> Self {
        ParsedQuery {
            predicate,
            sort_by: None,
            skip: None,
            limit: None,
        }
    }

    /// The query for empty text: always true, no sort, skip or limit.
    #[must_use]
    pub fn match_all() -> Self {
        ParsedQuery::new(Expr::Bool(true))
    }
}

/// SORT BY item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Symbol name.
    pub symbol: String,
    /// Sort direction (true = ASC, false = DESC).
    pub ascending: bool,
}

impl SortField {
    #[must_use]
    pub fn new(symbol: impl Into<String>, ascending: bool) -> Self {
        SortField {
            symbol: symbol.into(),
            ascending,
        }
    }
}

/// Literal array on the right of `in`.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayLiteral {
    String(Vec<String>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Datetime(Vec<DateTime<FixedOffset>>),
}

impl ArrayLiteral {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ArrayLiteral::String(v) => v.len(),
            ArrayLiteral::Int64(v) => v.len(),
            ArrayLiteral::Float64(v) => v.len(),
            ArrayLiteral::Datetime(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Untyped expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Datetime(DateTime<FixedOffset>),
    Null,
    /// Symbol reference whose type is not yet known.
    Symbol(String),
    /// Set function applied to a set symbol, with an optional member filter.
    SetFunction {
        func: SetFunction,
        symbol: String,
        filter: Option<Box<Expr>>,
    },
    Array(ArrayLiteral),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    InArray {
        left: Box<Expr>,
        op: BinaryOp,
        array: ArrayLiteral,
    },
    Between {
        left: Box<Expr>,
        op: BinaryOp,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Creates a binary expression.
    #[must_use]
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Creates a symbol reference.
    #[must_use]
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    /// Returns the node kind, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Bool(_) => "bool literal",
            Expr::Int64(_) | Expr::Float64(_) => "number literal",
            Expr::String(_) => "string literal",
            Expr::Datetime(_) => "datetime literal",
            Expr::Null => "null",
            Expr::Symbol(_) => "symbol",
            Expr::SetFunction { .. } => "set function",
            Expr::Array(_) => "array",
            Expr::Binary { .. } => "binary expression",
            Expr::InArray { .. } => "in expression",
            Expr::Between { .. } => "between expression",
            Expr::And(..) => "and",
            Expr::Or(..) => "or",
            Expr::Not(_) => "not",
        }
    }
}

impl fmt::Display for ArrayLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = match self {
            ArrayLiteral::String(v) => v.iter().map(|s| quote_string(s)).collect(),
            ArrayLiteral::Int64(v) => v.iter().map(ToString::to_string).collect(),
            ArrayLiteral::Float64(v) => v.iter().map(|x| format_float64(*x)).collect(),
            ArrayLiteral::Datetime(v) => v.iter().map(format_datetime).collect(),
        };
        write!(f, "({})", items.join(", "))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Int64(v) => write!(f, "{v}"),
            Expr::Float64(v) => f.write_str(&format_float64(*v)),
            Expr::String(s) => f.write_str(&quote_string(s)),
            Expr::Datetime(d) => f.write_str(&format_datetime(d)),
            Expr::Null => f.write_str("null"),
            Expr::Symbol(name) => f.write_str(name),
            Expr::SetFunction {
                func,
                symbol,
                filter: Some(filter),
            } => write!(f, "{func}({symbol} where {filter})"),
            Expr::SetFunction { func, symbol, .. } => write!(f, "{func}({symbol})"),
            Expr::Array(array) => write!(f, "{array}"),
            Expr::Binary { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::InArray { left, op, array } => write!(f, "{left} {op} {array}"),
            Expr::Between {
                left,
                op,
                lower,
                upper,
            } => write!(f, "{left} {op} {lower} and {upper}"),
            Expr::And(l, r) => write!(f, "({l} and {r})"),
            Expr::Or(l, r) => write!(f, "({l} or {r})"),
            Expr::Not(inner) => write!(f, "not ({inner})"),
        }
    }
}

impl fmt::Display for ParsedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)?;
        if let Some(sort_by) = &self.sort_by {
            f.write_str(" sort by ")?;
            for (i, field) in sort_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                let dir = if field.ascending { "asc" } else { "desc" };
                write!(f, "{} {dir}", field.symbol)?;
            }
        }
        if let Some(skip) = self.skip {
            write!(f, " skip {skip}")?;
        }
        match self.limit {
            Some(limit) if limit < 0 => f.write_str(" limit none")?,
            Some(limit) => write!(f, " limit {limit}")?,
            None => {}
        }
        Ok(())
    }
}
