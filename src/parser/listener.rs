//! Event contract between a grammar front-end and the query builder.
//!
//! A front-end reports composite productions with `enter`/`exit` pairs and
//! leaf tokens with `terminal`. The pest front-end in [`super::grammar`] is
//! one producer; any parser emitting the same sequence can drive
//! [`super::QueryBuilder`].

use std::fmt;

/// Composite productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Production {
    /// Whole query: predicate plus optional sort/skip/limit clauses.
    Query,
    /// `left <op> right` comparison, including `contains`.
    BinaryExpr,
    /// `left [not] in (...)`.
    InArrayExpr,
    /// `left [not] between lower and upper`.
    BetweenExpr,
    /// `allOf(x)`, `anyOf(x)`, `noneOf(x)`, `count(x)`, `isEmpty(x)`.
    SetFunction,
    /// `count(x where ...)`, `isEmpty(x where ...)`.
    FilteredSetFunction,
    StringArray,
    NumberArray,
    DatetimeArray,
    And,
    Or,
    Not,
    SortBy,
    SortField,
    Skip,
    Limit,
}

impl Production {
    /// Returns true for productions whose operands are collected in their own group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            Production::StringArray
                | Production::NumberArray
                | Production::DatetimeArray
                | Production::SortBy
        )
    }
}

/// Lexical categories of leaf tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Identifier,
    Integer,
    Float,
    String,
    Datetime,
    Bool,
    Null,
    /// `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`.
    Comparison,
    In,
    NotIn,
    Between,
    NotBetween,
    Contains,
    NotContains,
    AllOf,
    AnyOf,
    NoneOf,
    Count,
    IsEmpty,
    Asc,
    Desc,
    /// `none` after `limit`.
    LimitNone,
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Consumer of front-end events.
pub trait QueryListener {
    fn enter(&mut self, production: Production);
    fn exit(&mut self, production: Production);
    fn terminal(&mut self, token: Token, text: &str);
}
