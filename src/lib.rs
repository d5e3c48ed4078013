//! filterql - Filter Query Language
//!
//! Parses textual filter queries, binds them against a caller-supplied
//! symbol table and evaluates them against caller-supplied values.
//!
//! ```text
//! text -> grammar events -> QueryBuilder -> ParsedQuery
//!      -> Binder(SymbolTypes) -> Query -> eval_bool(Symbols)
//! ```
//!
//! A bound [`Query`] is immutable and can be evaluated against many records,
//! from many threads.

pub mod binder;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod memory;
pub mod node;
pub mod parser;
pub mod query;
pub mod symbols;
pub mod types;

pub use error::{BindError, QueryError, Result, SyntaxError};
pub use memory::{Record, Schema};
pub use node::{dump_tree, BoolExpr};
pub use parser::{ParsedQuery, SortField};
pub use query::{Query, SortKey, UNLIMITED};
pub use symbols::{SymbolTypes, Symbols};
pub use types::{BinaryOp, NodeType, SetFunction, SortOrder, Value};

/// Query parser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParserConfig {
    /// Maximum query text length in bytes (0 = unlimited).
    pub max_query_length: usize,
    /// Log every grammar event at trace level.
    pub trace_events: bool,
}

impl ParserConfig {
    /// Creates a new parser configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum query text length in bytes.
    #[must_use]
    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    /// Enables or disables event tracing.
    #[must_use]
    pub fn with_trace_events(mut self, trace_events: bool) -> Self {
        self.trace_events = trace_events;
        self
    }
}

/// Parses and binds queries under a [`ParserConfig`].
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    config: ParserConfig,
}

impl QueryParser {
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses `text` and binds it against `types`.
    ///
    /// Syntax errors take priority: a malformed query never reaches binding.
    ///
    /// # Errors
    ///
    /// Returns the first syntax, literal or binding error.
    pub fn parse(&self, types: &dyn SymbolTypes, text: &str) -> Result<Query> {
        let parsed = self.parse_untyped(text)?;
        bind(types, &parsed)
    }

    /// Parses `text` without binding it.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::QueryTooLong`], the first syntax error or a
    /// malformed literal.
    pub fn parse_untyped(&self, text: &str) -> Result<ParsedQuery> {
        self.check_length(text)?;
        let parsed = parser::parse_text(text, self.config.trace_events)?;
        log::debug!("parsed query {text:?} as {parsed}");
        Ok(parsed)
    }

    /// Returns every syntax error in `text`; empty when the text parses.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::QueryTooLong`] when the text is over the limit.
    pub fn syntax_errors(&self, text: &str) -> Result<Vec<SyntaxError>> {
        self.check_length(text)?;
        Ok(parser::check_syntax(text))
    }

    fn check_length(&self, text: &str) -> Result<()> {
        let max = self.config.max_query_length;
        if max > 0 && text.len() > max {
            log::warn!("rejecting query of {} bytes (max {max})", text.len());
            return Err(QueryError::QueryTooLong {
                len: text.len(),
                max,
            });
        }
        Ok(())
    }
}

/// Parses `text` and binds it against `types` with the default configuration.
///
/// # Errors
///
/// Returns the first syntax, literal or binding error.
pub fn parse(types: &dyn SymbolTypes, text: &str) -> Result<Query> {
    QueryParser::default().parse(types, text)
}

/// Parses `text` into an untyped query with the default configuration.
///
/// # Errors
///
/// Returns the first syntax error or a malformed literal.
pub fn parse_untyped(text: &str) -> Result<ParsedQuery> {
    QueryParser::default().parse_untyped(text)
}

/// Returns every syntax error the grammar reports for `text`.
#[must_use]
pub fn syntax_errors(text: &str) -> Vec<SyntaxError> {
    parser::check_syntax(text)
}

/// Binds a parsed query against `types`.
///
/// # Errors
///
/// Returns the first binding error.
pub fn bind(types: &dyn SymbolTypes, parsed: &ParsedQuery) -> Result<Query> {
    let query = binder::bind(types, parsed)?;
    log::debug!("bound query: {query}");
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("bound tree:\n{}", dump_tree(query.predicate()));
    }
    Ok(query)
}

/// Human-facing name of a node type. Both numeric types are `number`.
#[must_use]
pub fn node_type_name(node_type: NodeType) -> &'static str {
    node_type.name()
}
