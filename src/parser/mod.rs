//! Query text to untyped AST.

pub mod ast;
mod builder;
mod grammar;
pub mod listener;
pub mod literal;

pub use ast::{ArrayLiteral, Expr, ParsedQuery, SortField};
pub use builder::QueryBuilder;
pub use grammar::check_syntax;
pub use listener::{Production, QueryListener, Token};

use crate::error::{QueryError, Result, SyntaxError};

/// Parses query text into an untyped query.
///
/// Empty or all-whitespace text is the match-all query.
///
/// # Errors
///
/// Returns the first syntax error, a malformed literal, or an internal
/// builder error.
pub fn parse_text(text: &str, trace: bool) -> Result<ParsedQuery> {
    if text.trim().is_empty() {
        return Ok(ParsedQuery::match_all());
    }
    let mut builder = QueryBuilder::new();
    grammar::walk_query(text, &mut builder, trace).map_err(first_syntax_error)?;
    builder.finish()
}

fn first_syntax_error(errors: Vec<SyntaxError>) -> QueryError {
    match errors.into_iter().next() {
        Some(err) => err.into(),
        None => QueryError::Internal("syntax check failed without errors".into()),
    }
}
