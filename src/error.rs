//! Error types for filterql parsing, binding and evaluation.

use std::fmt;

use thiserror::Error;

use crate::types::{BinaryOp, NodeType};

/// Result type alias using [`QueryError`].
pub type Result<T> = std::result::Result<T, QueryError>;

/// Error types for filterql operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Syntax error reported by the grammar front-end.
    #[error("Syntax error at line {line}, column {col} near '{token}': {message}")]
    Syntax {
        line: usize,
        col: usize,
        token: String,
        message: String,
    },

    /// Binding (type-transform or symbol validation) error.
    #[error("Bind error: {0}")]
    Bind(#[from] BindError),

    /// A literal the grammar accepted but which cannot be decoded.
    #[error("Malformed literal: {0}")]
    MalformedLiteral(String),

    /// Query text exceeds the configured maximum length.
    #[error("Query too long: {len} bytes (max {max})")]
    QueryTooLong { len: usize, max: usize },

    /// Error raised by a symbol or cursor collaborator during evaluation.
    #[error("Evaluation error: {0}")]
    Eval(String),

    /// Builder stack imbalance or an arity violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SyntaxError> for QueryError {
    fn from(err: SyntaxError) -> Self {
        QueryError::Syntax {
            line: err.line,
            col: err.col,
            token: err.token,
            message: err.message,
        }
    }
}

/// Errors that can occur while binding a parsed query to a symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// Referenced a symbol the symbol table does not know.
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    /// The symbol table reported a type that cannot be bound.
    #[error("symbol {symbol} has unsupported type {}", .node_type.name())]
    UnknownSymbolType { symbol: String, node_type: NodeType },

    /// A set symbol was used where a scalar is expected.
    #[error("symbol {0} is a set and can only be used in a set function")]
    SetSymbolAsScalar(String),

    /// A scalar symbol was used as a set function argument.
    #[error("symbol {0} is not a set")]
    ScalarSymbolAsSet(String),

    /// The operator does not accept the operand types.
    #[error("operation {op} is not supported with operand types {}", TypeList(.operand_types))]
    UnsupportedOperation {
        op: BinaryOp,
        operand_types: Vec<NodeType>,
    },

    /// `= null` / `!= null` applied to something other than a symbol.
    #[error("operation {op} null requires a symbol on the left")]
    NotASymbol { op: BinaryOp },
}

impl BindError {
    /// Creates an unsupported-operation error for the given operand types.
    #[must_use]
    pub fn unsupported(op: BinaryOp, operand_types: &[NodeType]) -> Self {
        BindError::UnsupportedOperation {
            op,
            operand_types: operand_types.to_vec(),
        }
    }
}

struct TypeList<'a>(&'a [NodeType]);

impl fmt::Display for TypeList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(t.name())?;
        }
        Ok(())
    }
}

/// A single syntax error reported by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub col: usize,
    /// Offending token text, or `<EOF>`.
    pub token: String,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}:{} near '{}': {}",
            self.line, self.col, self.token, self.message
        )
    }
}
