//! Binder module for semantic analysis.
//!
//! The binder turns an untyped parse tree into a typed, directly evaluable
//! tree, resolving:
//! - Symbol names and types against a [`crate::SymbolTypes`] table
//! - Operand types per operator, promoting int to float where they mix
//! - Set function usage (`allOf`/`anyOf`/`noneOf` apply to each member)
//!
//! A separate validation pass then checks set and scalar symbol usage.

mod semantic;
mod validator;

pub use semantic::{bind, Binder};
pub use validator::SymbolValidator;
