//! Symbol usage checks over a typed tree.

use crate::error::{BindError, Result};
use crate::node::{walk_bool, NodeRef, NodeVisitor};
use crate::query::Query;
use crate::symbols::SymbolTypes;

/// Checks that every symbol is known, that set symbols only appear as set
/// function arguments (or as the member inside their own quantifier), and
/// that set function arguments are sets.
///
/// Sub-queries of `count`/`isEmpty` are validated against the member scope
/// of their set.
pub struct SymbolValidator<'a> {
    types: &'a dyn SymbolTypes,
    /// Sets whose quantifier predicate is being walked.
    quantified: Vec<String>,
}

impl<'a> SymbolValidator<'a> {
    #[must_use]
    pub fn new(types: &'a dyn SymbolTypes) -> Self {
        SymbolValidator {
            types,
            quantified: Vec::new(),
        }
    }

    /// Validates the predicate and, recursively, every sub-query.
    ///
    /// # Errors
    ///
    /// Returns the first violation in left-to-right order.
    pub fn validate(&mut self, query: &Query) -> Result<()> {
        walk_bool(query.predicate(), self)
    }

    fn check_set(&self, set: &str) -> Result<()> {
        match self.types.is_set(set) {
            None => Err(BindError::UnknownSymbol(set.to_string()).into()),
            Some(false) => Err(BindError::ScalarSymbolAsSet(set.to_string()).into()),
            Some(true) => Ok(()),
        }
    }

    fn check_scalar(&self, symbol: &str) -> Result<()> {
        match self.types.is_set(symbol) {
            None => Err(BindError::UnknownSymbol(symbol.to_string()).into()),
            Some(true) if !self.quantified.iter().any(|s| s == symbol) => {
                Err(BindError::SetSymbolAsScalar(symbol.to_string()).into())
            }
            Some(_) => Ok(()),
        }
    }
}

impl NodeVisitor for SymbolValidator<'_> {
    fn start(&mut self, node: NodeRef<'_>) -> Result<()> {
        if let Some((func, set, sub_query)) = node.set_reference() {
            self.check_set(set)?;
            if func.is_quantifier() {
                self.quantified.push(set.to_string());
            }
            if let Some(sub_query) = sub_query {
                let scope = self
                    .types
                    .set_symbol_types(set)
                    .ok_or_else(|| BindError::ScalarSymbolAsSet(set.to_string()))?;
                SymbolValidator::new(scope).validate(sub_query)?;
            }
            return Ok(());
        }
        if let Some(symbol) = node.symbol() {
            self.check_scalar(symbol)?;
        }
        Ok(())
    }

    fn end(&mut self, node: NodeRef<'_>) -> Result<()> {
        if let Some((func, ..)) = node.set_reference() {
            if func.is_quantifier() {
                self.quantified.pop();
            }
        }
        Ok(())
    }
}
