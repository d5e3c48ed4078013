//! Symbol table and value-source traits implemented by embedding code.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use crate::cursor::{EmptyCursor, FilteredCursor, SetCursor};
use crate::error::Result;
use crate::query::{Query, UNLIMITED};
use crate::types::{NodeType, Value};

/// Static symbol information consulted while binding.
pub trait SymbolTypes {
    /// Returns the type of `symbol`, or None if the symbol is unknown.
    ///
    /// For a set symbol this is the type of its members.
    fn symbol_type(&self, symbol: &str) -> Option<NodeType>;

    /// Returns whether `symbol` is a set, or None if the symbol is unknown.
    fn is_set(&self, symbol: &str) -> Option<bool>;

    /// Returns the symbol table visible inside a sub-query over the set
    /// `symbol`, or None if `symbol` is not a set.
    ///
    /// The set symbol itself resolves to the member inside that scope.
    fn set_symbol_types(&self, symbol: &str) -> Option<&dyn SymbolTypes>;
}

/// Runtime values consulted while evaluating a bound query against one record.
///
/// Every accessor returns `Ok(None)` for an absent (nil) value. Errors are
/// reserved for collaborator failures.
pub trait Symbols {
    fn eval_bool(&self, symbol: &str) -> Result<Option<bool>>;

    fn eval_int64(&self, symbol: &str) -> Result<Option<i64>>;

    fn eval_float64(&self, symbol: &str) -> Result<Option<f64>>;

    fn eval_string(&self, symbol: &str) -> Result<Option<String>>;

    fn eval_datetime(&self, symbol: &str) -> Result<Option<DateTime<FixedOffset>>>;

    /// Returns whether `symbol` has no value.
    fn is_nil(&self, symbol: &str) -> Result<bool>;

    /// Reads `symbol` without a statically known type, as for `AnyType`
    /// symbols.
    ///
    /// The default tries the typed accessors from the narrowest type to the
    /// widest; an accessor that fails is taken to mean the value has another type.
    fn eval_value(&self, symbol: &str) -> Result<Option<Value>> {
        if self.is_nil(symbol)? {
            return Ok(None);
        }
        if let Ok(Some(v)) = self.eval_bool(symbol) {
            return Ok(Some(Value::Bool(v)));
        }
        if let Ok(Some(v)) = self.eval_int64(symbol) {
            return Ok(Some(Value::Int64(v)));
        }
        if let Ok(Some(v)) = self.eval_float64(symbol) {
            return Ok(Some(Value::Float64(v)));
        }
        if let Ok(Some(v)) = self.eval_datetime(symbol) {
            return Ok(Some(Value::Datetime(v)));
        }
        self.eval_string(symbol).map(|v| v.map(Value::String))
    }

    /// Opens a cursor over the members of the set `symbol`.
    fn open_set_cursor(&self, symbol: &str) -> Result<Box<dyn SetCursor + '_>>;

    /// Returns the scope for one member of the set `set`.
    ///
    /// Inside the scope `set` resolves to the member value; for record sets
    /// the member's own fields resolve as well.
    fn member_symbols(&self, set: &str, key: &[u8]) -> Result<Box<dyn Symbols + '_>>;

    /// Encodes `value` as a member key of `set`, enabling seek-based lookups.
    fn seek_key(&self, _set: &str, _value: &Value) -> Option<Vec<u8>> {
        None
    }

    /// Opens a cursor over the members of `symbol` that satisfy `query`,
    /// honoring its skip and limit.
    fn open_set_cursor_for_query(
        &self,
        symbol: &str,
        query: &Query,
    ) -> Result<Box<dyn SetCursor + '_>> {
        let skip = query.skip().unwrap_or(0).max(0);
        let limit = query.limit().unwrap_or(UNLIMITED);
        let mut matched: HashSet<Vec<u8>> = HashSet::new();
        let mut accepted = 0i64;

        let mut cursor = self.open_set_cursor(symbol)?;
        while let Some(key) = cursor.current() {
            let key = key.to_vec();
            let member = self.member_symbols(symbol, &key)?;
            if query.eval_bool(member.as_ref())? {
                accepted += 1;
                if accepted > skip {
                    if limit >= 0 && matched.len() as i64 >= limit {
                        break;
                    }
                    matched.insert(key);
                }
            }
            cursor.next();
        }

        if matched.is_empty() {
            return Ok(Box::new(EmptyCursor));
        }
        let inner = self.open_set_cursor(symbol)?;
        Ok(FilteredCursor::wrap(inner, move |key| matched.contains(key)))
    }
}

impl<S: Symbols + ?Sized> Symbols for &S {
    fn eval_bool(&self, symbol: &str) -> Result<Option<bool>> {
        (**self).eval_bool(symbol)
    }

    fn eval_int64(&self, symbol: &str) -> Result<Option<i64>> {
        (**self).eval_int64(symbol)
    }

    fn eval_float64(&self, symbol: &str) -> Result<Option<f64>> {
        (**self).eval_float64(symbol)
    }

    fn eval_string(&self, symbol: &str) -> Result<Option<String>> {
        (**self).eval_string(symbol)
    }

    fn eval_datetime(&self, symbol: &str) -> Result<Option<DateTime<FixedOffset>>> {
        (**self).eval_datetime(symbol)
    }

    fn is_nil(&self, symbol: &str) -> Result<bool> {
        (**self).is_nil(symbol)
    }

    fn eval_value(&self, symbol: &str) -> Result<Option<Value>> {
        (**self).eval_value(symbol)
    }

    fn open_set_cursor(&self, symbol: &str) -> Result<Box<dyn SetCursor + '_>> {
        (**self).open_set_cursor(symbol)
    }

    fn member_symbols(&self, set: &str, key: &[u8]) -> Result<Box<dyn Symbols + '_>> {
        (**self).member_symbols(set, key)
    }

    fn seek_key(&self, set: &str, value: &Value) -> Option<Vec<u8>> {
        (**self).seek_key(set, value)
    }

    fn open_set_cursor_for_query(
        &self,
        symbol: &str,
        query: &Query,
    ) -> Result<Box<dyn SetCursor + '_>> {
        (**self).open_set_cursor_for_query(symbol, query)
    }
}
