//! Bound queries.

use std::cmp::Ordering;
use std::fmt;

use crate::error::Result;
use crate::node::BoolExpr;
use crate::symbols::Symbols;
use crate::types::{NodeType, Value};

/// `limit none`.
pub const UNLIMITED: i64 = -1;

/// A resolved SORT BY field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub symbol: String,
    pub ascending: bool,
    /// Type of the symbol, used to read its value.
    pub node_type: NodeType,
}

/// A query bound to a symbol table.
///
/// Immutable once bound; one query can be evaluated against any number of
/// records, from any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub(crate) predicate: BoolExpr,
    pub(crate) sort_by: Option<Vec<SortKey>>,
    pub(crate) skip: Option<i64>,
    pub(crate) limit: Option<i64>,
}

impl Query {
    pub(crate) fn new(
        predicate: BoolExpr,
        sort_by: Option<Vec<SortKey>>,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Self {
        Query {
            predicate,
            sort_by,
            skip,
            limit,
        }
    }

    /// Returns the bound predicate.
    #[must_use]
    pub fn predicate(&self) -> &BoolExpr {
        &self.predicate
    }

    /// Returns the SORT BY fields as `(symbol, ascending)` pairs, or None
    /// when the query has no sort clause.
    #[must_use]
    pub fn sort_fields(&self) -> Option<Vec<(&str, bool)>> {
        self.sort_by.as_ref().map(|keys| {
            keys.iter()
                .map(|k| (k.symbol.as_str(), k.ascending))
                .collect()
        })
    }

    /// Returns the resolved SORT BY fields.
    #[must_use]
    pub fn sort_keys(&self) -> Option<&[SortKey]> {
        self.sort_by.as_deref()
    }

    /// Returns the SKIP amount, or None when unspecified.
    #[must_use]
    pub fn skip(&self) -> Option<i64> {
        self.skip
    }

    /// Returns the LIMIT amount, [`UNLIMITED`] for `limit none`, or None when
    /// unspecified.
    #[must_use]
    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// Evaluates the predicate against one record.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by `symbols`.
    pub fn eval_bool(&self, symbols: &dyn Symbols) -> Result<bool> {
        self.predicate.eval_bool(symbols)
    }

    /// Reads the sort field values of one record, nil as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Propagates errors raised by `symbols`.
    pub fn sort_values(&self, symbols: &dyn Symbols) -> Result<Vec<Value>> {
        self.sort_keys()
            .unwrap_or_default()
            .iter()
            .map(|key| symbol_value(symbols, &key.symbol, key.node_type))
            .collect()
    }

    /// Orders two records by the sort fields. Nil sorts first when ascending.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by either record.
    pub fn compare_records(&self, a: &dyn Symbols, b: &dyn Symbols) -> Result<Ordering> {
        let a = self.sort_values(a)?;
        let b = self.sort_values(b)?;
        Ok(self.compare_values(&a, &b))
    }

    fn compare_values(&self, a: &[Value], b: &[Value]) -> Ordering {
        let keys = self.sort_keys().unwrap_or_default();
        for ((key, va), vb) in keys.iter().zip(a).zip(b) {
            let ord = match (va.is_null(), vb.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => va.compare(vb).unwrap_or(Ordering::Equal),
            };
            let ord = if key.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Applies SKIP and LIMIT to an already ordered sequence.
    ///
    /// A skip `<= 0` is ignored; an absent or negative limit is unlimited.
    pub fn paginate<I: IntoIterator>(&self, items: I) -> impl Iterator<Item = I::Item> {
        let skip = self
            .skip
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        let take = self
            .limit
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take)
    }

    /// Evaluates, sorts and paginates a slice of records.
    ///
    /// Records that compare equal keep their input order.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by a record.
    pub fn filter_records<'r, S: Symbols>(&self, records: &'r [S]) -> Result<Vec<&'r S>> {
        let mut matched = Vec::new();
        for record in records {
            if self.eval_bool(record)? {
                let values = if self.sort_by.is_some() {
                    self.sort_values(record)?
                } else {
                    Vec::new()
                };
                matched.push((values, record));
            }
        }
        if self.sort_by.is_some() {
            matched.sort_by(|(a, _), (b, _)| self.compare_values(a, b));
        }
        log::debug!("{} of {} records matched", matched.len(), records.len());
        Ok(self
            .paginate(matched)
            .map(|(_, record)| record)
            .collect())
    }
}

/// Reads `symbol` as a [`Value`] of the given type.
pub(crate) fn symbol_value(
    symbols: &dyn Symbols,
    symbol: &str,
    node_type: NodeType,
) -> Result<Value> {
    let value = match node_type {
        NodeType::Bool => symbols.eval_bool(symbol)?.map(Value::Bool),
        NodeType::Int64 => symbols.eval_int64(symbol)?.map(Value::Int64),
        NodeType::Float64 => symbols.eval_float64(symbol)?.map(Value::Float64),
        NodeType::String => symbols.eval_string(symbol)?.map(Value::String),
        NodeType::Datetime => symbols.eval_datetime(symbol)?.map(Value::Datetime),
        NodeType::AnyType | NodeType::Other => symbols.eval_value(symbol)?,
    };
    Ok(value.unwrap_or(Value::Null))
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)?;
        if let Some(keys) = &self.sort_by {
            f.write_str(" sort by ")?;
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                let dir = if key.ascending { "asc" } else { "desc" };
                write!(f, "{} {dir}", key.symbol)?;
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
