//! Set quantifiers, `count` and `isEmpty`.

use crate::cursor::{count_members, SeekableSetCursor, SetCursor};
use crate::error::Result;
use crate::node::{BoolExpr, Comparison, DatetimeExpr, Float64Expr, InArray, Int64Expr, Quantified, StringExpr};
use crate::query::Query;
use crate::symbols::Symbols;
use crate::types::{BinaryOp, Value};

/// True when every member satisfies the predicate; true on an empty set.
pub(super) fn eval_all_of(q: &Quantified, symbols: &dyn Symbols) -> Result<bool> {
    let mut cursor = symbols.open_set_cursor(&q.set)?;
    while let Some(key) = cursor.current() {
        let member = symbols.member_symbols(&q.set, key)?;
        if !q.predicate.eval_bool(member.as_ref())? {
            return Ok(false);
        }
        cursor.next();
    }
    Ok(true)
}

/// True when some member satisfies the predicate; false on an empty set.
pub(super) fn eval_any_of(q: &Quantified, symbols: &dyn Symbols) -> Result<bool> {
    let mut cursor = symbols.open_set_cursor(&q.set)?;
    if let Some(keys) = seek_keys(q, symbols) {
        if let Some(seekable) = cursor.as_seekable() {
            log::trace!("anyOf({}) seeking {} keys", q.set, keys.len());
            return seek_any(seekable, &keys, q, symbols);
        }
    }
    while let Some(key) = cursor.current() {
        let member = symbols.member_symbols(&q.set, key)?;
        if q.predicate.eval_bool(member.as_ref())? {
            return Ok(true);
        }
        cursor.next();
    }
    Ok(false)
}

/// Number of members, narrowed by `filter` when present.
pub(super) fn eval_count(symbols: &dyn Symbols, set: &str, filter: Option<&Query>) -> Result<i64> {
    let mut cursor = open(symbols, set, filter)?;
    Ok(count_members(cursor.as_mut()))
}

pub(super) fn eval_is_empty(symbols: &dyn Symbols, set: &str, filter: Option<&Query>) -> Result<bool> {
    let cursor = open(symbols, set, filter)?;
    Ok(!cursor.is_valid())
}

fn open<'s>(
    symbols: &'s dyn Symbols,
    set: &str,
    filter: Option<&Query>,
) -> Result<Box<dyn SetCursor + 's>> {
    match filter {
        Some(query) => symbols.open_set_cursor_for_query(set, query),
        None => symbols.open_set_cursor(set),
    }
}

fn seek_any(
    cursor: &mut dyn SeekableSetCursor,
    keys: &[Vec<u8>],
    q: &Quantified,
    symbols: &dyn Symbols,
) -> Result<bool> {
    for key in keys {
        cursor.seek(key);
        if cursor.current() != Some(key.as_slice()) {
            continue;
        }
        let member = symbols.member_symbols(&q.set, key)?;
        if q.predicate.eval_bool(member.as_ref())? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Encodes the seek values of the predicate as member keys, if the
/// collaborator can encode every one of them.
fn seek_keys(q: &Quantified, symbols: &dyn Symbols) -> Option<Vec<Vec<u8>>> {
    q.predicate
        .seek_values(&q.set)?
        .iter()
        .map(|value| symbols.seek_key(&q.set, value))
        .collect()
}

impl BoolExpr {
    /// Returns the member values that can satisfy this predicate when it
    /// only tests the member `set` for equality with constants.
    ///
    /// `set = c`, `set in (c1, c2)` and disjunctions of those qualify.
    #[must_use]
    pub fn seek_values(&self, set: &str) -> Option<Vec<Value>> {
        match self {
            BoolExpr::Int64Compare(c) => equality_value(c, set, |e| match e {
                Int64Expr::Symbol(name) => Some(Err(name.as_str())),
                Int64Expr::Const(v) => Some(Ok(Value::Int64(*v))),
                Int64Expr::Count { .. } => None,
            }),
            BoolExpr::Float64Compare(c) => equality_value(c, set, |e| match e {
                Float64Expr::Symbol(name) => Some(Err(name.as_str())),
                Float64Expr::Const(v) => Some(Ok(Value::Float64(*v))),
                Float64Expr::FromInt64(_) => None,
            }),
            BoolExpr::StringCompare(c) => equality_value(c, set, |e| match e {
                StringExpr::Symbol(name) => Some(Err(name.as_str())),
                StringExpr::Const(s) => Some(Ok(Value::String(s.clone()))),
                StringExpr::FromInt64(_) | StringExpr::FromFloat64(_) => None,
            }),
            BoolExpr::DatetimeCompare(c) => equality_value(c, set, |e| match e {
                DatetimeExpr::Symbol(name) => Some(Err(name.as_str())),
                DatetimeExpr::Const(d) => Some(Ok(Value::Datetime(*d))),
            }),
            BoolExpr::InInt64Array(a) => array_values(a, set, |e| match e {
                Int64Expr::Symbol(name) => Some(Err(name.as_str())),
                Int64Expr::Const(v) => Some(Ok(Value::Int64(*v))),
                Int64Expr::Count { .. } => None,
            }),
            BoolExpr::InFloat64Array(a) => array_values(a, set, |e| match e {
                Float64Expr::Symbol(name) => Some(Err(name.as_str())),
                Float64Expr::Const(v) => Some(Ok(Value::Float64(*v))),
                Float64Expr::FromInt64(_) => None,
            }),
            BoolExpr::InStringArray(a) => array_values(a, set, |e| match e {
                StringExpr::Symbol(name) => Some(Err(name.as_str())),
                StringExpr::Const(s) => Some(Ok(Value::String(s.clone()))),
                StringExpr::FromInt64(_) | StringExpr::FromFloat64(_) => None,
            }),
            BoolExpr::InDatetimeArray(a) => array_values(a, set, |e| match e {
                DatetimeExpr::Symbol(name) => Some(Err(name.as_str())),
                DatetimeExpr::Const(d) => Some(Ok(Value::Datetime(*d))),
            }),
            BoolExpr::Or(l, r) => {
                let mut values = l.seek_values(set)?;
                values.extend(r.seek_values(set)?);
                Some(values)
            }
            _ => None,
        }
    }
}

/// Classifies an operand as a symbol reference (`Err(name)`) or a constant
/// (`Ok(value)`); None for anything else.
type Classify<T> = fn(&T) -> Option<std::result::Result<Value, &str>>;

fn equality_value<T>(c: &Comparison<T>, set: &str, classify: Classify<T>) -> Option<Vec<Value>> {
    if c.op != BinaryOp::Eq {
        return None;
    }
    match (classify(&c.left)?, classify(&c.right)?) {
        (Err(name), Ok(value)) if name == set => Some(vec![value]),
        _ => None,
    }
}

fn array_values<T>(a: &InArray<T>, set: &str, classify: Classify<T>) -> Option<Vec<Value>> {
    if a.negated || !matches!(classify(&a.left)?, Err(name) if name == set) {
        return None;
    }
    a.elements
        .iter()
        .map(|e| classify(e)?.ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_eq(v: i64) -> BoolExpr {
        BoolExpr::Int64Compare(Comparison {
            left: Int64Expr::Symbol("ids".into()),
            op: BinaryOp::Eq,
            right: Int64Expr::Const(v),
        })
    }

    #[test]
    fn test_seek_values_equality_and_or() {
        let expr = BoolExpr::or(ids_eq(1), ids_eq(2));
        assert_eq!(
            expr.seek_values("ids"),
            Some(vec![Value::Int64(1), Value::Int64(2)])
        );
        assert_eq!(expr.seek_values("other"), None);
    }

    #[test]
    fn test_seek_values_rejects_non_equality() {
        let expr = BoolExpr::Int64Compare(Comparison {
            left: Int64Expr::Symbol("ids".into()),
            op: BinaryOp::Lt,
            right: Int64Expr::Const(3),
        });
        assert_eq!(expr.seek_values("ids"), None);
        assert_eq!(BoolExpr::and(ids_eq(1), ids_eq(2)).seek_values("ids"), None);
    }

    #[test]
    fn test_seek_values_in_array() {
        let expr = BoolExpr::InStringArray(InArray {
            left: StringExpr::Symbol("tags".into()),
            negated: false,
            elements: vec![StringExpr::Const("a".into()), StringExpr::Const("b".into())],
        });
        assert_eq!(
            expr.seek_values("tags"),
            Some(vec![Value::from("a"), Value::from("b")])
        );
        let negated = BoolExpr::InStringArray(InArray {
            left: StringExpr::Symbol("tags".into()),
            negated: true,
            elements: vec![StringExpr::Const("a".into())],
        });
        assert_eq!(negated.seek_values("tags"), None);
    }
}
