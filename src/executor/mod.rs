//! Evaluation of bound expression trees against one record.
//!
//! Any comparison with an absent operand is false, including the negated
//! operators. Absence is only observable through `= null` / `!= null`.

mod set;

use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::node::{Between, BoolExpr, Comparison, DatetimeExpr, Float64Expr, InArray, Int64Expr, StringExpr};
use crate::symbols::Symbols;
use crate::types::BinaryOp;

impl BoolExpr {
    /// Evaluates this predicate.
    ///
    /// `and`/`or` short-circuit; a nil bool symbol reads as false.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by `symbols` or its set cursors.
    pub fn eval_bool(&self, symbols: &dyn Symbols) -> Result<bool> {
        match self {
            BoolExpr::Const(b) => Ok(*b),
            BoolExpr::Symbol(name) => Ok(symbols.eval_bool(name)?.unwrap_or(false)),
            BoolExpr::And(l, r) => Ok(l.eval_bool(symbols)? && r.eval_bool(symbols)?),
            BoolExpr::Or(l, r) => Ok(l.eval_bool(symbols)? || r.eval_bool(symbols)?),
            BoolExpr::Not(inner) => Ok(!inner.eval_bool(symbols)?),
            BoolExpr::IsNil { symbol, negated } => Ok(symbols.is_nil(symbol)? != *negated),
            BoolExpr::BoolCompare(c) => eval_comparison(c, symbols),
            BoolExpr::Int64Compare(c) => eval_comparison(c, symbols),
            BoolExpr::Float64Compare(c) => eval_comparison(c, symbols),
            BoolExpr::StringCompare(c) => eval_string_comparison(c, symbols),
            BoolExpr::DatetimeCompare(c) => eval_comparison(c, symbols),
            BoolExpr::InInt64Array(a) => eval_in_array(a, symbols),
            BoolExpr::InFloat64Array(a) => eval_in_array(a, symbols),
            BoolExpr::InStringArray(a) => eval_in_array(a, symbols),
            BoolExpr::InDatetimeArray(a) => eval_in_array(a, symbols),
            BoolExpr::Int64Between(b) => eval_between(b, symbols),
            BoolExpr::Float64Between(b) => eval_between(b, symbols),
            BoolExpr::DatetimeBetween(b) => eval_between(b, symbols),
            BoolExpr::AllOf(q) => set::eval_all_of(q, symbols),
            BoolExpr::AnyOf(q) => set::eval_any_of(q, symbols),
            BoolExpr::NoneOf(q) => Ok(!set::eval_any_of(q, symbols)?),
            BoolExpr::IsEmpty { set, filter } => set::eval_is_empty(symbols, set, filter.as_deref()),
        }
    }

    /// Evaluates this node as a comparison operand, keeping nil distinct from false.
    fn eval_operand(&self, symbols: &dyn Symbols) -> Result<Option<bool>> {
        match self {
            BoolExpr::Symbol(name) => symbols.eval_bool(name),
            other => other.eval_bool(symbols).map(Some),
        }
    }
}

impl Int64Expr {
    /// Evaluates this node; None when the value is absent.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by `symbols`.
    pub fn eval_int64(&self, symbols: &dyn Symbols) -> Result<Option<i64>> {
        match self {
            Int64Expr::Const(v) => Ok(Some(*v)),
            Int64Expr::Symbol(name) => symbols.eval_int64(name),
            Int64Expr::Count { set, filter } => {
                set::eval_count(symbols, set, filter.as_deref()).map(Some)
            }
        }
    }
}

impl Float64Expr {
    /// Evaluates this node; None when the value is absent.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by `symbols`.
    #[allow(clippy::cast_precision_loss)]
    pub fn eval_float64(&self, symbols: &dyn Symbols) -> Result<Option<f64>> {
        match self {
            Float64Expr::Const(v) => Ok(Some(*v)),
            Float64Expr::Symbol(name) => symbols.eval_float64(name),
            Float64Expr::FromInt64(inner) => Ok(inner.eval_int64(symbols)?.map(|v| v as f64)),
        }
    }
}

impl StringExpr {
    /// Evaluates this node; None when the value is absent.
    ///
    /// Numbers render in base 10; floats use the shortest decimal that
    /// reads back to the same value.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by `symbols`.
    pub fn eval_string(&self, symbols: &dyn Symbols) -> Result<Option<String>> {
        match self {
            StringExpr::Const(s) => Ok(Some(s.clone())),
            StringExpr::Symbol(name) => symbols.eval_string(name),
            StringExpr::FromInt64(inner) => Ok(inner.eval_int64(symbols)?.map(|v| v.to_string())),
            StringExpr::FromFloat64(inner) => {
                Ok(inner.eval_float64(symbols)?.map(|v| v.to_string()))
            }
        }
    }
}

impl DatetimeExpr {
    /// Evaluates this node; None when the value is absent.
    ///
    /// # Errors
    ///
    /// Propagates errors raised by `symbols`.
    pub fn eval_datetime(&self, symbols: &dyn Symbols) -> Result<Option<DateTime<FixedOffset>>> {
        match self {
            DatetimeExpr::Const(d) => Ok(Some(*d)),
            DatetimeExpr::Symbol(name) => symbols.eval_datetime(name),
        }
    }
}

/// A typed node usable as a scalar operand.
trait Operand {
    type Value: PartialOrd;

    fn eval_value(&self, symbols: &dyn Symbols) -> Result<Option<Self::Value>>;
}

impl Operand for BoolExpr {
    type Value = bool;

    fn eval_value(&self, symbols: &dyn Symbols) -> Result<Option<bool>> {
        self.eval_operand(symbols)
    }
}

impl Operand for Int64Expr {
    type Value = i64;

    fn eval_value(&self, symbols: &dyn Symbols) -> Result<Option<i64>> {
        self.eval_int64(symbols)
    }
}

impl Operand for Float64Expr {
    type Value = f64;

    fn eval_value(&self, symbols: &dyn Symbols) -> Result<Option<f64>> {
        self.eval_float64(symbols)
    }
}

impl Operand for StringExpr {
    type Value = String;

    fn eval_value(&self, symbols: &dyn Symbols) -> Result<Option<String>> {
        self.eval_string(symbols)
    }
}

impl Operand for DatetimeExpr {
    type Value = DateTime<FixedOffset>;

    fn eval_value(&self, symbols: &dyn Symbols) -> Result<Option<Self::Value>> {
        self.eval_datetime(symbols)
    }
}

fn eval_comparison<T: Operand>(c: &Comparison<T>, symbols: &dyn Symbols) -> Result<bool> {
    let Some(left) = c.left.eval_value(symbols)? else {
        return Ok(false);
    };
    let Some(right) = c.right.eval_value(symbols)? else {
        return Ok(false);
    };
    // NaN has no ordering and matches nothing.
    Ok(left
        .partial_cmp(&right)
        .is_some_and(|ord| c.op.matches(ord)))
}

fn eval_string_comparison(c: &Comparison<StringExpr>, symbols: &dyn Symbols) -> Result<bool> {
    match c.op {
        BinaryOp::Contains | BinaryOp::NotContains => {
            let Some(left) = c.left.eval_string(symbols)? else {
                return Ok(false);
            };
            let Some(right) = c.right.eval_string(symbols)? else {
                return Ok(false);
            };
            Ok(left.contains(right.as_str()) != c.op.is_negated())
        }
        _ => eval_comparison(c, symbols),
    }
}

fn eval_in_array<T: Operand>(a: &InArray<T>, symbols: &dyn Symbols) -> Result<bool> {
    let Some(left) = a.left.eval_value(symbols)? else {
        return Ok(false);
    };
    let mut found = false;
    for element in &a.elements {
        if element.eval_value(symbols)?.is_some_and(|v| v == left) {
            found = true;
            break;
        }
    }
    Ok(found != a.negated)
}

/// `lower <= left < upper`.
fn eval_between<T: Operand>(b: &Between<T>, symbols: &dyn Symbols) -> Result<bool> {
    let Some(left) = b.left.eval_value(symbols)? else {
        return Ok(false);
    };
    let Some(lower) = b.lower.eval_value(symbols)? else {
        return Ok(false);
    };
    let Some(upper) = b.upper.eval_value(symbols)? else {
        return Ok(false);
    };
    // An incomparable operand (NaN) matches neither form.
    if left.partial_cmp(&lower).is_none() || left.partial_cmp(&upper).is_none() {
        return Ok(false);
    }
    let inside = left >= lower && left < upper;
    Ok(inside != b.negated)
}
