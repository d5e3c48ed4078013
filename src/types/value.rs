//! Runtime scalar values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::NodeType;

/// Runtime value container for a symbol or literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer value.
    Int64(i64),
    /// 64-bit floating point value.
    Float64(f64),
    /// UTF-8 string value.
    String(String),
    /// Timestamp with offset.
    Datetime(DateTime<FixedOffset>),
    /// Absent value.
    Null,
}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the node type of this value, or None for Null.
    #[must_use]
    pub fn node_type(&self) -> Option<NodeType> {
        match self {
            Value::Bool(_) => Some(NodeType::Bool),
            Value::Int64(_) => Some(NodeType::Int64),
            Value::Float64(_) => Some(NodeType::Float64),
            Value::String(_) => Some(NodeType::String),
            Value::Datetime(_) => Some(NodeType::Datetime),
            Value::Null => None,
        }
    }

    /// Attempts to extract a bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an i64 value.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract an f64 value, widening integers.
    #[must_use]
    // Integers beyond 2^53 round to the nearest float, as in comparisons.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to extract a datetime value.
    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Datetime(d) => Some(*d),
            _ => None,
        }
    }

    /// Compares two values using SQL null semantics.
    ///
    /// Returns None if either value is null or the types don't match.
    /// Integers and floats compare numerically.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
            (Value::Int64(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
            (Value::Float64(a), Value::Int64(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Datetime(a), Value::Datetime(b)) => Some(a.cmp(b)),
            // Null or type mismatch
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Datetime(d) => f.write_str(&d.to_rfc3339()),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::Datetime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
