//! In-memory symbol table and record.
//!
//! [`Schema`] describes the fields of a record and [`Record`] holds one
//! record's values. Both are plain owned data, suitable for tests and for
//! filtering collections already in memory.
//!
//! Scalar set members are keyed by an order-preserving encoding of their
//! value, so member cursors traverse in value order and support seeking.
//! Record set members are keyed by position.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset};

use crate::cursor::{EmptyCursor, SetCursor, TreeSet};
use crate::error::{QueryError, Result};
use crate::symbols::{SymbolTypes, Symbols};
use crate::types::{NodeType, Value};

/// Field types of a record.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: HashMap<String, NodeType>,
    sets: HashMap<String, SetSchema>,
}

#[derive(Debug, Clone)]
struct SetSchema {
    /// Member type; `Other` for record sets.
    element: NodeType,
    /// Symbols visible in a sub-query over the set.
    members: Schema,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scalar field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, node_type: NodeType) -> Self {
        self.fields.insert(name.into(), node_type);
        self
    }

    /// Adds a set of scalars. Inside a sub-query the set name is the member.
    #[must_use]
    pub fn with_set(mut self, name: impl Into<String>, element: NodeType) -> Self {
        let name = name.into();
        let members = Schema::new().with_field(name.clone(), element);
        self.sets.insert(name, SetSchema { element, members });
        self
    }

    /// Adds a set of records described by `members`.
    #[must_use]
    pub fn with_record_set(mut self, name: impl Into<String>, members: Schema) -> Self {
        self.sets.insert(
            name.into(),
            SetSchema {
                element: NodeType::Other,
                members,
            },
        );
        self
    }
}

impl SymbolTypes for Schema {
    fn symbol_type(&self, symbol: &str) -> Option<NodeType> {
        self.fields
            .get(symbol)
            .copied()
            .or_else(|| self.sets.get(symbol).map(|s| s.element))
    }

    fn is_set(&self, symbol: &str) -> Option<bool> {
        if self.fields.contains_key(symbol) {
            Some(false)
        } else if self.sets.contains_key(symbol) {
            Some(true)
        } else {
            None
        }
    }

    fn set_symbol_types(&self, symbol: &str) -> Option<&dyn SymbolTypes> {
        self.sets
            .get(symbol)
            .map(|s| &s.members as &dyn SymbolTypes)
    }
}

#[derive(Debug, Clone)]
enum MemberSet {
    /// Members by encoded key; `element` is the type of the first member.
    Scalars {
        element: Option<NodeType>,
        members: BTreeMap<Vec<u8>, Value>,
    },
    Records(Vec<Record>),
}

/// Values of one record.
#[derive(Debug, Clone, Default)]
pub struct Record {
    values: HashMap<String, Value>,
    sets: HashMap<String, MemberSet>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar value.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Sets a set of scalars. Nulls and duplicates are dropped.
    #[must_use]
    pub fn with_set<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let mut element = None;
        let mut members = BTreeMap::new();
        for value in values {
            let value = value.into();
            let Some(node_type) = value.node_type() else {
                continue;
            };
            element.get_or_insert(node_type);
            members.insert(encode_key(&value), value);
        }
        self.sets
            .insert(name.into(), MemberSet::Scalars { element, members });
        self
    }

    /// Sets a set of records.
    #[must_use]
    pub fn with_record_set(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.sets.insert(name.into(), MemberSet::Records(records));
        self
    }

    /// Returns a scalar value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Reads a scalar; Ok(None) when absent or null.
    fn read<T>(
        &self,
        symbol: &str,
        expected: &str,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.values.get(symbol) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => convert(value).map(Some).ok_or_else(|| {
                QueryError::Eval(format!("symbol {symbol} holds {value:?}, expected {expected}"))
            }),
        }
    }

    fn member_set(&self, set: &str) -> Result<Option<&MemberSet>> {
        if self.values.contains_key(set) {
            return Err(QueryError::Eval(format!("symbol {set} is not a set")));
        }
        Ok(self.sets.get(set))
    }
}

impl Symbols for Record {
    fn eval_bool(&self, symbol: &str) -> Result<Option<bool>> {
        self.read(symbol, "bool", Value::as_bool)
    }

    fn eval_int64(&self, symbol: &str) -> Result<Option<i64>> {
        self.read(symbol, "integer", Value::as_int64)
    }

    fn eval_float64(&self, symbol: &str) -> Result<Option<f64>> {
        self.read(symbol, "number", Value::as_float64)
    }

    fn eval_string(&self, symbol: &str) -> Result<Option<String>> {
        self.read(symbol, "string", |value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Int64(v) => Some(v.to_string()),
            Value::Float64(v) => Some(v.to_string()),
            _ => None,
        })
    }

    fn eval_datetime(&self, symbol: &str) -> Result<Option<DateTime<FixedOffset>>> {
        self.read(symbol, "datetime", Value::as_datetime)
    }

    fn is_nil(&self, symbol: &str) -> Result<bool> {
        if self.sets.contains_key(symbol) {
            return Ok(false);
        }
        Ok(self.values.get(symbol).map_or(true, Value::is_null))
    }

    fn eval_value(&self, symbol: &str) -> Result<Option<Value>> {
        Ok(self.values.get(symbol).filter(|v| !v.is_null()).cloned())
    }

    fn open_set_cursor(&self, symbol: &str) -> Result<Box<dyn SetCursor + '_>> {
        let keys: TreeSet = match self.member_set(symbol)? {
            None => return Ok(Box::new(EmptyCursor)),
            Some(MemberSet::Scalars { members, .. }) => members.keys().cloned().collect(),
            Some(MemberSet::Records(records)) => (0..records.len()).map(index_key).collect(),
        };
        Ok(Box::new(keys.into_cursor()))
    }

    fn member_symbols(&self, set: &str, key: &[u8]) -> Result<Box<dyn Symbols + '_>> {
        let missing = || QueryError::Eval(format!("set {set} has no member with key {key:02x?}"));
        match self.member_set(set)? {
            Some(MemberSet::Scalars { members, .. }) => {
                let value = members.get(key).ok_or_else(missing)?;
                Ok(Box::new(Record::new().with_value(set, value.clone())))
            }
            Some(MemberSet::Records(records)) => {
                let record = decode_index(key)
                    .and_then(|i| records.get(i))
                    .ok_or_else(missing)?;
                Ok(Box::new(record))
            }
            None => Err(missing()),
        }
    }

    fn seek_key(&self, set: &str, value: &Value) -> Option<Vec<u8>> {
        match self.sets.get(set)? {
            MemberSet::Scalars {
                element: Some(element),
                ..
            } if value.node_type() == Some(*element) => Some(encode_key(value)),
            // Nothing to find in an empty set, whatever the key.
            MemberSet::Scalars { element: None, .. } => Some(encode_key(value)),
            _ => None,
        }
    }
}

const SIGN_BIT: u64 = 1 << 63;

/// Encodes a scalar so that byte order matches value order within one type.
///
/// Values that compare equal share a key, so `-0.0` encodes as `0.0`.
#[allow(clippy::float_cmp)]
fn encode_key(value: &Value) -> Vec<u8> {
    match value {
        Value::Bool(b) => vec![u8::from(*b)],
        Value::Int64(v) => encode_i64(*v).to_vec(),
        Value::Float64(v) => {
            let v = if *v == 0.0 { 0.0 } else { *v };
            let bits = v.to_bits();
            let ordered = if bits & SIGN_BIT == 0 {
                bits | SIGN_BIT
            } else {
                !bits
            };
            ordered.to_be_bytes().to_vec()
        }
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Datetime(d) => {
            let mut key = encode_i64(d.timestamp()).to_vec();
            key.extend_from_slice(&d.timestamp_subsec_nanos().to_be_bytes());
            key
        }
        Value::Null => Vec::new(),
    }
}

#[allow(clippy::cast_sign_loss)]
fn encode_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ SIGN_BIT).to_be_bytes()
}

fn index_key(index: usize) -> Vec<u8> {
    (index as u64).to_be_bytes().to_vec()
}

fn decode_index(key: &[u8]) -> Option<usize> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    usize::try_from(u64::from_be_bytes(bytes)).ok()
}
