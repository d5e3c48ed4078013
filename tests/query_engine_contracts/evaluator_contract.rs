//! Contract tests for the evaluator.
//!
//! These tests verify the evaluation contracts:
//! - Nil operands make every comparison false
//! - Set quantifiers over empty and populated sets
//! - Equality quantifiers seek instead of scanning when the cursor allows it
//! - Collaborator errors propagate to the caller

use std::cell::Cell;

use chrono::{DateTime, FixedOffset};
use filterql::cursor::{SetCursor, SeekableSetCursor};
use filterql::types::{NodeType, Value};
use filterql::{parse, QueryError, Record, Result, Schema, Symbols};

/// Cursor that hides the seekable view of the cursor it wraps.
struct ScanOnly<'a>(Box<dyn SetCursor + 'a>);

impl SetCursor for ScanOnly<'_> {
    fn next(&mut self) {
        self.0.next();
    }

    fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    fn current(&self) -> Option<&[u8]> {
        self.0.current()
    }
}

/// Wraps a record, counting member reads and failing on one symbol.
struct Probe {
    record: Record,
    seekable: bool,
    fail_on: Option<&'static str>,
    members_read: Cell<usize>,
}

impl Probe {
    fn new(record: Record) -> Self {
        Probe {
            record,
            seekable: true,
            fail_on: None,
            members_read: Cell::new(0),
        }
    }

    fn scan_only(mut self) -> Self {
        self.seekable = false;
        self
    }

    fn failing_on(mut self, symbol: &'static str) -> Self {
        self.fail_on = Some(symbol);
        self
    }

    fn check(&self, symbol: &str) -> Result<()> {
        if self.fail_on == Some(symbol) {
            return Err(QueryError::Eval(format!("cannot read {symbol}")));
        }
        Ok(())
    }
}

impl Symbols for Probe {
    fn eval_bool(&self, symbol: &str) -> Result<Option<bool>> {
        self.check(symbol)?;
        self.record.eval_bool(symbol)
    }

    fn eval_int64(&self, symbol: &str) -> Result<Option<i64>> {
        self.check(symbol)?;
        self.record.eval_int64(symbol)
    }

    fn eval_float64(&self, symbol: &str) -> Result<Option<f64>> {
        self.check(symbol)?;
        self.record.eval_float64(symbol)
    }

    fn eval_string(&self, symbol: &str) -> Result<Option<String>> {
        self.check(symbol)?;
        self.record.eval_string(symbol)
    }

    fn eval_datetime(&self, symbol: &str) -> Result<Option<DateTime<FixedOffset>>> {
        self.check(symbol)?;
        self.record.eval_datetime(symbol)
    }

    fn is_nil(&self, symbol: &str) -> Result<bool> {
        self.check(symbol)?;
        self.record.is_nil(symbol)
    }

    fn open_set_cursor(&self, symbol: &str) -> Result<Box<dyn SetCursor + '_>> {
        self.check(symbol)?;
        let cursor = self.record.open_set_cursor(symbol)?;
        if self.seekable {
            Ok(cursor)
        } else {
            Ok(Box::new(ScanOnly(cursor)))
        }
    }

    fn member_symbols(&self, set: &str, key: &[u8]) -> Result<Box<dyn Symbols + '_>> {
        self.members_read.set(self.members_read.get() + 1);
        self.record.member_symbols(set, key)
    }

    fn seek_key(&self, set: &str, value: &Value) -> Option<Vec<u8>> {
        self.record.seek_key(set, value)
    }
}

fn schema() -> Schema {
    Schema::new()
        .with_field("n", NodeType::Int64)
        .with_field("m", NodeType::Int64)
        .with_field("x", NodeType::Float64)
        .with_field("s", NodeType::String)
        .with_field("d", NodeType::Datetime)
        .with_set("ids", NodeType::Int64)
        .with_set("empty", NodeType::Int64)
}

fn hundred_ids() -> Record {
    Record::new().with_set("ids", 0..100i64)
}

fn eval(text: &str, symbols: &dyn Symbols) -> Result<bool> {
    parse(&schema(), text)?.eval_bool(symbols)
}

#[test]
fn test_nil_operands_are_false() {
    // Contract: comparisons with an absent value are false, negated ones too
    let record = Record::new();
    for text in [
        "n = 1",
        "n != 1",
        "n < 1",
        "n in (1, 2)",
        "n not in (1, 2)",
        "n between 0 and 10",
        "n not between 0 and 10",
        "s contains \"a\"",
        "s not contains \"a\"",
        "d < datetime(2020-01-01T00:00:00Z)",
    ] {
        assert!(!eval(text, &record).unwrap(), "{text} should be false on nil");
    }
    assert!(eval("n = null", &record).unwrap());
    assert!(!eval("n != null", &record).unwrap());
}

#[test]
fn test_nan_matches_nothing() {
    // Contract: NaN is neither equal, unequal, inside nor outside a range
    let record = Record::new().with_value("x", f64::NAN);
    assert!(!eval("x = 1.0", &record).unwrap());
    assert!(!eval("x != 1.0", &record).unwrap());
    assert!(!eval("x between 0 and 1", &record).unwrap());
    assert!(!eval("x not between 0 and 1", &record).unwrap());
}

#[test]
fn test_empty_set_quantifiers() {
    // Contract: allOf is vacuously true, anyOf false, noneOf true
    let record = Record::new();
    assert!(eval("allOf(empty) = 1", &record).unwrap());
    assert!(!eval("anyOf(empty) = 1", &record).unwrap());
    assert!(eval("noneOf(empty) = 1", &record).unwrap());
    assert!(eval("count(empty) = 0", &record).unwrap());
    assert!(eval("isEmpty(empty)", &record).unwrap());
}

#[test]
fn test_any_of_seeks_equal_members() {
    // Contract: equality against constants reads only the sought members
    let probe = Probe::new(hundred_ids());
    assert!(eval("anyOf(ids) = 42", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 1);

    let probe = Probe::new(hundred_ids());
    assert!(eval("anyOf(ids) in (500, 7)", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 1);

    let probe = Probe::new(hundred_ids());
    assert!(!eval("anyOf(ids) = 1000", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 0);
}

#[test]
fn test_any_of_scans_without_seekable_cursor() {
    // Contract: the same answer is produced by a full scan
    let probe = Probe::new(hundred_ids()).scan_only();
    assert!(eval("anyOf(ids) = 42", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 43);
}

#[test]
fn test_none_of_uses_seek_and_negates() {
    // Contract: noneOf(x) p == not anyOf(x) p
    let probe = Probe::new(hundred_ids());
    assert!(!eval("noneOf(ids) = 42", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 1);
    let probe = Probe::new(hundred_ids());
    assert!(eval("noneOf(ids) in (100, 200)", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 0);
}

#[test]
fn test_non_equality_quantifier_scans() {
    let probe = Probe::new(hundred_ids());
    assert!(eval("anyOf(ids) > 97", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 99);
    let probe = Probe::new(hundred_ids());
    assert!(!eval("allOf(ids) < 50", &probe).unwrap());
    assert_eq!(probe.members_read.get(), 51);
}

#[test]
fn test_collaborator_errors_propagate() {
    // Contract: symbol errors reach the caller
    let probe = Probe::new(Record::new().with_value("n", 1i64).with_value("m", 2i64)).failing_on("m");
    assert!(matches!(
        eval("m = 2", &probe),
        Err(QueryError::Eval(_))
    ));
    let probe = Probe::new(hundred_ids()).failing_on("ids");
    assert!(matches!(
        eval("count(ids) > 0", &probe),
        Err(QueryError::Eval(_))
    ));
}

#[test]
fn test_and_or_short_circuit() {
    // Contract: the right operand is not evaluated once the result is known
    let probe = Probe::new(Record::new().with_value("n", 1i64)).failing_on("m");
    assert!(eval("n = 1 or m = 2", &probe).unwrap());
    assert!(!eval("n = 2 and m = 2", &probe).unwrap());
    assert!(eval("n = 2 or m = 2", &probe).is_err());
}

#[test]
fn test_contains_on_numbers() {
    // Contract: numbers are matched by their decimal rendering
    let record = Record::new().with_value("n", 123i64).with_value("x", 1.0);
    assert!(eval("n contains 12", &record).unwrap());
    assert!(eval("n contains \"23\"", &record).unwrap());
    assert!(!eval("n contains 4", &record).unwrap());
    assert!(eval("x contains \"1\"", &record).unwrap());
    assert!(!eval("x contains \".\"", &record).unwrap());
}

#[test]
fn test_record_coercions() {
    // Contract: integers stored under a float field still compare
    let record = Record::new().with_value("x", 2i64);
    assert!(eval("x > 1.5", &record).unwrap());
    // Contract: a value of the wrong kind is a collaborator error
    let record = Record::new().with_value("n", "not a number");
    assert!(matches!(eval("n = 1", &record), Err(QueryError::Eval(_))));
}

#[test]
fn test_datetime_offsets_compare_as_instants() {
    let record = Record::new().with_value(
        "d",
        DateTime::parse_from_rfc3339("2022-03-01T10:00:00+01:00").unwrap(),
    );
    assert!(eval("d = datetime(2022-03-01T09:00:00Z)", &record).unwrap());
    assert!(eval(
        "d in (datetime(2020-01-01T00:00:00Z), datetime(2022-03-01T09:00:00Z))",
        &record
    )
    .unwrap());
}

#[test]
fn test_seekable_cursor_contract_via_record() {
    // Contract: record cursors over scalar sets are seekable
    let record = hundred_ids();
    let mut cursor = record.open_set_cursor("ids").unwrap();
    let seekable: &mut dyn SeekableSetCursor = cursor.as_seekable().unwrap();
    let key = record.seek_key("ids", &Value::Int64(64)).unwrap();
    seekable.seek(&key);
    assert_eq!(seekable.current(), Some(key.as_slice()));
}

fn seek_and_scan(text: &str, schema: &Schema, record: &Record) -> (bool, bool) {
    let query = parse(schema, text).unwrap();
    let seek = query.eval_bool(&Probe::new(record.clone())).unwrap();
    let scan = query
        .eval_bool(&Probe::new(record.clone()).scan_only())
        .unwrap();
    (seek, scan)
}

#[test]
fn test_seek_matches_scan_for_signed_zero() {
    // Contract: -0.0 = 0.0, whichever path finds the member
    let schema = Schema::new().with_set("xs", NodeType::Float64);
    let record = Record::new().with_set("xs", [0.0f64, 2.0]);
    for text in [
        "anyOf(xs) = -0.0",
        "anyOf(xs) in (-0.0, 5.0)",
        "noneOf(xs) = -0.0",
    ] {
        let (seek, scan) = seek_and_scan(text, &schema, &record);
        assert_eq!(seek, scan, "{text}");
    }
    assert!(seek_and_scan("anyOf(xs) = -0.0", &schema, &record).0);

    let record = Record::new().with_set("xs", [-0.0f64]);
    assert_eq!(
        seek_and_scan("anyOf(xs) = 0.0", &schema, &record),
        (true, true)
    );
}

#[test]
fn test_sort_on_any_type_symbol() {
    // Contract: untyped sort fields order by their runtime values
    let schema = Schema::new().with_field("v", NodeType::AnyType);
    let records: Vec<Record> = [3i64, 1, 2]
        .into_iter()
        .map(|v| Record::new().with_value("v", v))
        .chain(std::iter::once(Record::new()))
        .collect();
    let query = parse(&schema, "true sort by v").unwrap();
    let sorted: Vec<Option<i64>> = query
        .filter_records(&records)
        .unwrap()
        .iter()
        .map(|r| r.eval_int64("v").unwrap())
        .collect();
    assert_eq!(sorted, vec![None, Some(1), Some(2), Some(3)]);

    let query = parse(&schema, "true sort by v desc").unwrap();
    let sorted = query.filter_records(&records).unwrap();
    assert_eq!(sorted[0].eval_int64("v").unwrap(), Some(3));
    assert!(sorted[3].is_nil("v").unwrap());
}

#[test]
fn test_any_type_sort_without_eval_value_override() {
    // Contract: collaborators relying on the default runtime read still sort
    let schema = Schema::new().with_field("v", NodeType::AnyType);
    let query = parse(&schema, "true sort by v").unwrap();
    let low = Probe::new(Record::new().with_value("v", "apple"));
    let high = Probe::new(Record::new().with_value("v", "pear"));
    assert_eq!(
        query.compare_records(&low, &high).unwrap(),
        std::cmp::Ordering::Less
    );
    let low = Probe::new(Record::new().with_value("v", 1.5));
    let high = Probe::new(Record::new().with_value("v", 2i64));
    assert_eq!(
        query.compare_records(&low, &high).unwrap(),
        std::cmp::Ordering::Less
    );
}

mod seek_scan_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_seek_and_scan_agree_on_int_sets(
            members in proptest::collection::vec(-20i64..20, 0..12),
            wanted in proptest::collection::vec(-25i64..25, 1..4),
        ) {
            let schema = Schema::new().with_set("ids", NodeType::Int64);
            let record = Record::new().with_set("ids", members.clone());
            let list = wanted.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            let expected = wanted.iter().any(|w| members.contains(w));

            let (seek, scan) = seek_and_scan(&format!("anyOf(ids) in ({list})"), &schema, &record);
            prop_assert_eq!(seek, expected);
            prop_assert_eq!(scan, expected);

            let (seek, scan) = seek_and_scan(&format!("noneOf(ids) = {}", wanted[0]), &schema, &record);
            prop_assert_eq!(seek, scan);
            prop_assert_eq!(seek, !members.contains(&wanted[0]));
        }

        #[test]
        fn test_seek_and_scan_agree_on_float_sets(
            members in proptest::collection::vec(prop_oneof![Just(0.0f64), Just(-0.0), Just(1.5), Just(-2.0)], 0..6),
            wanted in prop_oneof![Just("0.0"), Just("-0.0"), Just("1.5"), Just("-2.0"), Just("3.0")],
        ) {
            let schema = Schema::new().with_set("xs", NodeType::Float64);
            let record = Record::new().with_set("xs", members);
            let (seek, scan) = seek_and_scan(&format!("anyOf(xs) = {wanted}"), &schema, &record);
            prop_assert_eq!(seek, scan);
        }
    }
}
