//! Contract tests for the Binder module.
//!
//! These tests verify the type-transform contracts:
//! - Unknown symbols and unbindable symbol types are rejected
//! - Set symbols only appear inside set functions
//! - Operand types are resolved, promoted or rejected per operator
//! - Sort fields are resolved against the symbol table

use filterql::binder::Binder;
use filterql::node::{BoolExpr, Comparison, Float64Expr, Int64Expr, StringExpr};
use filterql::types::{BinaryOp, NodeType};
use filterql::{bind, parse, parse_untyped, BindError, QueryError, Schema};

/// Creates a test schema covering every bindable type.
fn create_test_schema() -> Schema {
    Schema::new()
        .with_field("n", NodeType::Int64)
        .with_field("x", NodeType::Float64)
        .with_field("s", NodeType::String)
        .with_field("d", NodeType::Datetime)
        .with_field("flag", NodeType::Bool)
        .with_field("v", NodeType::AnyType)
        .with_field("blob", NodeType::Other)
        .with_set("ids", NodeType::Int64)
        .with_set("tags", NodeType::String)
}

fn bind_text(text: &str) -> Result<filterql::Query, QueryError> {
    parse(&create_test_schema(), text)
}

fn bind_error(text: &str) -> BindError {
    match bind_text(text) {
        Err(QueryError::Bind(err)) => err,
        other => panic!("expected bind error for {text:?}, got {other:?}"),
    }
}

fn unsupported(op: BinaryOp, types: &[NodeType]) -> BindError {
    BindError::unsupported(op, types)
}

#[test]
fn test_bind_unknown_symbol_rejected() {
    // Contract: a symbol the table does not know is an error
    assert_eq!(
        bind_error("nope = 1"),
        BindError::UnknownSymbol("nope".into())
    );
}

#[test]
fn test_bind_other_type_rejected() {
    // Contract: a symbol of type Other cannot be bound
    assert_eq!(
        bind_error("blob = 1"),
        BindError::UnknownSymbolType {
            symbol: "blob".into(),
            node_type: NodeType::Other,
        }
    );
}

#[test]
fn test_bind_set_as_scalar_rejected() {
    // Contract: a set symbol outside a set function is an error
    assert_eq!(bind_error("ids = 1"), BindError::SetSymbolAsScalar("ids".into()));
}

#[test]
fn test_bind_scalar_as_set_rejected() {
    // Contract: set functions require a set symbol
    assert_eq!(bind_error("anyOf(n) = 1"), BindError::ScalarSymbolAsSet("n".into()));
    assert_eq!(bind_error("count(n) = 1"), BindError::ScalarSymbolAsSet("n".into()));
    assert_eq!(bind_error("isEmpty(s)"), BindError::ScalarSymbolAsSet("s".into()));
}

#[test]
fn test_bind_quantifier_wraps_member_predicate() {
    // Contract: allOf/anyOf/noneOf apply the operation to each member
    let query = bind_text("anyOf(ids) = 7").unwrap();
    match query.predicate() {
        BoolExpr::AnyOf(q) => {
            assert_eq!(q.set, "ids");
            assert_eq!(
                *q.predicate,
                BoolExpr::Int64Compare(Comparison {
                    left: Int64Expr::Symbol("ids".into()),
                    op: BinaryOp::Eq,
                    right: Int64Expr::Const(7),
                })
            );
        }
        other => panic!("expected anyOf, got {other}"),
    }
    let query = bind_text("noneOf(tags) in (\"a\", \"b\")").unwrap();
    assert!(matches!(query.predicate(), BoolExpr::NoneOf(_)));
    let query = bind_text("allOf(ids) between 1 and 2.5").unwrap();
    assert_eq!(
        query.predicate().to_string(),
        "allOf(ids){float64(ids) between 1.0 and 2.5}"
    );
}

#[test]
fn test_bind_mixed_numbers_promote_to_float() {
    // Contract: int operands are promoted when mixed with floats
    let query = bind_text("n < 2.5").unwrap();
    assert_eq!(
        *query.predicate(),
        BoolExpr::Float64Compare(Comparison {
            left: Float64Expr::FromInt64(Int64Expr::Symbol("n".into())),
            op: BinaryOp::Lt,
            right: Float64Expr::Const(2.5),
        })
    );
    let query = bind_text("x >= 3").unwrap();
    assert_eq!(query.predicate().to_string(), "x >= 3.0");
}

#[test]
fn test_bind_string_number_comparison_rejected() {
    // Contract: strings and numbers do not compare
    assert_eq!(
        bind_error("s = 1"),
        unsupported(BinaryOp::Eq, &[NodeType::String, NodeType::Int64])
    );
    assert_eq!(
        bind_error("n > \"1\""),
        unsupported(BinaryOp::Gt, &[NodeType::Int64, NodeType::String])
    );
}

#[test]
fn test_bind_bool_only_supports_equality() {
    // Contract: bools support = and != only
    assert!(bind_text("flag = true").is_ok());
    assert!(bind_text("flag != false").is_ok());
    assert_eq!(
        bind_error("flag < true"),
        unsupported(BinaryOp::Lt, &[NodeType::Bool, NodeType::Bool])
    );
}

#[test]
fn test_bind_any_type_adopts_other_operand() {
    // Contract: an AnyType symbol takes the type of its counterpart
    let query = bind_text("v = 1").unwrap();
    assert!(matches!(query.predicate(), BoolExpr::Int64Compare(_)));
    let query = bind_text("v in (\"a\")").unwrap();
    assert!(matches!(query.predicate(), BoolExpr::InStringArray(_)));
    let query = bind_text("v between 1 and 2.5").unwrap();
    assert!(matches!(query.predicate(), BoolExpr::Float64Between(_)));
    let query = bind_text("v between datetime(2020-01-01T00:00:00Z) and datetime(2021-01-01T00:00:00Z)")
        .unwrap();
    assert!(matches!(query.predicate(), BoolExpr::DatetimeBetween(_)));
}

#[test]
fn test_bind_any_type_in_contains_reads_as_string() {
    // Contract: an AnyType symbol under contains is read as a string
    let query = bind_text("v contains \"y\"").unwrap();
    assert_eq!(
        *query.predicate(),
        BoolExpr::StringCompare(Comparison {
            left: StringExpr::Symbol("v".into()),
            op: BinaryOp::Contains,
            right: StringExpr::Const("y".into()),
        })
    );
    assert_eq!(
        bind_error("v < null"),
        unsupported(BinaryOp::Lt, &[NodeType::AnyType, NodeType::Other])
    );
}

#[test]
fn test_bind_contains_coerces_numbers() {
    // Contract: contains compares the decimal rendering of numbers
    let query = bind_text("n contains 12").unwrap();
    assert_eq!(
        *query.predicate(),
        BoolExpr::StringCompare(Comparison {
            left: StringExpr::FromInt64(Int64Expr::Symbol("n".into())),
            op: BinaryOp::Contains,
            right: StringExpr::Const("12".into()),
        })
    );
    let query = bind_text("s contains 1.0").unwrap();
    assert_eq!(query.predicate().to_string(), "s contains \"1\"");
    assert_eq!(
        bind_error("d contains \"2020\""),
        unsupported(BinaryOp::Contains, &[NodeType::Datetime, NodeType::String])
    );
}

#[test]
fn test_bind_in_array_coercions() {
    // Contract: a string symbol matches numbers by their rendering
    let query = bind_text("s in (1, 2)").unwrap();
    assert_eq!(query.predicate().to_string(), "s in (\"1\", \"2\")");
    // Contract: a numeric symbol never matches strings
    assert_eq!(
        bind_error("n in (\"a\")"),
        unsupported(BinaryOp::In, &[NodeType::Int64, NodeType::String])
    );
    let query = bind_text("x not in (1, 2)").unwrap();
    assert_eq!(query.predicate().to_string(), "x not in (1.0, 2.0)");
}

#[test]
fn test_bind_null_comparisons() {
    // Contract: = null and != null test for absence
    let query = bind_text("s = null").unwrap();
    assert_eq!(
        *query.predicate(),
        BoolExpr::IsNil {
            symbol: "s".into(),
            negated: false,
        }
    );
    assert_eq!(
        bind_error("n < null"),
        unsupported(BinaryOp::Lt, &[NodeType::Int64, NodeType::Other])
    );
    assert_eq!(
        bind_error("count(ids) = null"),
        BindError::NotASymbol { op: BinaryOp::Eq }
    );
}

#[test]
fn test_bind_sort_fields() {
    // Contract: sort fields must be known scalar symbols
    let query = bind_text("true sort by s desc, n").unwrap();
    let keys = query.sort_keys().unwrap();
    assert_eq!(keys[0].node_type, NodeType::String);
    assert!(!keys[0].ascending);
    assert_eq!(keys[1].node_type, NodeType::Int64);
    assert_eq!(bind_error("true sort by nope"), BindError::UnknownSymbol("nope".into()));
    assert_eq!(bind_error("true sort by ids"), BindError::SetSymbolAsScalar("ids".into()));
}

#[test]
fn test_bind_sub_query_uses_member_scope() {
    // Contract: the where clause sees the members of its set
    let query = bind_text("count(ids where ids > 3) > 0").unwrap();
    assert_eq!(query.predicate().to_string(), "count(ids where ids > 3) > 0");
    assert_eq!(
        bind_error("isEmpty(ids where n > 3)"),
        BindError::UnknownSymbol("n".into())
    );
}

#[test]
fn test_bind_is_pure() {
    // Contract: binding does not alter the parsed query and is repeatable
    let schema = create_test_schema();
    let parsed = parse_untyped("n = 1 or anyOf(tags) contains \"x\"").unwrap();
    let before = parsed.clone();
    let first = Binder::new(&schema).bind_query(&parsed).unwrap();
    let second = bind(&schema, &parsed).unwrap();
    assert_eq!(parsed, before);
    assert_eq!(first, second);
}

#[test]
fn test_bind_first_error_wins() {
    // Contract: the leftmost error is the one reported
    assert_eq!(
        bind_error("nope = 1 and s = 1"),
        BindError::UnknownSymbol("nope".into())
    );
    assert_eq!(
        bind_error("s = 1 and nope = 1"),
        unsupported(BinaryOp::Eq, &[NodeType::String, NodeType::Int64])
    );
}
