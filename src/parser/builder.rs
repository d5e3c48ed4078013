//! Stack machine that assembles a [`ParsedQuery`] from listener events.
//!
//! Terminals push literals, symbols and operator markers; `exit` events pop
//! their operands in reverse order and push the combined node. Array
//! literals and sort lists collect their operands in a nested group. The
//! first error wins: after it is recorded every later push and pop is a
//! no-op and [`QueryBuilder::finish`] reports it.

use super::ast::{ArrayLiteral, Expr, ParsedQuery, SortField};
use super::listener::{Production, QueryListener, Token};
use super::literal::{parse_datetime, parse_float64, parse_int64, unescape_string};
use crate::error::{QueryError, Result};
use crate::types::{BinaryOp, SetFunction};

#[derive(Debug)]
enum StackItem {
    Expr(Expr),
    Op(BinaryOp),
    SetFunc(SetFunction),
    Direction(bool),
    LimitNone,
    SortField(SortField),
    SortBy(Vec<SortField>),
    Skip(i64),
    Limit(i64),
    Query(ParsedQuery),
}

impl StackItem {
    fn describe(&self) -> &'static str {
        match self {
            StackItem::Expr(e) => e.kind(),
            StackItem::Op(_) => "operator",
            StackItem::SetFunc(_) => "set function",
            StackItem::Direction(_) => "sort direction",
            StackItem::LimitNone => "none",
            StackItem::SortField(_) => "sort field",
            StackItem::SortBy(_) => "sort clause",
            StackItem::Skip(_) => "skip clause",
            StackItem::Limit(_) => "limit clause",
            StackItem::Query(_) => "query",
        }
    }
}

/// Builds an untyped query from front-end events.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    stack: Vec<StackItem>,
    groups: Vec<Vec<StackItem>>,
    first_error: Option<QueryError>,
}

impl QueryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether an error has been recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.first_error.is_some()
    }

    /// Records `err` unless an earlier error is already recorded.
    pub fn set_error(&mut self, err: QueryError) {
        if self.first_error.is_none() {
            log::debug!("query builder error: {err}");
            self.first_error = Some(err);
        }
    }

    /// Returns the finished query.
    ///
    /// # Errors
    ///
    /// Returns the first recorded error, or `Internal` if the stack does not
    /// hold exactly one query.
    pub fn finish(mut self) -> Result<ParsedQuery> {
        if let Some(err) = self.first_error.take() {
            return Err(err);
        }
        if !self.groups.is_empty() {
            return Err(QueryError::Internal("unclosed array or sort group".into()));
        }
        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(StackItem::Query(query)), true) => Ok(query),
            (Some(StackItem::Query(_)), false) => Err(QueryError::Internal(format!(
                "{} unconsumed items left on the stack",
                self.stack.len()
            ))),
            (Some(other), _) => Err(QueryError::Internal(format!(
                "expected query on the stack, found {}",
                other.describe()
            ))),
            (None, _) => Err(QueryError::Internal("empty builder stack".into())),
        }
    }

    fn push(&mut self, item: StackItem) {
        if self.first_error.is_none() {
            self.stack.push(item);
        }
    }

    fn pop(&mut self, wanted: &str) -> Option<StackItem> {
        if self.first_error.is_some() {
            return None;
        }
        let item = self.stack.pop();
        if item.is_none() {
            self.set_error(QueryError::Internal(format!(
                "stack underflow while popping {wanted}"
            )));
        }
        item
    }

    fn mismatch(&mut self, wanted: &str, found: &StackItem) {
        self.set_error(QueryError::Internal(format!(
            "expected {wanted} on the stack, found {}",
            found.describe()
        )));
    }

    fn pop_expr(&mut self) -> Option<Expr> {
        match self.pop("expression")? {
            StackItem::Expr(expr) => Some(expr),
            other => {
                self.mismatch("expression", &other);
                None
            }
        }
    }

    fn pop_symbol(&mut self) -> Option<String> {
        match self.pop("symbol")? {
            StackItem::Expr(Expr::Symbol(name)) => Some(name),
            other => {
                self.mismatch("symbol", &other);
                None
            }
        }
    }

    fn pop_op(&mut self) -> Option<BinaryOp> {
        match self.pop("operator")? {
            StackItem::Op(op) => Some(op),
            other => {
                self.mismatch("operator", &other);
                None
            }
        }
    }

    fn pop_set_function(&mut self) -> Option<SetFunction> {
        match self.pop("set function")? {
            StackItem::SetFunc(func) => Some(func),
            other => {
                self.mismatch("set function", &other);
                None
            }
        }
    }

    fn pop_if(&mut self, pred: impl Fn(&StackItem) -> bool) -> Option<StackItem> {
        if self.first_error.is_some() {
            return None;
        }
        if self.stack.last().is_some_and(pred) {
            self.stack.pop()
        } else {
            None
        }
    }

    fn open_group(&mut self) {
        if self.first_error.is_none() {
            let outer = std::mem::take(&mut self.stack);
            self.groups.push(outer);
        }
    }

    fn close_group(&mut self) -> Option<Vec<StackItem>> {
        if self.first_error.is_some() {
            return None;
        }
        match self.groups.pop() {
            Some(outer) => Some(std::mem::replace(&mut self.stack, outer)),
            None => {
                self.set_error(QueryError::Internal("group closed without opening".into()));
                None
            }
        }
    }

    fn push_literal(&mut self, parsed: Result<Expr>) {
        match parsed {
            Ok(expr) => self.push(StackItem::Expr(expr)),
            Err(err) => self.set_error(err),
        }
    }

    fn build_binary(&mut self) {
        let Some(right) = self.pop_expr() else { return };
        let Some(op) = self.pop_op() else { return };
        let Some(left) = self.pop_expr() else { return };
        self.push(StackItem::Expr(Expr::binary(left, op, right)));
    }

    fn build_in_array(&mut self) {
        let array = match self.pop_expr() {
            Some(Expr::Array(array)) => array,
            Some(other) => {
                self.set_error(QueryError::Internal(format!(
                    "expected array after in, found {}",
                    other.kind()
                )));
                return;
            }
            None => return,
        };
        let Some(op) = self.pop_op() else { return };
        let Some(left) = self.pop_expr() else { return };
        self.push(StackItem::Expr(Expr::InArray {
            left: Box::new(left),
            op,
            array,
        }));
    }

    fn build_between(&mut self) {
        let Some(upper) = self.pop_expr() else { return };
        let Some(lower) = self.pop_expr() else { return };
        let Some(op) = self.pop_op() else { return };
        let Some(left) = self.pop_expr() else { return };
        self.push(StackItem::Expr(Expr::Between {
            left: Box::new(left),
            op,
            lower: Box::new(lower),
            upper: Box::new(upper),
        }));
    }

    fn build_set_function(&mut self, filtered: bool) {
        let filter = if filtered {
            let Some(filter) = self.pop_expr() else { return };
            Some(Box::new(filter))
        } else {
            None
        };
        let Some(symbol) = self.pop_symbol() else { return };
        let Some(func) = self.pop_set_function() else { return };
        self.push(StackItem::Expr(Expr::SetFunction {
            func,
            symbol,
            filter,
        }));
    }

    fn build_array(&mut self, production: Production) {
        let Some(items) = self.close_group() else { return };
        let mut exprs = Vec::with_capacity(items.len());
        for item in items {
            match item {
                StackItem::Expr(expr) => exprs.push(expr),
                other => {
                    self.mismatch("array element", &other);
                    return;
                }
            }
        }
        let array = match production {
            Production::StringArray => collect_array(exprs, |e| match e {
                Expr::String(s) => Some(s),
                _ => None,
            })
            .map(ArrayLiteral::String),
            Production::DatetimeArray => collect_array(exprs, |e| match e {
                Expr::Datetime(d) => Some(d),
                _ => None,
            })
            .map(ArrayLiteral::Datetime),
            _ => number_array(exprs),
        };
        match array {
            Some(array) => self.push(StackItem::Expr(Expr::Array(array))),
            None => self.set_error(QueryError::Internal(format!(
                "mixed element kinds in {production}"
            ))),
        }
    }

    fn build_binary_bool(&mut self, production: Production) {
        let Some(right) = self.pop_expr() else { return };
        let Some(left) = self.pop_expr() else { return };
        let expr = if production == Production::And {
            Expr::And(Box::new(left), Box::new(right))
        } else {
            Expr::Or(Box::new(left), Box::new(right))
        };
        self.push(StackItem::Expr(expr));
    }

    fn build_not(&mut self) {
        let Some(inner) = self.pop_expr() else { return };
        self.push(StackItem::Expr(Expr::Not(Box::new(inner))));
    }

    fn build_sort_field(&mut self) {
        let ascending = match self.pop_if(|item| matches!(item, StackItem::Direction(_))) {
            Some(StackItem::Direction(ascending)) => ascending,
            _ => true,
        };
        let Some(symbol) = self.pop_symbol() else { return };
        self.push(StackItem::SortField(SortField { symbol, ascending }));
    }

    fn build_sort_by(&mut self) {
        let Some(items) = self.close_group() else { return };
        let mut fields = Vec::with_capacity(items.len());
        for item in items {
            match item {
                StackItem::SortField(field) => fields.push(field),
                other => {
                    self.mismatch("sort field", &other);
                    return;
                }
            }
        }
        self.push(StackItem::SortBy(fields));
    }

    fn build_skip(&mut self) {
        match self.pop_expr() {
            Some(Expr::Int64(n)) => self.push(StackItem::Skip(n)),
            Some(other) => self.set_error(QueryError::Internal(format!(
                "skip expects an integer, found {}",
                other.kind()
            ))),
            None => {}
        }
    }

    fn build_limit(&mut self) {
        match self.pop("limit amount") {
            Some(StackItem::LimitNone) => self.push(StackItem::Limit(-1)),
            Some(StackItem::Expr(Expr::Int64(n))) => self.push(StackItem::Limit(n)),
            Some(other) => self.mismatch("limit amount", &other),
            None => {}
        }
    }

    fn build_query(&mut self) {
        let limit = match self.pop_if(|item| matches!(item, StackItem::Limit(_))) {
            Some(StackItem::Limit(n)) => Some(n),
            _ => None,
        };
        let skip = match self.pop_if(|item| matches!(item, StackItem::Skip(_))) {
            Some(StackItem::Skip(n)) => Some(n),
            _ => None,
        };
        let sort_by = match self.pop_if(|item| matches!(item, StackItem::SortBy(_))) {
            Some(StackItem::SortBy(fields)) => Some(fields),
            _ => None,
        };
        let Some(predicate) = self.pop_expr() else { return };
        self.push(StackItem::Query(ParsedQuery {
            predicate,
            sort_by,
            skip,
            limit,
        }));
    }
}

fn collect_array<T>(exprs: Vec<Expr>, extract: impl Fn(Expr) -> Option<T>) -> Option<Vec<T>> {
    exprs.into_iter().map(extract).collect()
}

/// All-integer arrays stay integer; any float promotes every element.
#[allow(clippy::cast_precision_loss)]
fn number_array(exprs: Vec<Expr>) -> Option<ArrayLiteral> {
    if exprs.iter().all(|e| matches!(e, Expr::Int64(_))) {
        return collect_array(exprs, |e| match e {
            Expr::Int64(n) => Some(n),
            _ => None,
        })
        .map(ArrayLiteral::Int64);
    }
    collect_array(exprs, |e| match e {
        Expr::Int64(n) => Some(n as f64),
        Expr::Float64(x) => Some(x),
        _ => None,
    })
    .map(ArrayLiteral::Float64)
}

impl QueryListener for QueryBuilder {
    fn enter(&mut self, production: Production) {
        if production.is_group() {
            self.open_group();
        }
    }

    fn exit(&mut self, production: Production) {
        match production {
            Production::Query => self.build_query(),
            Production::BinaryExpr => self.build_binary(),
            Production::InArrayExpr => self.build_in_array(),
            Production::BetweenExpr => self.build_between(),
            Production::SetFunction => self.build_set_function(false),
            Production::FilteredSetFunction => self.build_set_function(true),
            Production::StringArray | Production::NumberArray | Production::DatetimeArray => {
                self.build_array(production);
            }
            Production::And | Production::Or => self.build_binary_bool(production),
            Production::Not => self.build_not(),
            Production::SortBy => self.build_sort_by(),
            Production::SortField => self.build_sort_field(),
            Production::Skip => self.build_skip(),
            Production::Limit => self.build_limit(),
        }
    }

    fn terminal(&mut self, token: Token, text: &str) {
        match token {
            Token::Identifier => self.push(StackItem::Expr(Expr::Symbol(text.to_string()))),
            Token::Integer => self.push_literal(parse_int64(text).map(Expr::Int64)),
            Token::Float => self.push_literal(parse_float64(text).map(Expr::Float64)),
            Token::String => self.push_literal(unescape_string(text).map(Expr::String)),
            Token::Datetime => self.push_literal(parse_datetime(text).map(Expr::Datetime)),
            Token::Bool => self.push(StackItem::Expr(Expr::Bool(
                text.eq_ignore_ascii_case("true"),
            ))),
            Token::Null => self.push(StackItem::Expr(Expr::Null)),
            Token::Comparison => match BinaryOp::parse_comparison(text) {
                Some(op) => self.push(StackItem::Op(op)),
                None => self.set_error(QueryError::Internal(format!(
                    "unknown comparison operator {text}"
                ))),
            },
            Token::In => self.push(StackItem::Op(BinaryOp::In)),
            Token::NotIn => self.push(StackItem::Op(BinaryOp::NotIn)),
            Token::Between => self.push(StackItem::Op(BinaryOp::Between)),
            Token::NotBetween => self.push(StackItem::Op(BinaryOp::NotBetween)),
            Token::Contains => self.push(StackItem::Op(BinaryOp::Contains)),
            Token::NotContains => self.push(StackItem::Op(BinaryOp::NotContains)),
            Token::AllOf => self.push(StackItem::SetFunc(SetFunction::AllOf)),
            Token::AnyOf => self.push(StackItem::SetFunc(SetFunction::AnyOf)),
            Token::NoneOf => self.push(StackItem::SetFunc(SetFunction::NoneOf)),
            Token::Count => self.push(StackItem::SetFunc(SetFunction::Count)),
            Token::IsEmpty => self.push(StackItem::SetFunc(SetFunction::IsEmpty)),
            Token::Asc => self.push(StackItem::Direction(true)),
            Token::Desc => self.push(StackItem::Direction(false)),
            Token::LimitNone => self.push(StackItem::LimitNone),
        }
    }
}
