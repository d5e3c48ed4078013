//! Type-transform pass: untyped parse tree to typed nodes.

use crate::error::{BindError, QueryError, Result};
use crate::node::{Between, BoolExpr, Comparison, DatetimeExpr, Float64Expr, InArray, Int64Expr, StringExpr};
use crate::parser::{ArrayLiteral, Expr, ParsedQuery, SortField};
use crate::query::{Query, SortKey};
use crate::symbols::SymbolTypes;
use crate::types::{BinaryOp, NodeType, SetFunction};

use super::validator::SymbolValidator;

/// A bound operand whose final type may still depend on its neighbour.
#[derive(Debug)]
enum Operand {
    Bool(BoolExpr),
    Int64(Int64Expr),
    Float64(Float64Expr),
    String(StringExpr),
    Datetime(DatetimeExpr),
    /// Symbol of type `AnyType`; takes the type of the other operand.
    Any(String),
    Null,
}

impl Operand {
    fn node_type(&self) -> NodeType {
        match self {
            Operand::Bool(_) => NodeType::Bool,
            Operand::Int64(_) => NodeType::Int64,
            Operand::Float64(_) => NodeType::Float64,
            Operand::String(_) => NodeType::String,
            Operand::Datetime(_) => NodeType::Datetime,
            Operand::Any(_) => NodeType::AnyType,
            Operand::Null => NodeType::Other,
        }
    }

    fn symbol(&self) -> Option<&str> {
        match self {
            Operand::Bool(BoolExpr::Symbol(name))
            | Operand::Int64(Int64Expr::Symbol(name))
            | Operand::Float64(Float64Expr::Symbol(name))
            | Operand::String(StringExpr::Symbol(name))
            | Operand::Datetime(DatetimeExpr::Symbol(name))
            | Operand::Any(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Gives an `AnyType` symbol the concrete type `node_type`.
    fn adopt(self, node_type: NodeType) -> Operand {
        let Operand::Any(name) = self else {
            return self;
        };
        match node_type {
            NodeType::Bool => Operand::Bool(BoolExpr::Symbol(name)),
            NodeType::Int64 => Operand::Int64(Int64Expr::Symbol(name)),
            NodeType::Float64 => Operand::Float64(Float64Expr::Symbol(name)),
            NodeType::String => Operand::String(StringExpr::Symbol(name)),
            NodeType::Datetime => Operand::Datetime(DatetimeExpr::Symbol(name)),
            NodeType::AnyType | NodeType::Other => Operand::Any(name),
        }
    }

    /// Coerces to a string operand for `contains` and string arrays.
    fn into_string(self) -> Option<StringExpr> {
        match self {
            Operand::String(s) => Some(s),
            Operand::Int64(Int64Expr::Const(v)) => Some(StringExpr::Const(v.to_string())),
            Operand::Int64(i) => Some(StringExpr::FromInt64(i)),
            Operand::Float64(Float64Expr::Const(v)) => Some(StringExpr::Const(v.to_string())),
            Operand::Float64(f) => Some(StringExpr::FromFloat64(f)),
            Operand::Any(name) => Some(StringExpr::Symbol(name)),
            Operand::Bool(_) | Operand::Datetime(_) | Operand::Null => None,
        }
    }
}

/// Quantifier peeled off the left operand, re-applied to the bound result.
type Quantifier = Option<(SetFunction, String)>;

/// Binds untyped queries against a symbol table.
pub struct Binder<'a> {
    types: &'a dyn SymbolTypes,
}

impl<'a> Binder<'a> {
    /// Creates a new binder over the given symbol table.
    #[must_use]
    pub fn new(types: &'a dyn SymbolTypes) -> Self {
        Binder { types }
    }

    /// Binds a parsed query, then validates symbol usage.
    ///
    /// The first error in left-to-right order aborts the bind.
    ///
    /// # Errors
    ///
    /// Returns a `Bind` error for unknown symbols, misused set symbols and
    /// unsupported operand types.
    pub fn bind_query(&self, parsed: &ParsedQuery) -> Result<Query> {
        let query = self.transform_query(parsed)?;
        SymbolValidator::new(self.types).validate(&query)?;
        Ok(query)
    }

    fn transform_query(&self, parsed: &ParsedQuery) -> Result<Query> {
        let predicate = self.bind_bool(&parsed.predicate)?;
        let sort_by = parsed
            .sort_by
            .as_ref()
            .map(|fields| {
                fields
                    .iter()
                    .map(|f| self.bind_sort_field(f))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        Ok(Query::new(predicate, sort_by, parsed.skip, parsed.limit))
    }

    fn bind_sort_field(&self, field: &SortField) -> Result<SortKey> {
        match self.types.is_set(&field.symbol) {
            None => return Err(BindError::UnknownSymbol(field.symbol.clone()).into()),
            Some(true) => return Err(BindError::SetSymbolAsScalar(field.symbol.clone()).into()),
            Some(false) => {}
        }
        let node_type = self.symbol_type(&field.symbol)?;
        Ok(SortKey {
            symbol: field.symbol.clone(),
            ascending: field.ascending,
            node_type,
        })
    }

    fn symbol_type(&self, symbol: &str) -> Result<NodeType> {
        match self.types.symbol_type(symbol) {
            None => Err(BindError::UnknownSymbol(symbol.to_string()).into()),
            Some(NodeType::Other) => Err(BindError::UnknownSymbolType {
                symbol: symbol.to_string(),
                node_type: NodeType::Other,
            }
            .into()),
            Some(node_type) => Ok(node_type),
        }
    }

    fn bind_symbol(&self, symbol: &str) -> Result<Operand> {
        let name = symbol.to_string();
        Ok(match self.symbol_type(symbol)? {
            NodeType::Bool => Operand::Bool(BoolExpr::Symbol(name)),
            NodeType::Int64 => Operand::Int64(Int64Expr::Symbol(name)),
            NodeType::Float64 => Operand::Float64(Float64Expr::Symbol(name)),
            NodeType::String => Operand::String(StringExpr::Symbol(name)),
            NodeType::Datetime => Operand::Datetime(DatetimeExpr::Symbol(name)),
            NodeType::AnyType | NodeType::Other => Operand::Any(name),
        })
    }

    fn bind_bool(&self, expr: &Expr) -> Result<BoolExpr> {
        match expr {
            Expr::Bool(b) => Ok(BoolExpr::Const(*b)),
            Expr::And(l, r) => Ok(BoolExpr::and(self.bind_bool(l)?, self.bind_bool(r)?)),
            Expr::Or(l, r) => Ok(BoolExpr::or(self.bind_bool(l)?, self.bind_bool(r)?)),
            Expr::Not(inner) => Ok(BoolExpr::Not(Box::new(self.bind_bool(inner)?))),
            Expr::Binary { left, op, right } => self.bind_binary(left, *op, right),
            Expr::InArray { left, op, array } => self.bind_in_array(left, *op, array),
            Expr::Between {
                left,
                op,
                lower,
                upper,
            } => self.bind_between(left, *op, lower, upper),
            Expr::Symbol(_) | Expr::SetFunction { .. } => match self.bind_operand(expr)? {
                Operand::Bool(b) => Ok(b),
                Operand::Any(name) => Ok(BoolExpr::Symbol(name)),
                other => Err(QueryError::Internal(format!(
                    "{} operand used as a predicate",
                    other.node_type()
                ))),
            },
            other => Err(QueryError::Internal(format!(
                "{} used as a predicate",
                other.kind()
            ))),
        }
    }

    fn bind_operand(&self, expr: &Expr) -> Result<Operand> {
        match expr {
            Expr::Bool(b) => Ok(Operand::Bool(BoolExpr::Const(*b))),
            Expr::Int64(v) => Ok(Operand::Int64(Int64Expr::Const(*v))),
            Expr::Float64(v) => Ok(Operand::Float64(Float64Expr::Const(*v))),
            Expr::String(s) => Ok(Operand::String(StringExpr::Const(s.clone()))),
            Expr::Datetime(d) => Ok(Operand::Datetime(DatetimeExpr::Const(*d))),
            Expr::Null => Ok(Operand::Null),
            Expr::Symbol(name) => self.bind_symbol(name),
            Expr::SetFunction {
                func: SetFunction::Count,
                symbol,
                filter,
            } => Ok(Operand::Int64(Int64Expr::Count {
                set: symbol.clone(),
                filter: self.bind_filter(symbol, filter.as_deref())?,
            })),
            Expr::SetFunction {
                func: SetFunction::IsEmpty,
                symbol,
                filter,
            } => Ok(Operand::Bool(BoolExpr::IsEmpty {
                set: symbol.clone(),
                filter: self.bind_filter(symbol, filter.as_deref())?,
            })),
            Expr::SetFunction { func, .. } => Err(QueryError::Internal(format!(
                "{func} is only valid on the left of an operation"
            ))),
            Expr::Array(_) => Err(QueryError::Internal(
                "array is only valid on the right of in".into(),
            )),
            Expr::Binary { .. }
            | Expr::InArray { .. }
            | Expr::Between { .. }
            | Expr::And(..)
            | Expr::Or(..)
            | Expr::Not(_) => Ok(Operand::Bool(self.bind_bool(expr)?)),
        }
    }

    /// Binds the `where` clause of `count`/`isEmpty` against the member scope of `set`.
    fn bind_filter(&self, set: &str, filter: Option<&Expr>) -> Result<Option<Box<Query>>> {
        let Some(filter) = filter else {
            return Ok(None);
        };
        let scope = self.set_scope(set)?;
        let query = Binder::new(scope).transform_query(&ParsedQuery::new(filter.clone()))?;
        Ok(Some(Box::new(query)))
    }

    fn set_scope(&self, set: &str) -> Result<&'a dyn SymbolTypes> {
        match self.types.is_set(set) {
            None => Err(BindError::UnknownSymbol(set.to_string()).into()),
            Some(false) => Err(BindError::ScalarSymbolAsSet(set.to_string()).into()),
            Some(true) => self
                .types
                .set_symbol_types(set)
                .ok_or_else(|| BindError::ScalarSymbolAsSet(set.to_string()).into()),
        }
    }

    /// Binds the left operand, peeling off an `allOf`/`anyOf`/`noneOf`
    /// wrapper so the operation applies to each member.
    fn bind_lhs(&self, left: &Expr) -> Result<(Quantifier, Operand)> {
        match left {
            Expr::SetFunction { func, symbol, .. } if func.is_quantifier() => {
                let operand = self.bind_symbol(symbol)?;
                Ok((Some((*func, symbol.clone())), operand))
            }
            other => Ok((None, self.bind_operand(other)?)),
        }
    }

    fn bind_binary(&self, left: &Expr, op: BinaryOp, right: &Expr) -> Result<BoolExpr> {
        let (quantifier, left) = self.bind_lhs(left)?;
        let right = self.bind_operand(right)?;
        let inner = binary_node(left, op, right)?;
        requantify(quantifier, inner)
    }

    fn bind_in_array(&self, left: &Expr, op: BinaryOp, array: &ArrayLiteral) -> Result<BoolExpr> {
        let (quantifier, left) = self.bind_lhs(left)?;
        let inner = in_array_node(left, op, array)?;
        requantify(quantifier, inner)
    }

    fn bind_between(
        &self,
        left: &Expr,
        op: BinaryOp,
        lower: &Expr,
        upper: &Expr,
    ) -> Result<BoolExpr> {
        let (quantifier, left) = self.bind_lhs(left)?;
        let lower = self.bind_operand(lower)?;
        let upper = self.bind_operand(upper)?;
        let inner = between_node(left, op, lower, upper)?;
        requantify(quantifier, inner)
    }
}

fn requantify(quantifier: Quantifier, inner: BoolExpr) -> Result<BoolExpr> {
    match quantifier {
        Some((func, set)) => BoolExpr::quantify(func, set, inner)
            .ok_or_else(|| QueryError::Internal(format!("{func} is not a quantifier"))),
        None => Ok(inner),
    }
}

fn binary_node(left: Operand, op: BinaryOp, right: Operand) -> Result<BoolExpr> {
    if matches!(right, Operand::Null) {
        if !matches!(op, BinaryOp::Eq | BinaryOp::Neq) {
            return Err(BindError::unsupported(op, &[left.node_type(), NodeType::Other]).into());
        }
        let Some(symbol) = left.symbol() else {
            return Err(BindError::NotASymbol { op }.into());
        };
        return Ok(BoolExpr::IsNil {
            symbol: symbol.to_string(),
            negated: op == BinaryOp::Neq,
        });
    }

    let types = [left.node_type(), right.node_type()];
    let unsupported = || QueryError::from(BindError::unsupported(op, &types));

    if matches!(op, BinaryOp::Contains | BinaryOp::NotContains) {
        let left = left.into_string().ok_or_else(unsupported)?;
        let right = right.into_string().ok_or_else(unsupported)?;
        return Ok(BoolExpr::StringCompare(Comparison { left, op, right }));
    }
    if !op.is_comparison() {
        return Err(unsupported());
    }

    let (left, right) = match (left, right) {
        (Operand::Any(_), Operand::Any(_)) => return Err(unsupported()),
        (left @ Operand::Any(_), right) => (left.adopt(types[1]), right),
        (left, right @ Operand::Any(_)) => (left, right.adopt(types[0])),
        pair => pair,
    };

    let node = match (left, right) {
        (Operand::Bool(left), Operand::Bool(right)) if matches!(op, BinaryOp::Eq | BinaryOp::Neq) => {
            BoolExpr::BoolCompare(Box::new(Comparison { left, op, right }))
        }
        (Operand::Int64(left), Operand::Int64(right)) => {
            BoolExpr::Int64Compare(Comparison { left, op, right })
        }
        (Operand::Int64(left), Operand::Float64(right)) => BoolExpr::Float64Compare(Comparison {
            left: left.to_float64(),
            op,
            right,
        }),
        (Operand::Float64(left), Operand::Int64(right)) => BoolExpr::Float64Compare(Comparison {
            left,
            op,
            right: right.to_float64(),
        }),
        (Operand::Float64(left), Operand::Float64(right)) => {
            BoolExpr::Float64Compare(Comparison { left, op, right })
        }
        (Operand::String(left), Operand::String(right)) => {
            BoolExpr::StringCompare(Comparison { left, op, right })
        }
        (Operand::Datetime(left), Operand::Datetime(right)) => {
            BoolExpr::DatetimeCompare(Comparison { left, op, right })
        }
        _ => return Err(unsupported()),
    };
    Ok(node)
}

fn array_type(array: &ArrayLiteral) -> NodeType {
    match array {
        ArrayLiteral::String(_) => NodeType::String,
        ArrayLiteral::Int64(_) => NodeType::Int64,
        ArrayLiteral::Float64(_) => NodeType::Float64,
        ArrayLiteral::Datetime(_) => NodeType::Datetime,
    }
}

#[allow(clippy::cast_precision_loss)]
fn in_array_node(left: Operand, op: BinaryOp, array: &ArrayLiteral) -> Result<BoolExpr> {
    let element_type = array_type(array);
    let left_type = left.node_type();
    let unsupported = || QueryError::from(BindError::unsupported(op, &[left_type, element_type]));
    if !matches!(op, BinaryOp::In | BinaryOp::NotIn) {
        return Err(unsupported());
    }
    let negated = op.is_negated();

    let node = match (left.adopt(element_type), array) {
        (Operand::Int64(left), ArrayLiteral::Int64(values)) => BoolExpr::InInt64Array(InArray {
            left,
            negated,
            elements: values.iter().map(|v| Int64Expr::Const(*v)).collect(),
        }),
        (Operand::Int64(left), ArrayLiteral::Float64(values)) => {
            BoolExpr::InFloat64Array(InArray {
                left: left.to_float64(),
                negated,
                elements: values.iter().map(|v| Float64Expr::Const(*v)).collect(),
            })
        }
        (Operand::Float64(left), ArrayLiteral::Int64(values)) => {
            BoolExpr::InFloat64Array(InArray {
                left,
                negated,
                elements: values.iter().map(|v| Float64Expr::Const(*v as f64)).collect(),
            })
        }
        (Operand::Float64(left), ArrayLiteral::Float64(values)) => {
            BoolExpr::InFloat64Array(InArray {
                left,
                negated,
                elements: values.iter().map(|v| Float64Expr::Const(*v)).collect(),
            })
        }
        (Operand::String(left), ArrayLiteral::String(values)) => BoolExpr::InStringArray(InArray {
            left,
            negated,
            elements: values.iter().map(|s| StringExpr::Const(s.clone())).collect(),
        }),
        (Operand::String(left), ArrayLiteral::Int64(values)) => BoolExpr::InStringArray(InArray {
            left,
            negated,
            elements: values
                .iter()
                .map(|v| StringExpr::Const(v.to_string()))
                .collect(),
        }),
        (Operand::String(left), ArrayLiteral::Float64(values)) => {
            BoolExpr::InStringArray(InArray {
                left,
                negated,
                elements: values
                    .iter()
                    .map(|v| StringExpr::Const(v.to_string()))
                    .collect(),
            })
        }
        (Operand::Datetime(left), ArrayLiteral::Datetime(values)) => {
            BoolExpr::InDatetimeArray(InArray {
                left,
                negated,
                elements: values.iter().map(|d| DatetimeExpr::Const(*d)).collect(),
            })
        }
        _ => return Err(unsupported()),
    };
    Ok(node)
}

fn between_node(left: Operand, op: BinaryOp, lower: Operand, upper: Operand) -> Result<BoolExpr> {
    let types = [left.node_type(), lower.node_type(), upper.node_type()];
    let unsupported = || QueryError::from(BindError::unsupported(op, &types));
    if !matches!(op, BinaryOp::Between | BinaryOp::NotBetween) {
        return Err(unsupported());
    }
    let negated = op.is_negated();
    let left = match left {
        Operand::Any(_) if types[1] == types[2] => left.adopt(types[1]),
        Operand::Any(_) if types[1].is_numeric() && types[2].is_numeric() => {
            left.adopt(NodeType::Float64)
        }
        other => other,
    };

    let node = match (left, lower, upper) {
        (Operand::Datetime(left), Operand::Datetime(lower), Operand::Datetime(upper)) => {
            BoolExpr::DatetimeBetween(Between {
                left,
                lower,
                upper,
                negated,
            })
        }
        (Operand::Int64(left), Operand::Int64(lower), Operand::Int64(upper)) => {
            BoolExpr::Int64Between(Between {
                left,
                lower,
                upper,
                negated,
            })
        }
        (left, lower, upper) => {
            let (Some(left), Some(lower), Some(upper)) =
                (to_float64(left), to_float64(lower), to_float64(upper))
            else {
                return Err(unsupported());
            };
            BoolExpr::Float64Between(Between {
                left,
                lower,
                upper,
                negated,
            })
        }
    };
    Ok(node)
}

fn to_float64(operand: Operand) -> Option<Float64Expr> {
    match operand {
        Operand::Int64(i) => Some(i.to_float64()),
        Operand::Float64(f) => Some(f),
        _ => None,
    }
}

/// Binds `parsed` against `types`.
///
/// # Errors
///
/// See [`Binder::bind_query`].
pub fn bind(types: &dyn SymbolTypes, parsed: &ParsedQuery) -> Result<Query> {
    Binder::new(types).bind_query(parsed)
}
