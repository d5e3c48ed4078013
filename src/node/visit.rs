//! Traversal of typed trees.

use std::fmt::Write as _;

use super::{BoolExpr, DatetimeExpr, Float64Expr, Int64Expr, StringExpr};
use crate::error::Result;
use crate::query::Query;
use crate::types::{NodeType, SetFunction};

/// Borrowed reference to any typed node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Bool(&'a BoolExpr),
    Int64(&'a Int64Expr),
    Float64(&'a Float64Expr),
    String(&'a StringExpr),
    Datetime(&'a DatetimeExpr),
}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeRef::Bool(_) => NodeType::Bool,
            NodeRef::Int64(_) => NodeType::Int64,
            NodeRef::Float64(_) => NodeType::Float64,
            NodeRef::String(_) => NodeType::String,
            NodeRef::Datetime(_) => NodeType::Datetime,
        }
    }

    /// Returns the symbol name if this node reads a scalar symbol.
    #[must_use]
    pub fn symbol(&self) -> Option<&'a str> {
        match *self {
            NodeRef::Bool(BoolExpr::Symbol(name) | BoolExpr::IsNil { symbol: name, .. })
            | NodeRef::Int64(Int64Expr::Symbol(name))
            | NodeRef::Float64(Float64Expr::Symbol(name))
            | NodeRef::String(StringExpr::Symbol(name))
            | NodeRef::Datetime(DatetimeExpr::Symbol(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Returns the set function, set symbol and optional sub-query if this
    /// node traverses a set.
    #[must_use]
    pub fn set_reference(&self) -> Option<(SetFunction, &'a str, Option<&'a Query>)> {
        match *self {
            NodeRef::Bool(BoolExpr::AllOf(q)) => Some((SetFunction::AllOf, q.set.as_str(), None)),
            NodeRef::Bool(BoolExpr::AnyOf(q)) => Some((SetFunction::AnyOf, q.set.as_str(), None)),
            NodeRef::Bool(BoolExpr::NoneOf(q)) => Some((SetFunction::NoneOf, q.set.as_str(), None)),
            NodeRef::Bool(BoolExpr::IsEmpty { set, filter }) => {
                Some((SetFunction::IsEmpty, set.as_str(), filter.as_deref()))
            }
            NodeRef::Int64(Int64Expr::Count { set, filter }) => {
                Some((SetFunction::Count, set.as_str(), filter.as_deref()))
            }
            _ => None,
        }
    }

    fn label(&self) -> String {
        match *self {
            NodeRef::Bool(expr) => match expr {
                BoolExpr::Const(b) => format!("BoolConst({b})"),
                BoolExpr::Symbol(name) => format!("BoolSymbol({name})"),
                BoolExpr::And(..) => "And".into(),
                BoolExpr::Or(..) => "Or".into(),
                BoolExpr::Not(_) => "Not".into(),
                BoolExpr::IsNil { symbol, negated } => format!("IsNil({symbol}, negated={negated})"),
                BoolExpr::BoolCompare(c) => format!("BoolCompare({})", c.op),
                BoolExpr::Int64Compare(c) => format!("Int64Compare({})", c.op),
                BoolExpr::Float64Compare(c) => format!("Float64Compare({})", c.op),
                BoolExpr::StringCompare(c) => format!("StringCompare({})", c.op),
                BoolExpr::DatetimeCompare(c) => format!("DatetimeCompare({})", c.op),
                BoolExpr::InInt64Array(a) => format!("InInt64Array(negated={})", a.negated),
                BoolExpr::InFloat64Array(a) => format!("InFloat64Array(negated={})", a.negated),
                BoolExpr::InStringArray(a) => format!("InStringArray(negated={})", a.negated),
                BoolExpr::InDatetimeArray(a) => format!("InDatetimeArray(negated={})", a.negated),
                BoolExpr::Int64Between(b) => format!("Int64Between(negated={})", b.negated),
                BoolExpr::Float64Between(b) => format!("Float64Between(negated={})", b.negated),
                BoolExpr::DatetimeBetween(b) => format!("DatetimeBetween(negated={})", b.negated),
                BoolExpr::AllOf(q) => format!("AllOf({})", q.set),
                BoolExpr::AnyOf(q) => format!("AnyOf({})", q.set),
                BoolExpr::NoneOf(q) => format!("NoneOf({})", q.set),
                BoolExpr::IsEmpty { set, .. } => format!("IsEmpty({set})"),
            },
            NodeRef::Int64(expr) => match expr {
                Int64Expr::Const(v) => format!("Int64Const({v})"),
                Int64Expr::Symbol(name) => format!("Int64Symbol({name})"),
                Int64Expr::Count { set, .. } => format!("Count({set})"),
            },
            NodeRef::Float64(expr) => match expr {
                Float64Expr::Const(v) => format!("Float64Const({v})"),
                Float64Expr::Symbol(name) => format!("Float64Symbol({name})"),
                Float64Expr::FromInt64(_) => "Int64ToFloat64".into(),
            },
            NodeRef::String(expr) => match expr {
                StringExpr::Const(s) => format!("StringConst({s:?})"),
                StringExpr::Symbol(name) => format!("StringSymbol({name})"),
                StringExpr::FromInt64(_) => "Int64ToString".into(),
                StringExpr::FromFloat64(_) => "Float64ToString".into(),
            },
            NodeRef::Datetime(expr) => match expr {
                DatetimeExpr::Const(d) => format!("DatetimeConst({})", d.to_rfc3339()),
                DatetimeExpr::Symbol(name) => format!("DatetimeSymbol({name})"),
            },
        }
    }
}

/// Callbacks for a depth-first walk.
///
/// `start` runs before a node's children (pre-order), `end` after them (post-order).
/// The first error aborts the walk.
pub trait NodeVisitor {
    fn start(&mut self, _node: NodeRef<'_>) -> Result<()> {
        Ok(())
    }

    fn end(&mut self, _node: NodeRef<'_>) -> Result<()> {
        Ok(())
    }
}

/// Walks a typed predicate left to right.
///
/// Sub-queries of `count`/`isEmpty` are a separate namespace and are not entered.
///
/// # Errors
///
/// Returns the first error raised by the visitor.
pub fn walk_bool<V: NodeVisitor + ?Sized>(expr: &BoolExpr, visitor: &mut V) -> Result<()> {
    walk(NodeRef::Bool(expr), visitor)
}

fn walk<V: NodeVisitor + ?Sized>(node: NodeRef<'_>, visitor: &mut V) -> Result<()> {
    visitor.start(node)?;
    for child in children(node) {
        walk(child, visitor)?;
    }
    visitor.end(node)
}

fn children(node: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    match node {
        NodeRef::Bool(expr) => match expr {
            BoolExpr::Const(_)
            | BoolExpr::Symbol(_)
            | BoolExpr::IsNil { .. }
            | BoolExpr::IsEmpty { .. } => Vec::new(),
            BoolExpr::And(l, r) | BoolExpr::Or(l, r) => vec![NodeRef::Bool(l), NodeRef::Bool(r)],
            BoolExpr::Not(inner) => vec![NodeRef::Bool(inner)],
            BoolExpr::BoolCompare(c) => vec![NodeRef::Bool(&c.left), NodeRef::Bool(&c.right)],
            BoolExpr::Int64Compare(c) => vec![NodeRef::Int64(&c.left), NodeRef::Int64(&c.right)],
            BoolExpr::Float64Compare(c) => {
                vec![NodeRef::Float64(&c.left), NodeRef::Float64(&c.right)]
            }
            BoolExpr::StringCompare(c) => {
                vec![NodeRef::String(&c.left), NodeRef::String(&c.right)]
            }
            BoolExpr::DatetimeCompare(c) => {
                vec![NodeRef::Datetime(&c.left), NodeRef::Datetime(&c.right)]
            }
            BoolExpr::InInt64Array(a) => std::iter::once(&a.left)
                .chain(&a.elements)
                .map(NodeRef::Int64)
                .collect(),
            BoolExpr::InFloat64Array(a) => std::iter::once(&a.left)
                .chain(&a.elements)
                .map(NodeRef::Float64)
                .collect(),
            BoolExpr::InStringArray(a) => std::iter::once(&a.left)
                .chain(&a.elements)
                .map(NodeRef::String)
                .collect(),
            BoolExpr::InDatetimeArray(a) => std::iter::once(&a.left)
                .chain(&a.elements)
                .map(NodeRef::Datetime)
                .collect(),
            BoolExpr::Int64Between(b) => [&b.left, &b.lower, &b.upper]
                .into_iter()
                .map(NodeRef::Int64)
                .collect(),
            BoolExpr::Float64Between(b) => [&b.left, &b.lower, &b.upper]
                .into_iter()
                .map(NodeRef::Float64)
                .collect(),
            BoolExpr::DatetimeBetween(b) => [&b.left, &b.lower, &b.upper]
                .into_iter()
                .map(NodeRef::Datetime)
                .collect(),
            BoolExpr::AllOf(q) | BoolExpr::AnyOf(q) | BoolExpr::NoneOf(q) => {
                vec![NodeRef::Bool(&q.predicate)]
            }
        },
        NodeRef::Int64(_) | NodeRef::Datetime(_) => Vec::new(),
        NodeRef::Float64(expr) => match expr {
            Float64Expr::FromInt64(inner) => vec![NodeRef::Int64(inner)],
            _ => Vec::new(),
        },
        NodeRef::String(expr) => match expr {
            StringExpr::FromInt64(inner) => vec![NodeRef::Int64(inner)],
            StringExpr::FromFloat64(inner) => vec![NodeRef::Float64(inner)],
            _ => Vec::new(),
        },
    }
}

struct TreeDump {
    out: String,
    depth: usize,
}

impl NodeVisitor for TreeDump {
    fn start(&mut self, node: NodeRef<'_>) -> Result<()> {
        let _ = writeln!(self.out, "{:indent$}{}", "", node.label(), indent = self.depth * 2);
        self.depth += 1;
        Ok(())
    }

    fn end(&mut self, _node: NodeRef<'_>) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }
}

/// Renders a typed tree one node per line, indented by depth.
#[must_use]
pub fn dump_tree(expr: &BoolExpr) -> String {
    let mut dump = TreeDump {
        out: String::new(),
        depth: 0,
    };
    // TreeDump never fails.
    let _ = walk_bool(expr, &mut dump);
    dump.out
}
