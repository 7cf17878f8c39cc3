//! Query Expressions
//!
//! Expression tree evaluated against a database snapshot. Leaves are index
//! accesses or literal node lists; inner nodes are n-ary set operators.
//! Every expression yields nodes of a single snapshot, in document order and
//! without duplicates.

use std::fmt;
use std::sync::Arc;

use super::access::IndexAccess;
use super::context::QueryContext;
use super::iter::{NodeIter, NodeSeq, SeqIter, Source};
use super::set::SetIter;
use crate::data::{Data, DataRef, DbNode, NodeStore, Pre};
use crate::error::{QueryError, QueryResult};
use crate::index::{IndexQuery, IndexToken, IndexType, StringRange};

/// Set operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    Union,
    Intersect,
    Except,
}

impl SetOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOp::Union => "union",
            SetOp::Intersect => "intersect",
            SetOp::Except => "except",
        }
    }

    /// Infix form used when printing expressions
    fn infix(&self) -> &'static str {
        match self {
            SetOp::Union => "|",
            SetOp::Intersect => "intersect",
            SetOp::Except => "except",
        }
    }
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal node list of one snapshot
#[derive(Debug, Clone)]
pub struct NodeList {
    pub(crate) data: DataRef,
    pub(crate) pres: Arc<[Pre]>,
    pub(crate) iterable: bool,
}

impl NodeList {
    pub fn pres(&self) -> &[Pre] {
        &self.pres
    }
}

/// N-ary set operator node
#[derive(Debug, Clone)]
pub struct SetExpr {
    pub(crate) op: SetOp,
    pub(crate) operands: Vec<Expr>,
    pub(crate) iterable: bool,
}

impl SetExpr {
    pub fn op(&self) -> SetOp {
        self.op
    }

    pub fn operands(&self) -> &[Expr] {
        &self.operands
    }
}

/// Query expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Empty sequence
    Empty,
    /// Literal node references
    Nodes(NodeList),
    /// Exact or range lookup on a value index
    Access(IndexAccess),
    /// Union, intersection or difference of its operands
    Set(SetExpr),
}

impl Expr {
    /// Text nodes whose value equals `value`
    pub fn text(data: &Arc<Data>, value: &[u8]) -> Expr {
        Self::access(data, IndexQuery::Exact(IndexToken::new(IndexType::Text, value)))
    }

    /// Attribute nodes whose value equals `value`
    pub fn attribute(data: &Arc<Data>, value: &[u8]) -> Expr {
        Self::access(
            data,
            IndexQuery::Exact(IndexToken::new(IndexType::Attribute, value)),
        )
    }

    /// Text or attribute nodes whose value lies in `range`
    pub fn range(data: &Arc<Data>, range: StringRange) -> Expr {
        Self::access(data, IndexQuery::Range(range))
    }

    /// Index access for an arbitrary lookup
    pub fn access(data: &Arc<Data>, query: IndexQuery) -> Expr {
        Expr::Access(IndexAccess::new(data, query))
    }

    /// Literal node list. Fails with `InvalidNode` for positions outside the snapshot.
    pub fn nodes(data: &Arc<Data>, pres: impl IntoIterator<Item = Pre>) -> QueryResult<Expr> {
        let pres: Arc<[Pre]> = pres.into_iter().collect();
        let size = data.store().size();
        if let Some(&pre) = pres.iter().find(|&&pre| pre as usize >= size) {
            return Err(QueryError::InvalidNode {
                name: data.name().to_string(),
                pre,
                size,
            });
        }
        let iterable = pres.windows(2).all(|w| w[0] < w[1]);
        Ok(Expr::Nodes(NodeList {
            data: DataRef::new(data),
            pres,
            iterable,
        }))
    }

    pub fn union(operands: Vec<Expr>) -> Expr {
        Self::set(SetOp::Union, operands)
    }

    pub fn intersect(operands: Vec<Expr>) -> Expr {
        Self::set(SetOp::Intersect, operands)
    }

    pub fn except(operands: Vec<Expr>) -> Expr {
        Self::set(SetOp::Except, operands)
    }

    /// Set operator over the operands, in the given order
    pub fn set(op: SetOp, operands: Vec<Expr>) -> Expr {
        Expr::Set(SetExpr {
            op,
            operands,
            iterable: false,
        })
    }

    /// Check if this is the empty sequence
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Empty)
    }

    /// Check if lazy evaluation yields nodes in document order without duplicates
    pub fn iterable(&self) -> bool {
        match self {
            Expr::Empty => true,
            Expr::Nodes(list) => list.iterable,
            Expr::Access(access) => access.iterable(),
            Expr::Set(set) => set.iterable,
        }
    }

    /// Operands of a set operator; empty for leaves
    pub fn operands(&self) -> &[Expr] {
        match self {
            Expr::Set(set) => &set.operands,
            _ => &[],
        }
    }

    /// Lazy evaluation
    pub fn iter(&self, qc: &QueryContext) -> QueryResult<NodeIter> {
        Ok(NodeIter::new(self.source(qc)?, qc.clone()))
    }

    /// Eager evaluation
    pub fn value(&self, qc: &QueryContext) -> QueryResult<NodeSeq> {
        let nodes = self.source(qc)?.collect(qc)?;
        Ok(NodeSeq::new(nodes))
    }

    /// Build the pull source of this expression
    pub(crate) fn source(&self, qc: &QueryContext) -> QueryResult<Source> {
        qc.check_stop()?;
        match self {
            Expr::Empty => Ok(Source::Empty),
            Expr::Nodes(list) => {
                let data = list.data.get()?;
                let nodes: Vec<DbNode> = list
                    .pres
                    .iter()
                    .map(|&pre| DbNode::new(data.id(), pre))
                    .collect();
                Ok(Source::Seq(SeqIter::new(nodes)))
            }
            Expr::Access(access) => Ok(Source::Access(access.source(qc)?)),
            Expr::Set(set) => Ok(Source::Set(Box::new(SetIter::new(set, qc)?))),
        }
    }

    /// Indented query plan
    pub fn plan(&self) -> String {
        Plan(self).to_string()
    }

    fn write_plan(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Expr::Empty => writeln!(f, "{}empty", indent)?,
            Expr::Nodes(list) => writeln!(
                f,
                "{}nodes data=\"{}\" count={} iterable={}",
                indent,
                list.data.name(),
                list.pres.len(),
                list.iterable
            )?,
            Expr::Access(access) => writeln!(
                f,
                "{}{} data=\"{}\" {} iterable={}",
                indent,
                access.function(),
                access.data().name(),
                access.query(),
                access.iterable()
            )?,
            Expr::Set(set) => writeln!(f, "{}{} iterable={}", indent, set.op, set.iterable)?,
        }
        for operand in self.operands() {
            operand.write_plan(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented plan listing, one node per line
struct Plan<'a>(&'a Expr);

impl fmt::Display for Plan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_plan(f, 0)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => f.write_str("()"),
            Expr::Nodes(list) => {
                write!(f, "db:node-pre(\"{}\", (", list.data.name())?;
                for (i, pre) in list.pres.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", pre)?;
                }
                f.write_str("))")
            }
            Expr::Access(access) => fmt::Display::fmt(access, f),
            Expr::Set(set) => {
                f.write_str("(")?;
                for (i, operand) in set.operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", set.op.infix())?;
                    }
                    write!(f, "{}", operand)?;
                }
                f.write_str(")")
            }
        }
    }
}
