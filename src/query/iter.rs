//! Node Iteration
//!
//! Pull sources built from expressions, and the shared fill loop used by
//! both evaluation modes: lazy iteration fills a single-slot sink per call,
//! eager evaluation fills a growing vector. Cancellation is polled once per
//! produced node in either mode.

use std::ops::Deref;

use super::access::AccessIter;
use super::context::QueryContext;
use super::set::SetIter;
use crate::data::{DbNode, Pre};
use crate::error::QueryResult;

/// Receiver of produced nodes
pub(crate) trait Sink {
    fn accept(&mut self, node: DbNode);

    /// Check if the sink takes no more nodes
    fn full(&self) -> bool;
}

/// Sink holding at most one node
pub(crate) struct One(pub(crate) Option<DbNode>);

impl Sink for One {
    #[inline]
    fn accept(&mut self, node: DbNode) {
        self.0 = Some(node);
    }

    #[inline]
    fn full(&self) -> bool {
        self.0.is_some()
    }
}

/// Sink collecting every node
pub(crate) struct All(pub(crate) Vec<DbNode>);

impl Sink for All {
    #[inline]
    fn accept(&mut self, node: DbNode) {
        self.0.push(node);
    }

    #[inline]
    fn full(&self) -> bool {
        false
    }
}

/// Materialized node list
pub(crate) struct SeqIter {
    nodes: Vec<DbNode>,
    pos: usize,
}

impl SeqIter {
    pub(crate) fn new(nodes: Vec<DbNode>) -> Self {
        SeqIter { nodes, pos: 0 }
    }

    #[inline]
    fn advance(&mut self) -> Option<DbNode> {
        let node = self.nodes.get(self.pos).copied();
        self.pos += node.is_some() as usize;
        node
    }
}

/// Pull source of one expression
pub(crate) enum Source {
    Empty,
    Seq(SeqIter),
    Access(AccessIter),
    Set(Box<SetIter>),
}

impl Source {
    #[inline]
    fn advance(&mut self, qc: &QueryContext) -> QueryResult<Option<DbNode>> {
        match self {
            Source::Empty => Ok(None),
            Source::Seq(seq) => Ok(seq.advance()),
            Source::Access(access) => access.advance(qc),
            Source::Set(set) => set.advance(qc),
        }
    }

    /// Pull nodes into the sink until it is full or the source is exhausted
    pub(crate) fn fill<S: Sink>(&mut self, qc: &QueryContext, sink: &mut S) -> QueryResult<()> {
        while !sink.full() {
            match self.advance(qc)? {
                Some(node) => {
                    qc.check_stop()?;
                    sink.accept(node);
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Next node, `None` once exhausted
    pub(crate) fn next(&mut self, qc: &QueryContext) -> QueryResult<Option<DbNode>> {
        let mut one = One(None);
        self.fill(qc, &mut one)?;
        Ok(one.0)
    }

    /// All remaining nodes
    pub(crate) fn collect(&mut self, qc: &QueryContext) -> QueryResult<Vec<DbNode>> {
        let mut all = All(Vec::new());
        self.fill(qc, &mut all)?;
        Ok(all.0)
    }
}

/// Lazy evaluation result
///
/// Yields nodes on demand. After an error or exhaustion it yields nothing more.
pub struct NodeIter {
    source: Source,
    qc: QueryContext,
    done: bool,
}

impl NodeIter {
    pub(crate) fn new(source: Source, qc: QueryContext) -> Self {
        NodeIter {
            source,
            qc,
            done: false,
        }
    }

    /// Next node in document order
    pub fn next_node(&mut self) -> QueryResult<Option<DbNode>> {
        if self.done {
            return Ok(None);
        }
        let next = self.source.next(&self.qc);
        if !matches!(next, Ok(Some(_))) {
            self.done = true;
        }
        next
    }

    /// Drain the remaining nodes
    pub fn into_seq(mut self) -> QueryResult<NodeSeq> {
        if self.done {
            return Ok(NodeSeq::default());
        }
        self.done = true;
        Ok(NodeSeq::new(self.source.collect(&self.qc)?))
    }
}

impl Iterator for NodeIter {
    type Item = QueryResult<DbNode>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_node().transpose()
    }
}

/// Eager evaluation result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSeq(Vec<DbNode>);

impl NodeSeq {
    pub fn new(nodes: Vec<DbNode>) -> Self {
        NodeSeq(nodes)
    }

    /// Pre values of the nodes
    pub fn pres(&self) -> Vec<Pre> {
        self.0.iter().map(|node| node.pre).collect()
    }

    /// Check if the nodes are in document order without duplicates
    pub fn is_ordered(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }

    pub fn into_vec(self) -> Vec<DbNode> {
        self.0
    }
}

impl Deref for NodeSeq {
    type Target = [DbNode];

    fn deref(&self) -> &[DbNode] {
        &self.0
    }
}

impl IntoIterator for NodeSeq {
    type Item = DbNode;
    type IntoIter = std::vec::IntoIter<DbNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
