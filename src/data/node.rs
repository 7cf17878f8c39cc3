//! Node kinds and node references
//!
//! Uses Pre (u32) positions into the node table; pre order is document order.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Position of a node in the node table
pub type Pre = u32;

/// Type of a table node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// Attribute (stored as its own row, directly after its element)
    Attribute,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

impl NodeKind {
    /// Lower-case name used in plans and host terms
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Attribute => "attribute",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing_instruction",
        }
    }
}

/// Identity of a data snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataId(u32);

static NEXT_DATA_ID: AtomicU32 = AtomicU32::new(1);

impl DataId {
    /// Allocate a process-unique id
    pub(crate) fn next() -> Self {
        DataId(NEXT_DATA_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Reference to a node of one snapshot
///
/// Ordered by snapshot first, then by pre value, which is document order
/// within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbNode {
    pub data: DataId,
    pub pre: Pre,
}

impl DbNode {
    pub fn new(data: DataId, pre: Pre) -> Self {
        DbNode { data, pre }
    }

    /// Document order comparison: Less = before, Equal = same node, Greater = after
    #[inline]
    pub fn diff(&self, other: &DbNode) -> Ordering {
        self.cmp(other)
    }
}
