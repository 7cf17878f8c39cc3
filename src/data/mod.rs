//! Data Module - Node Store and Snapshots
//!
//! Implements the table-addressed node store used by the query engine:
//! - Pre values (u32) as node positions and document order
//! - Flat node table with relative parent distances
//! - Immutable snapshots combining a table with its value index
//! - Single-writer update lock

pub mod builder;
pub mod lock;
pub mod names;
pub mod node;
pub mod table;

pub use builder::TableBuilder;
pub use lock::{UpdateGuard, UpdateLock};
pub use names::NamePool;
pub use node::{DataId, DbNode, NodeKind, Pre};
pub use table::NodeTable;

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{QueryError, QueryResult};
use crate::index::{MemValueIndex, ValueIndex};
use crate::options::Options;

/// Read access to a node table
pub trait NodeStore {
    /// Number of nodes
    fn size(&self) -> usize;

    /// Kind of the node at `pre` (`pre < size`)
    fn kind(&self, pre: Pre) -> NodeKind;

    /// Value of a text-like node (`text == true`) or an attribute (`text == false`)
    fn text(&self, pre: Pre, text: bool) -> &[u8];

    /// Name of an element, attribute or processing instruction
    fn name(&self, pre: Pre) -> Option<&[u8]>;

    /// Parent of a node, `None` for document roots
    fn parent(&self, pre: Pre) -> Option<Pre>;

    /// Number of nodes in the subtree rooted at `pre`
    fn subtree_size(&self, pre: Pre) -> usize;

    /// Document order of two nodes of this store
    #[inline]
    fn diff(&self, a: Pre, b: Pre) -> Ordering {
        a.cmp(&b)
    }
}

/// Immutable database snapshot: node table plus value index
pub struct Data {
    id: DataId,
    name: String,
    table: NodeTable,
    index: Box<dyn ValueIndex + Send + Sync>,
}

impl Data {
    /// Create a snapshot and build its value indexes from the options
    pub fn new(name: &str, table: NodeTable, options: &Options) -> Self {
        let index = MemValueIndex::build(&table, options);
        Self::with_index(name, table, Box::new(index))
    }

    /// Create a snapshot with a custom value index
    pub fn with_index(
        name: &str,
        table: NodeTable,
        index: Box<dyn ValueIndex + Send + Sync>,
    ) -> Self {
        Data {
            id: DataId::next(),
            name: name.to_string(),
            table,
            index,
        }
    }

    #[inline]
    pub fn id(&self) -> DataId {
        self.id
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node store of this snapshot
    #[inline]
    pub fn store(&self) -> &dyn NodeStore {
        &self.table
    }

    /// Concrete node table
    pub fn table(&self) -> &NodeTable {
        &self.table
    }

    /// Value index of this snapshot
    #[inline]
    pub fn index(&self) -> &dyn ValueIndex {
        self.index.as_ref()
    }

    /// Node reference for a pre value of this snapshot
    pub fn node(&self, pre: Pre) -> Option<DbNode> {
        ((pre as usize) < self.table.len()).then(|| DbNode::new(self.id, pre))
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.table.len())
            .finish()
    }
}

/// Weak binding of an expression to a snapshot
#[derive(Debug, Clone)]
pub struct DataRef {
    name: Arc<str>,
    id: DataId,
    data: Weak<Data>,
}

impl DataRef {
    pub fn new(data: &Arc<Data>) -> Self {
        DataRef {
            name: Arc::from(data.name()),
            id: data.id(),
            data: Arc::downgrade(data),
        }
    }

    /// Name of the bound database
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the bound snapshot
    pub fn id(&self) -> DataId {
        self.id
    }

    /// Resolve the binding
    pub fn get(&self) -> QueryResult<Arc<Data>> {
        self.data.upgrade().ok_or_else(|| QueryError::StoreUnavailable {
            name: self.name.to_string(),
        })
    }

    /// Resolve the binding if the snapshot is still alive
    pub fn try_get(&self) -> Option<Arc<Data>> {
        self.data.upgrade()
    }
}
