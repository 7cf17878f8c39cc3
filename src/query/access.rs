//! Index Access
//!
//! Leaf expression answering an exact or range lookup. At evaluation time it
//! reads from the value index when the index is enabled and every lookup value
//! is short enough to be indexed; otherwise it scans the node table.
//! Index entries are checked against the node store before they are returned.
//! Scans poll the query's interrupt while they walk the table.

use std::fmt;
use std::sync::Arc;

use super::context::{CompileContext, QueryContext};
use crate::data::{Data, DataRef, DbNode, Pre};
use crate::error::{QueryError, QueryResult};
use crate::index::{IndexCursor, IndexQuery, IndexType, ScanCursor};

/// Exact or range lookup bound to one snapshot
#[derive(Debug, Clone)]
pub struct IndexAccess {
    query: Arc<IndexQuery>,
    data: DataRef,
    iterable: bool,
}

impl IndexAccess {
    pub fn new(data: &Arc<Data>, query: IndexQuery) -> Self {
        IndexAccess {
            query: Arc::new(query),
            data: DataRef::new(data),
            iterable: false,
        }
    }

    /// Lookup performed by this access
    pub fn query(&self) -> &Arc<IndexQuery> {
        &self.query
    }

    /// Bound snapshot
    pub fn data(&self) -> &DataRef {
        &self.data
    }

    #[inline]
    pub fn iterable(&self) -> bool {
        self.iterable
    }

    /// Name of the equivalent database function
    pub fn function(&self) -> &'static str {
        match (&*self.query, self.query.index_type()) {
            (IndexQuery::Exact(_), IndexType::Text) => "db:text",
            (IndexQuery::Exact(_), IndexType::Attribute) => "db:attribute",
            (IndexQuery::Range(_), IndexType::Text) => "db:text-range",
            (IndexQuery::Range(_), IndexType::Attribute) => "db:attribute-range",
        }
    }

    /// Check if the lookup is answered by the value index of `data`
    pub fn use_index(&self, data: &Data) -> bool {
        let index = data.index();
        self.query.fits(index.max_len()) && index.enabled(self.query.index_type())
    }

    /// Determine the iterable flag against the currently bound snapshot
    pub(crate) fn optimize(mut self, cc: &mut CompileContext) -> Self {
        self.iterable = match self.data.try_get() {
            Some(data) if self.use_index(&data) => match &*self.query {
                IndexQuery::Exact(_) => true,
                IndexQuery::Range(_) => data.index().ordered_ranges(),
            },
            Some(_) => {
                cc.info(format!("scanning table for {}", self));
                true
            }
            None => false,
        };
        self
    }

    /// Open a cursor for evaluation
    pub(crate) fn source(&self, qc: &QueryContext) -> QueryResult<AccessIter> {
        let data = self.data.get()?;
        self.query.validate()?;
        let indexed = self.use_index(&data);
        log::trace!(
            "{} on \"{}\" via {}",
            self.query,
            data.name(),
            if indexed { "index" } else { "scan" }
        );
        let cursor: Box<dyn IndexCursor + Send> = if indexed {
            match &*self.query {
                IndexQuery::Exact(token) => data.index().lookup(token),
                IndexQuery::Range(range) => data.index().range(range),
            }
        } else {
            Box::new(
                ScanCursor::new(Arc::clone(&data), Arc::clone(&self.query))
                    .interruptible(qc.interrupt().clone()),
            )
        };
        Ok(AccessIter {
            data,
            query: Arc::clone(&self.query),
            cursor,
            verify: indexed,
        })
    }
}

impl fmt::Display for IndexAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(\"{}\", ", self.function(), self.data.name())?;
        match &*self.query {
            IndexQuery::Exact(token) => {
                write!(f, "\"{}\")", String::from_utf8_lossy(&token.value))
            }
            IndexQuery::Range(range) => write!(f, "{})", range),
        }
    }
}

/// Running index access
pub(crate) struct AccessIter {
    data: Arc<Data>,
    query: Arc<IndexQuery>,
    cursor: Box<dyn IndexCursor + Send>,
    verify: bool,
}

impl AccessIter {
    pub(crate) fn advance(&mut self, qc: &QueryContext) -> QueryResult<Option<DbNode>> {
        if !self.cursor.more() {
            // a cancelled scan stops early and must not look exhausted
            qc.check_stop()?;
            return Ok(None);
        }
        let pre = self.cursor.pre();
        if self.verify {
            self.check(pre)?;
        }
        Ok(Some(DbNode::new(self.data.id(), pre)))
    }

    fn check(&self, pre: Pre) -> QueryResult<()> {
        let store = self.data.store();
        let index_type = self.query.index_type();
        let reason = if pre as usize >= store.size() {
            "position outside of the node table"
        } else if store.kind(pre) != index_type.node_kind() {
            "unexpected node kind"
        } else {
            let value = store.text(pre, index_type.is_text());
            let exact = matches!(*self.query, IndexQuery::Exact(_));
            if exact && value.len() > self.data.index().max_len() {
                "value exceeds the indexed length"
            } else if !self.query.matches(value) {
                "value does not satisfy the lookup"
            } else {
                return Ok(());
            }
        };
        Err(QueryError::IndexInconsistent {
            token: self.query.to_string(),
            pre,
            reason,
        })
    }
}
