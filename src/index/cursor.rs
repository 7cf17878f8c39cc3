//! Index Cursors
//!
//! Pull iterators over pre values: `more()` advances, `pre()` returns the
//! current entry. Produced by value indexes or by the full-table scan.

use std::sync::Arc;

use super::token::IndexQuery;
use crate::data::{Data, NodeKind, Pre};
use crate::query::Interrupt;

/// Rows visited by a scan between two interrupt polls
const POLL_INTERVAL: usize = 4096;

/// Pull iterator over pre values
pub trait IndexCursor {
    /// Advance to the next entry; `false` once exhausted
    fn more(&mut self) -> bool;

    /// Current entry (valid after `more()` returned `true`)
    fn pre(&self) -> Pre;
}

/// Cursor over a shared, pre-sorted posting list
#[derive(Debug, Clone)]
pub struct SliceCursor {
    pres: Arc<[Pre]>,
    pos: usize,
}

impl SliceCursor {
    pub fn new(pres: Arc<[Pre]>) -> Self {
        SliceCursor { pres, pos: 0 }
    }

    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::new()))
    }
}

impl IndexCursor for SliceCursor {
    #[inline]
    fn more(&mut self) -> bool {
        if self.pos < self.pres.len() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn pre(&self) -> Pre {
        self.pres[self.pos - 1]
    }
}

/// Cursor over collected entries, in the order they were collected
#[derive(Debug, Clone, Default)]
pub struct VecCursor {
    pres: Vec<Pre>,
    pos: usize,
}

impl VecCursor {
    pub fn new(pres: Vec<Pre>) -> Self {
        VecCursor { pres, pos: 0 }
    }
}

impl IndexCursor for VecCursor {
    #[inline]
    fn more(&mut self) -> bool {
        if self.pos < self.pres.len() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn pre(&self) -> Pre {
        self.pres[self.pos - 1]
    }
}

/// Full-table scan: visits every pre value in ascending order and keeps the
/// nodes of the queried kind whose value matches. Results are in document order.
/// An interruptible scan ends early once cancellation is requested.
pub struct ScanCursor {
    data: Arc<Data>,
    query: Arc<IndexQuery>,
    kind: NodeKind,
    text: bool,
    next: usize,
    pre: Pre,
    interrupt: Option<Interrupt>,
}

impl ScanCursor {
    pub fn new(data: Arc<Data>, query: Arc<IndexQuery>) -> Self {
        let index_type = query.index_type();
        ScanCursor {
            data,
            kind: index_type.node_kind(),
            text: index_type.is_text(),
            query,
            next: 0,
            pre: 0,
            interrupt: None,
        }
    }

    /// Stop the scan when `interrupt` is cancelled
    pub fn interruptible(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    fn cancelled(&self) -> bool {
        self.interrupt.as_ref().is_some_and(Interrupt::is_cancelled)
    }
}

impl IndexCursor for ScanCursor {
    fn more(&mut self) -> bool {
        let store = self.data.store();
        let size = store.size();
        while self.next < size {
            if self.next % POLL_INTERVAL == 0 && self.cancelled() {
                self.next = size;
                return false;
            }
            let pre = self.next as Pre;
            self.next += 1;
            if store.kind(pre) != self.kind {
                continue;
            }
            if self.query.matches(store.text(pre, self.text)) {
                self.pre = pre;
                return true;
            }
        }
        false
    }

    #[inline]
    fn pre(&self) -> Pre {
        self.pre
    }
}

/// Drain a cursor into a vector (tests and diagnostics)
pub fn collect(cursor: &mut dyn IndexCursor) -> Vec<Pre> {
    let mut pres = Vec::new();
    while cursor.more() {
        pres.push(cursor.pre());
    }
    pres
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TableBuilder;
    use crate::index::{IndexToken, IndexType, StringRange};
    use crate::options::Options;

    fn data() -> Arc<Data> {
        let mut builder = TableBuilder::new("doc.xml");
        builder.open_elem(b"list");
        builder.attribute(b"name", b"b").unwrap();
        for value in [&b"c"[..], &b"a"[..], &b"d"[..], &b"b"[..]] {
            builder.open_elem(b"item");
            builder.text(value);
            builder.close_elem().unwrap();
        }
        builder.close_elem().unwrap();
        Arc::new(Data::new("db", builder.finish().unwrap(), &Options::default()))
    }

    #[test]
    fn test_scan_text_range() {
        let query = IndexQuery::Range(StringRange::new(IndexType::Text, b"b", b"c"));
        let mut cursor = ScanCursor::new(data(), Arc::new(query));
        // item texts at pres 4, 6, 8, 10; the attribute "b" is not a text node
        assert_eq!(collect(&mut cursor), vec![4, 10]);
    }

    #[test]
    fn test_scan_attribute_exact() {
        let query = IndexQuery::Exact(IndexToken::new(IndexType::Attribute, b"b"));
        let mut cursor = ScanCursor::new(data(), Arc::new(query));
        assert_eq!(collect(&mut cursor), vec![2]);
        assert!(!cursor.more());
    }

    #[test]
    fn test_scan_stops_when_cancelled() {
        let mut builder = TableBuilder::new("doc.xml");
        builder.open_elem(b"list");
        for _ in 0..POLL_INTERVAL {
            builder.open_elem(b"item");
            builder.text(b"a");
            builder.close_elem().unwrap();
        }
        builder.close_elem().unwrap();
        let data = Arc::new(Data::new("db", builder.finish().unwrap(), &Options::default()));
        let query = Arc::new(IndexQuery::Exact(IndexToken::new(IndexType::Text, b"a")));

        let interrupt = Interrupt::new();
        let mut cursor = ScanCursor::new(Arc::clone(&data), Arc::clone(&query))
            .interruptible(interrupt.clone());
        assert!(cursor.more());
        interrupt.cancel();
        // the running scan notices at the next poll, long before the table ends
        let rest = collect(&mut cursor);
        assert!(rest.len() < POLL_INTERVAL);
        assert!(!cursor.more());

        let mut cursor = ScanCursor::new(data, query).interruptible(interrupt);
        assert!(!cursor.more());
    }

    #[test]
    fn test_slice_cursor() {
        let mut cursor = SliceCursor::new(Arc::from(vec![1, 5, 9]));
        assert_eq!(collect(&mut cursor), vec![1, 5, 9]);
        assert!(collect(&mut SliceCursor::empty()).is_empty());
    }
}
