//! Node Table - flat, pre-ordered document storage
//!
//! Every node (documents, elements, attributes, texts, comments and
//! processing instructions) occupies one row. Rows are stored in document
//! order, so the row position (pre value) doubles as the order key.
//!
//! ```text
//! pre  kind       dist  size  name   value
//! 0    document   0     6     -      "books.xml"
//! 1    element    1     5     book   -
//! 2    attribute  1     1     id     "b1"
//! 3    element    2     2     title  -
//! 4    text       1     1     -      "XML"
//! 5    comment    4     1     -      "draft"
//! ```

use super::names::NamePool;
use super::node::{NodeKind, Pre};
use super::NodeStore;

/// One row of the table
#[derive(Debug, Clone)]
pub(crate) struct TableNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Distance to the parent row (0 for document roots)
    pub dist: u32,
    /// Number of rows in the subtree, including this one
    pub size: u32,
    /// Number of attribute rows plus one (elements only)
    pub asize: u32,
    /// Interned name id (elements, attributes, processing instructions)
    pub name: u32,
    /// Value bytes (document path, text, attribute value, comment, PI data)
    pub value: Box<[u8]>,
}

/// Flat node table
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    pub(crate) nodes: Vec<TableNode>,
    pub(crate) names: NamePool,
}

impl NodeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get node count
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of attributes of an element
    pub fn attribute_count(&self, pre: Pre) -> usize {
        self.nodes
            .get(pre as usize)
            .map(|node| node.asize.saturating_sub(1) as usize)
            .unwrap_or(0)
    }

    /// Pre values of all document roots
    pub fn documents(&self) -> impl Iterator<Item = Pre> + '_ {
        let mut pre = 0usize;
        std::iter::from_fn(move || {
            let node = self.nodes.get(pre)?;
            let current = pre as Pre;
            pre += (node.size as usize).max(1);
            Some(current)
        })
    }

    /// Replace the value of a node
    pub(crate) fn set_value(&mut self, pre: Pre, value: &[u8]) {
        if let Some(node) = self.nodes.get_mut(pre as usize) {
            node.value = value.into();
        }
    }

    /// Append the document(s) of another table after the last row.
    ///
    /// Distances and sizes are relative, so rows are copied as they are;
    /// only name ids are re-interned into this table's pool.
    pub fn append(&mut self, other: &NodeTable) {
        self.nodes.reserve(other.nodes.len());
        for node in &other.nodes {
            let name = match other.names.get(node.name) {
                Some(name) => self.names.intern(name),
                None => 0,
            };
            self.nodes.push(TableNode {
                name,
                ..node.clone()
            });
        }
    }

    #[inline]
    fn node(&self, pre: Pre) -> &TableNode {
        &self.nodes[pre as usize]
    }
}

impl NodeStore for NodeTable {
    #[inline]
    fn size(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn kind(&self, pre: Pre) -> NodeKind {
        self.node(pre).kind
    }

    #[inline]
    fn text(&self, pre: Pre, text: bool) -> &[u8] {
        let node = self.node(pre);
        debug_assert_eq!(
            text,
            node.kind != NodeKind::Attribute,
            "text flag does not match node kind"
        );
        &node.value
    }

    fn name(&self, pre: Pre) -> Option<&[u8]> {
        self.names.get(self.node(pre).name)
    }

    fn parent(&self, pre: Pre) -> Option<Pre> {
        let dist = self.node(pre).dist;
        if dist == 0 {
            None
        } else {
            Some(pre - dist)
        }
    }

    fn subtree_size(&self, pre: Pre) -> usize {
        self.node(pre).size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TableBuilder;

    fn books() -> NodeTable {
        let mut builder = TableBuilder::new("books.xml");
        builder.open_elem(b"book");
        builder.attribute(b"id", b"b1").unwrap();
        builder.open_elem(b"title");
        builder.text(b"XML");
        builder.close_elem().unwrap();
        builder.comment(b"draft");
        builder.close_elem().unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_navigation() {
        let table = books();
        assert_eq!(table.size(), 6);
        assert_eq!(table.kind(0), NodeKind::Document);
        assert_eq!(table.kind(2), NodeKind::Attribute);
        assert_eq!(table.text(2, false), b"b1");
        assert_eq!(table.text(4, true), b"XML");
        assert_eq!(table.name(3), Some(&b"title"[..]));
        assert_eq!(table.parent(4), Some(3));
        assert_eq!(table.parent(5), Some(1));
        assert_eq!(table.parent(0), None);
        assert_eq!(table.subtree_size(1), 5);
        assert_eq!(table.attribute_count(1), 1);
    }

    #[test]
    fn test_append_reinterns_names() {
        let mut table = books();
        let mut other = TableBuilder::new("other.xml");
        other.open_elem(b"title");
        other.close_elem().unwrap();
        let other = other.finish().unwrap();

        table.append(&other);
        assert_eq!(table.size(), 8);
        assert_eq!(table.name(7), Some(&b"title"[..]));
        assert_eq!(table.parent(7), Some(6));
        assert_eq!(table.documents().collect::<Vec<_>>(), vec![0, 6]);
    }
}
