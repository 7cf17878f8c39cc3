//! Table Builder
//!
//! Builds a single-document `NodeTable` fragment from start/end calls.
//! Sizes of elements are fixed up when they are closed.

use super::node::{NodeKind, Pre};
use super::table::{NodeTable, TableNode};
use crate::error::BuildError;
use crate::options::Options;

/// Incremental fragment builder
#[derive(Debug)]
pub struct TableBuilder {
    table: NodeTable,
    /// Open ancestors (document root at the bottom)
    stack: Vec<Pre>,
    /// Attributes may still be added to the innermost element
    attributes_open: bool,
    /// Drop whitespace-only text nodes
    chop: bool,
}

impl TableBuilder {
    /// Start a fragment whose document node is named `name`
    pub fn new(name: &str) -> Self {
        Self::with_options(name, &Options::default())
    }

    /// Start a fragment honoring the building options
    pub fn with_options(name: &str, options: &Options) -> Self {
        let mut builder = TableBuilder {
            table: NodeTable::new(),
            stack: Vec::with_capacity(16),
            attributes_open: false,
            chop: options.chop,
        };
        builder.table.nodes.push(TableNode {
            kind: NodeKind::Document,
            dist: 0,
            size: 1,
            asize: 1,
            name: 0,
            value: name.as_bytes().into(),
        });
        builder.stack.push(0);
        builder
    }

    /// Number of rows built so far
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Open an element
    pub fn open_elem(&mut self, name: &[u8]) {
        let pre = self.push(NodeKind::Element, name, b"");
        self.stack.push(pre);
        self.attributes_open = true;
    }

    /// Add an attribute to the element opened last
    pub fn attribute(&mut self, name: &[u8], value: &[u8]) -> Result<(), BuildError> {
        if !self.attributes_open {
            return Err(BuildError::MisplacedAttribute(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }
        self.push(NodeKind::Attribute, name, value);
        if let Some(&elem) = self.stack.last() {
            self.table.nodes[elem as usize].asize += 1;
        }
        Ok(())
    }

    /// Add a text node. Empty texts are skipped, as are whitespace-only texts when chopping.
    pub fn text(&mut self, value: &[u8]) {
        if value.is_empty() || (self.chop && value.iter().all(u8::is_ascii_whitespace)) {
            return;
        }
        self.push(NodeKind::Text, b"", value);
        self.attributes_open = false;
    }

    /// Add a comment
    pub fn comment(&mut self, value: &[u8]) {
        self.push(NodeKind::Comment, b"", value);
        self.attributes_open = false;
    }

    /// Add a processing instruction
    pub fn processing_instruction(&mut self, target: &[u8], data: &[u8]) {
        self.push(NodeKind::ProcessingInstruction, target, data);
        self.attributes_open = false;
    }

    /// Close the element opened last
    pub fn close_elem(&mut self) -> Result<(), BuildError> {
        // the document root stays open until finish()
        if self.stack.len() < 2 {
            return Err(BuildError::UnbalancedClose);
        }
        if let Some(pre) = self.stack.pop() {
            self.close(pre);
        }
        self.attributes_open = false;
        Ok(())
    }

    /// Close the document and return the fragment
    pub fn finish(mut self) -> Result<NodeTable, BuildError> {
        if self.stack.len() > 1 {
            return Err(BuildError::Unclosed(self.stack.len() - 1));
        }
        self.close(0);
        Ok(self.table)
    }

    fn close(&mut self, pre: Pre) {
        let size = (self.table.len() - pre as usize) as u32;
        self.table.nodes[pre as usize].size = size;
    }

    fn push(&mut self, kind: NodeKind, name: &[u8], value: &[u8]) -> Pre {
        let pre = self.table.len() as Pre;
        let parent = self.stack.last().copied().unwrap_or(0);
        let name = self.table.names.intern(name);
        self.table.nodes.push(TableNode {
            kind,
            dist: pre - parent,
            size: 1,
            asize: 1,
            name,
            value: value.into(),
        });
        if kind != NodeKind::Attribute {
            self.attributes_open = false;
        }
        pre
    }
}
