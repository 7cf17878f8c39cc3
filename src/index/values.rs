//! In-memory Value Index
//!
//! Maps text and attribute values to the sorted pre values of the nodes that
//! carry them. Values longer than the configured maximum are kept apart: exact
//! lookups never see them, range lookups do. Range lookups walk the keys in
//! value order, so their results are not in document order.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::cursor::{IndexCursor, SliceCursor, VecCursor};
use super::token::{IndexToken, IndexType, StringRange};
use super::ValueIndex;
use crate::data::{NodeKind, NodeStore, NodeTable, Pre};
use crate::options::Options;

type Postings = BTreeMap<Box<[u8]>, Arc<[Pre]>>;

/// Postings of one kind of value
#[derive(Debug, Default)]
struct Values {
    /// Values of at most `maxlen` bytes
    short: Postings,
    /// Longer values, only reachable through ranges
    long: Postings,
}

/// Value index over one node table
#[derive(Debug, Default)]
pub struct MemValueIndex {
    texts: Option<Values>,
    attributes: Option<Values>,
    maxlen: usize,
}

impl MemValueIndex {
    /// Build the indexes enabled in the options
    pub fn build(table: &NodeTable, options: &Options) -> Self {
        let maxlen = options.maxlen;
        let mut texts: [BTreeMap<Box<[u8]>, Vec<Pre>>; 2] = Default::default();
        let mut attributes: [BTreeMap<Box<[u8]>, Vec<Pre>>; 2] = Default::default();

        for pre in 0..table.size() as Pre {
            let (maps, text) = match table.kind(pre) {
                NodeKind::Text if options.textindex => (&mut texts, true),
                NodeKind::Attribute if options.attrindex => (&mut attributes, false),
                _ => continue,
            };
            let value = table.text(pre, text);
            let map = &mut maps[(value.len() > maxlen) as usize];
            // pre values are visited in ascending order, so every list stays sorted
            match map.get_mut(value) {
                Some(pres) => pres.push(pre),
                None => {
                    map.insert(value.into(), vec![pre]);
                }
            }
        }

        let finish = |[short, long]: [BTreeMap<Box<[u8]>, Vec<Pre>>; 2]| -> Values {
            let postings = |map: BTreeMap<Box<[u8]>, Vec<Pre>>| -> Postings {
                map.into_iter()
                    .map(|(value, pres)| (value, Arc::from(pres)))
                    .collect()
            };
            Values {
                short: postings(short),
                long: postings(long),
            }
        };
        let index = MemValueIndex {
            texts: options.textindex.then(|| finish(texts)),
            attributes: options.attrindex.then(|| finish(attributes)),
            maxlen,
        };
        log::debug!(
            "built value index: {} text keys, {} attribute keys, maxlen {}",
            index.keys(IndexType::Text),
            index.keys(IndexType::Attribute),
            maxlen
        );
        index
    }

    /// Number of distinct values reachable by exact lookups
    pub fn keys(&self, kind: IndexType) -> usize {
        self.values(kind).map_or(0, |values| values.short.len())
    }

    fn values(&self, kind: IndexType) -> Option<&Values> {
        match kind {
            IndexType::Text => self.texts.as_ref(),
            IndexType::Attribute => self.attributes.as_ref(),
        }
    }
}

impl ValueIndex for MemValueIndex {
    fn enabled(&self, kind: IndexType) -> bool {
        self.values(kind).is_some()
    }

    fn max_len(&self) -> usize {
        self.maxlen
    }

    fn lookup(&self, token: &IndexToken) -> Box<dyn IndexCursor + Send> {
        let pres = self
            .values(token.kind)
            .and_then(|values| values.short.get(&token.value[..]))
            .cloned();
        Box::new(pres.map_or_else(SliceCursor::empty, SliceCursor::new))
    }

    fn range(&self, range: &StringRange) -> Box<dyn IndexCursor + Send> {
        let Some(values) = self.values(range.kind) else {
            return Box::new(VecCursor::default());
        };
        // BTreeMap::range panics on inverted or empty-exclusive bounds
        if range.validate().is_err() || range.is_degenerate() {
            return Box::new(VecCursor::default());
        }
        let mut pres = Vec::new();
        for map in [&values.short, &values.long] {
            for (_, list) in map.range::<[u8], _>((range.lower(), range.upper())) {
                pres.extend_from_slice(list);
            }
        }
        Box::new(VecCursor::new(pres))
    }
}
