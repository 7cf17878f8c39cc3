//! Name Interning Pool
//!
//! Element, attribute and processing instruction names are stored once and
//! referenced by id from the node table. Id 0 means "no name".

use std::collections::HashMap;

/// Interned name storage
#[derive(Debug, Clone)]
pub struct NamePool {
    /// Names indexed by id
    entries: Vec<Box<[u8]>>,
    /// Name -> id lookup
    lookup: HashMap<Box<[u8]>, u32>,
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new()
    }
}

impl NamePool {
    /// Create a new pool holding only the reserved empty entry
    pub fn new() -> Self {
        NamePool {
            entries: vec![Box::default()],
            lookup: HashMap::new(),
        }
    }

    /// Intern a name and return its id
    pub fn intern(&mut self, name: &[u8]) -> u32 {
        if name.is_empty() {
            return 0;
        }
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(name.into());
        self.lookup.insert(name.into(), id);
        id
    }

    /// Resolve an id; the reserved id and unknown ids resolve to `None`
    #[inline]
    pub fn get(&self, id: u32) -> Option<&[u8]> {
        if id == 0 {
            return None;
        }
        self.entries.get(id as usize).map(|name| name.as_ref())
    }

    /// Number of interned names, excluding the reserved entry
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
