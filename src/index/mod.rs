//! Value Index Module
//!
//! Text and attribute value indexes used to answer exact and range lookups
//! without scanning the node table.
//!
//! ## Architecture
//!
//! ```text
//! ValueIndex (trait)
//! ├── MemValueIndex        # BTreeMap<value, sorted pres> per kind
//! └── lookup()/range()     # -> Box<dyn IndexCursor>
//!
//! IndexCursor (trait)      # more()/pre() pull protocol
//! ├── SliceCursor          # shared posting list, document order
//! ├── VecCursor            # collected range result, value order
//! └── ScanCursor           # full-table scan fallback, document order
//! ```

pub mod cursor;
pub mod token;
pub mod values;

pub use cursor::{IndexCursor, ScanCursor, SliceCursor, VecCursor};
pub use token::{IndexQuery, IndexToken, IndexType, StringRange};
pub use values::MemValueIndex;

/// Value index consumed by index access operators
pub trait ValueIndex {
    /// Check if the index for this kind of value exists
    fn enabled(&self, kind: IndexType) -> bool;

    /// Maximum byte length of indexed values
    fn max_len(&self) -> usize;

    /// Nodes whose value equals the token, in document order
    fn lookup(&self, token: &IndexToken) -> Box<dyn IndexCursor + Send>;

    /// Nodes whose value lies in the range
    fn range(&self, range: &StringRange) -> Box<dyn IndexCursor + Send>;

    /// Check if range cursors yield nodes in document order
    fn ordered_ranges(&self) -> bool {
        false
    }
}
