//! Secondary identifiers: caller-chosen strings that resolve to a content hash

mod memory;
mod redb_index;
mod traits;

pub use memory::MemoryIndex;
pub use redb_index::RedbIndex;
pub use traits::SecondaryIndex;
