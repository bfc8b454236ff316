//! Secondary index trait definition

use crate::model::ContentHash;
use crate::Result;

/// Durable map from an arbitrary identifier to a content hash
///
/// Implementations can use:
/// - An embedded key-value store (see [`RedbIndex`](super::RedbIndex))
/// - A process-local map for tests (see [`MemoryIndex`](super::MemoryIndex))
///
/// Closing the index is dropping it.
pub trait SecondaryIndex: Send + Sync {
    /// Look up `id`; `Ok(None)` when it was never registered
    fn get(&self, id: &str) -> Result<Option<ContentHash>>;

    /// Map `id` to `hash`, replacing any previous mapping.
    ///
    /// Must not return before the write is on stable storage.
    fn set(&self, id: &str, hash: &ContentHash) -> Result<()>;

    /// Drop the mapping for `id`; returns whether it existed
    fn remove(&self, id: &str) -> Result<bool>;

    /// Drop the mapping for `id` only if it points at `hash`.
    ///
    /// The comparison and the delete are one atomic step, so a concurrent
    /// `set` to another hash is never undone.
    fn remove_if(&self, id: &str, hash: &ContentHash) -> Result<bool>;
}
