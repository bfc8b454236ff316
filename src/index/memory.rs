//! In-memory secondary index for testing and embedding

use super::SecondaryIndex;
use crate::model::ContentHash;
use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A `HashMap`-backed index. Nothing survives the process.
#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<HashMap<String, ContentHash>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered ids
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SecondaryIndex for MemoryIndex {
    fn get(&self, id: &str) -> Result<Option<ContentHash>> {
        Ok(self.entries.read().get(id).copied())
    }

    fn set(&self, id: &str, hash: &ContentHash) -> Result<()> {
        self.entries.write().insert(id.to_string(), *hash);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.entries.write().remove(id).is_some())
    }

    fn remove_if(&self, id: &str, hash: &ContentHash) -> Result<bool> {
        let mut entries = self.entries.write();
        if entries.get(id) != Some(hash) {
            return Ok(false);
        }
        entries.remove(id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let index = MemoryIndex::new();
        let hash = ContentHash::digest(b"a");

        assert_eq!(index.get("name").unwrap(), None);
        index.set("name", &hash).unwrap();
        assert_eq!(index.get("name").unwrap(), Some(hash));
        assert_eq!(index.len(), 1);

        assert!(index.remove("name").unwrap());
        assert!(!index.remove("name").unwrap());
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_if_checks_target() {
        let index = MemoryIndex::new();
        let a = ContentHash::digest(b"a");
        let b = ContentHash::digest(b"b");

        index.set("name", &b).unwrap();
        assert!(!index.remove_if("name", &a).unwrap());
        assert_eq!(index.get("name").unwrap(), Some(b));

        assert!(index.remove_if("name", &b).unwrap());
        assert!(!index.remove_if("name", &b).unwrap());
    }
}
