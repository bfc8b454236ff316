//! Secondary index backed by a redb database file
//!
//! A single table maps the id to the 64-char hex hash. Every write commits
//! with `Durability::Immediate`, so a successful return survives a crash.

use super::SecondaryIndex;
use crate::error::index_err;
use crate::model::ContentHash;
use crate::{Error, Result};
use redb::{Database, Durability, ReadableTable, TableDefinition};
use std::path::Path;

const SECONDARY: TableDefinition<&str, &str> = TableDefinition::new("secondary");

/// Durable index stored in one redb file
pub struct RedbIndex {
    db: Database,
}

impl RedbIndex {
    /// Open the database at `path`, creating it (and its table) if needed.
    ///
    /// The parent directory must already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(index_err)?;

        // Create the table up front so readers never see TableDoesNotExist
        let mut txn = db.begin_write().map_err(index_err)?;
        txn.set_durability(Durability::Immediate);
        txn.open_table(SECONDARY).map_err(index_err)?;
        txn.commit().map_err(index_err)?;

        Ok(RedbIndex { db })
    }
}

impl SecondaryIndex for RedbIndex {
    fn get(&self, id: &str) -> Result<Option<ContentHash>> {
        let txn = self.db.begin_read().map_err(index_err)?;
        let table = txn.open_table(SECONDARY).map_err(index_err)?;

        let Some(value) = table.get(id).map_err(index_err)? else {
            return Ok(None);
        };
        let hash = ContentHash::from_hex(value.value()).map_err(|_| {
            Error::Corruption(format!("secondary id {:?} maps to {:?}", id, value.value()))
        })?;
        Ok(Some(hash))
    }

    fn set(&self, id: &str, hash: &ContentHash) -> Result<()> {
        let hex = hash.to_hex();

        let mut txn = self.db.begin_write().map_err(index_err)?;
        txn.set_durability(Durability::Immediate);
        {
            let mut table = txn.open_table(SECONDARY).map_err(index_err)?;
            table.insert(id, hex.as_str()).map_err(index_err)?;
        }
        txn.commit().map_err(index_err)?;

        tracing::debug!(id, hash = %hash, "secondary id set");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let mut txn = self.db.begin_write().map_err(index_err)?;
        txn.set_durability(Durability::Immediate);
        let existed = {
            let mut table = txn.open_table(SECONDARY).map_err(index_err)?;
            let removed = table.remove(id).map_err(index_err)?;
            removed.is_some()
        };
        txn.commit().map_err(index_err)?;

        tracing::debug!(id, existed, "secondary id removed");
        Ok(existed)
    }

    fn remove_if(&self, id: &str, hash: &ContentHash) -> Result<bool> {
        let hex = hash.to_hex();

        let mut txn = self.db.begin_write().map_err(index_err)?;
        txn.set_durability(Durability::Immediate);
        let removed = {
            let mut table = txn.open_table(SECONDARY).map_err(index_err)?;
            let matches = match table.get(id).map_err(index_err)? {
                Some(current) => current.value() == hex,
                None => false,
            };
            if matches {
                table.remove(id).map_err(index_err)?;
            }
            matches
        };
        // Nothing to persist on a mismatch
        if removed {
            txn.commit().map_err(index_err)?;
        } else {
            txn.abort().map_err(index_err)?;
        }

        tracing::debug!(id, hash = %hash, removed, "conditional secondary id remove");
        Ok(removed)
    }
}
