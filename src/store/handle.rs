//! Handle - a resolved reference to a stored blob

use crate::model::ContentHash;
use crate::store::BlobStore;
use crate::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// A blob that was present when the handle was created.
///
/// Holds the hash, the size seen at that moment, and a borrow of the store.
/// No file stays open between calls; each [`open`](Self::open) opens the
/// blob afresh, so a concurrent [`BlobStore::delete`] can still make it fail
/// with [`Error::NotFound`].
#[derive(Clone, Copy)]
pub struct Handle<'a> {
    store: &'a BlobStore,
    hash: ContentHash,
    size: u64,
}

impl<'a> Handle<'a> {
    pub(crate) fn new(store: &'a BlobStore, hash: ContentHash, size: u64) -> Self {
        Handle { store, hash, size }
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Size in bytes when the handle was resolved
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> PathBuf {
        self.store.blob_path(&self.hash)
    }

    /// Open the blob for reading. The caller owns the returned file.
    pub fn open(&self) -> Result<File> {
        File::open(self.path()).map_err(|e| Error::from_io_with(e, self.hash.to_hex()))
    }

    /// Read the whole blob into memory
    pub fn read_to_vec(&self) -> Result<Vec<u8>> {
        let mut file = self.open()?;
        let mut data = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Re-hash the stored bytes and compare against the handle's hash
    pub fn verify(&self) -> Result<()> {
        let mut file = self.open()?;
        let actual = ContentHash::digest_reader(&mut file)?;
        if actual != self.hash {
            return Err(Error::Corruption(format!(
                "blob {} has content hashing to {}",
                self.hash, actual
            )));
        }
        Ok(())
    }

    /// Register `id` as another name for this blob
    pub fn add_secondary_id(&self, id: &str) -> Result<()> {
        self.store.add_secondary_id(self, id)
    }

    /// Remove `id` if it currently points at this blob.
    ///
    /// Returns `false` when the id is unknown or names a different blob.
    pub fn remove_secondary_id(&self, id: &str) -> Result<bool> {
        self.store.remove_secondary_id_for(self, id)
    }
}

impl fmt::Debug for Handle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("hash", &self.hash)
            .field("size", &self.size)
            .finish()
    }
}
