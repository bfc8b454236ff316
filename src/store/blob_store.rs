//! Directory-sharded blob store
//!
//! Writes go to a uniquely named file under `temp/`, are hashed on the way
//! in, and are published with a single rename to
//! `<root>/<hh>/<hh>/<hh>/<hash>/blob`. The rename is the only step that
//! changes what readers can see, so a blob is either fully present at its
//! final path or absent.

use crate::config::StoreConfig;
use crate::index::{RedbIndex, SecondaryIndex};
use crate::model::{ContentHash, HashingWriter};
use crate::store::handle::Handle;
use crate::store::layout::{self, Layout};
use crate::store::staging::StagedFile;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A content-addressed blob store rooted at one directory
///
/// All operations block on disk I/O. The store is `Send + Sync`; share it
/// between threads by reference or behind an `Arc`.
pub struct BlobStore {
    layout: Layout,
    config: StoreConfig,
    index: Box<dyn SecondaryIndex>,
}

impl BlobStore {
    /// Open (or initialize) the store at `root` with default settings
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(root, StoreConfig::default())
    }

    /// Open (or initialize) the store at `root`.
    ///
    /// Creates `root` with owner-only permissions when it is missing and
    /// opens the secondary index under `root/index/`.
    pub fn open_with_config(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let root = root.as_ref();
        prepare_root(root, config.dir_mode)?;

        let layout = Layout::new(root);
        layout::create_dir_all(&layout.index_dir(), config.dir_mode)?;
        let index = RedbIndex::open(layout.index_path())?;

        Self::with_index(root, config, index)
    }

    /// Open the store at `root` with a caller-supplied secondary index
    pub fn with_index(
        root: impl AsRef<Path>,
        config: StoreConfig,
        index: impl SecondaryIndex + 'static,
    ) -> Result<Self> {
        let root = root.as_ref();
        prepare_root(root, config.dir_mode)?;

        tracing::debug!(root = %root.display(), "opened blob store");
        Ok(BlobStore {
            layout: Layout::new(root),
            config,
            index: Box::new(index),
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Settings the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Final on-disk location of the blob for `hash`
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.layout.blob_path(hash)
    }

    // === Writes ===

    /// Stream `reader` to the store and return a handle to the stored blob.
    ///
    /// Storing bytes that are already present is harmless: the new copy is
    /// renamed over the old one, and both are identical.
    pub fn put(&self, mut reader: impl Read) -> Result<Handle<'_>> {
        let mut staged = self.create_empty_file()?;

        let mut writer = HashingWriter::new(staged.as_file_mut());
        if let Err(e) = io::copy(&mut reader, &mut writer) {
            tracing::warn!(error = %e, "put aborted, discarding staged file");
            return Err(e.into());
        }
        let (hash, file) = writer.finalize();
        file.flush()?;

        self.publish(staged, hash)
    }

    /// Create an empty staged file for the caller to write into.
    ///
    /// Hand it to [`put_file`](Self::put_file) when done. Dropping it
    /// instead discards the bytes.
    pub fn create_empty_file(&self) -> Result<StagedFile> {
        let temp_dir = self.layout.temp_dir();
        layout::create_dir_all(&temp_dir, self.config.dir_mode)?;
        Ok(StagedFile::create_in(&temp_dir)?)
    }

    /// Finalize a staged file written by the caller.
    ///
    /// The content is re-read from the start to compute its hash, so the
    /// file position left by the caller does not matter.
    pub fn put_file(&self, mut staged: StagedFile) -> Result<Handle<'_>> {
        staged.flush()?;
        staged.seek(SeekFrom::Start(0))?;
        let hash = ContentHash::digest_reader(&mut staged)?;

        self.publish(staged, hash)
    }

    /// Sync, then rename a fully written staged file to its sharded path
    fn publish(&self, staged: StagedFile, hash: ContentHash) -> Result<Handle<'_>> {
        if self.config.sync_writes {
            staged.as_file().sync_all()?;
        }

        let dir = self.layout.blob_dir(&hash);
        layout::create_dir_all(&dir, self.config.dir_mode)?;

        let path = dir.join(layout::BLOB_FILE_NAME);
        // On failure the temp file comes back inside the error and is removed on drop
        staged
            .into_inner()
            .persist(&path)
            .map_err(|e| Error::Io(e.error))?;

        let size = fs::metadata(&path)
            .map_err(|e| Error::from_io_with(e, hash.to_hex()))?
            .len();

        tracing::debug!(hash = %hash, size, "stored blob");
        Ok(Handle::new(self, hash, size))
    }

    // === Reads ===

    /// Resolve `hash` to a handle.
    ///
    /// Fails with [`Error::NotFound`] when no blob is stored under it. No
    /// file descriptor is kept open.
    pub fn get(&self, hash: &ContentHash) -> Result<Handle<'_>> {
        let path = self.layout.blob_path(hash);

        let meta = fs::metadata(&path).map_err(|e| Error::from_io_with(e, hash.to_hex()))?;
        if !meta.is_file() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        // Readability check only
        File::open(&path).map_err(|e| Error::from_io_with(e, hash.to_hex()))?;

        tracing::debug!(hash = %hash, size = meta.len(), "resolved blob");
        Ok(Handle::new(self, *hash, meta.len()))
    }

    /// Check if a blob is stored under `hash`
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.layout.blob_path(hash).is_file()
    }

    /// Remove the blob for `hash`. Deleting a missing blob is not an error.
    ///
    /// Secondary ids pointing at the blob are left in place and will fail
    /// to resolve afterwards.
    pub fn delete(&self, hash: &ContentHash) -> Result<()> {
        match fs::remove_dir_all(self.layout.blob_dir(hash)) {
            Ok(()) => {
                tracing::debug!(hash = %hash, "deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // === Secondary ids ===

    /// Register `id` as another name for the blob behind `handle`.
    ///
    /// An id that is already registered is repointed.
    pub fn add_secondary_id(&self, handle: &Handle<'_>, id: &str) -> Result<()> {
        self.index.set(id, handle.hash())
    }

    /// Resolve a secondary id.
    ///
    /// `Ok(None)` means the id was never registered. A registered id whose
    /// blob has since been deleted fails with [`Error::NotFound`].
    pub fn find_by_secondary_id(&self, id: &str) -> Result<Option<Handle<'_>>> {
        match self.index.get(id)? {
            Some(hash) => self.get(&hash).map(Some),
            None => Ok(None),
        }
    }

    /// Hash a secondary id points at, without touching the blob
    pub fn secondary_id_target(&self, id: &str) -> Result<Option<ContentHash>> {
        self.index.get(id)
    }

    /// Forget a secondary id; returns whether it was registered
    pub fn remove_secondary_id(&self, id: &str) -> Result<bool> {
        self.index.remove(id)
    }

    /// Forget `id` only while it still names the blob behind `handle`
    pub fn remove_secondary_id_for(&self, handle: &Handle<'_>, id: &str) -> Result<bool> {
        self.index.remove_if(id, handle.hash())
    }
}

/// Make sure `root` is a directory, creating it if it does not exist
fn prepare_root(root: &Path, mode: u32) -> Result<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::InvalidArgument(format!(
            "{} exists and is not a directory",
            root.display()
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            layout::create_dir_all(root, mode)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
