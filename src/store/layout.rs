//! On-disk layout of a store root
//!
//! ```text
//! <root>/
//!   temp/                              staging area for in-flight writes
//!   <hh>/<hh>/<hh>/<hash64>/blob       blob content
//!   index/secondary.redb               secondary-index database
//! ```
//!
//! The shard directories are successive two-char slices of the hash, so each
//! level has at most 256 children. The last directory is the full hash, not
//! the remaining suffix.

use crate::model::ContentHash;
use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

/// Number of two-char shard levels above the per-hash directory
pub const NESTING_LEVELS: usize = 3;

/// File name of the content inside a per-hash directory
pub const BLOB_FILE_NAME: &str = "blob";

/// Staging directory for temp files
pub const TEMP_DIR_NAME: &str = "temp";

/// Directory holding the secondary-index database
pub const INDEX_DIR_NAME: &str = "index";

/// Secondary-index database file inside [`INDEX_DIR_NAME`]
pub const INDEX_FILE_NAME: &str = "secondary.redb";

/// Path arithmetic for a store rooted at one directory
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Layout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<h[0:2]>/<h[2:4]>/<h[4:6]>/<h>`
    pub fn blob_dir(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.to_hex();
        let mut path = self.root.clone();
        for level in 0..NESTING_LEVELS {
            path.push(&hex[level * 2..level * 2 + 2]);
        }
        path.push(&hex);
        path
    }

    /// `<root>/<h[0:2]>/<h[2:4]>/<h[4:6]>/<h>/blob`
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.blob_dir(hash).join(BLOB_FILE_NAME)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR_NAME)
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR_NAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_dir().join(INDEX_FILE_NAME)
    }
}

/// `mkdir -p` with the given mode on every directory it creates.
///
/// Succeeds when the directory already exists, including when another
/// thread creates it concurrently.
pub(crate) fn create_dir_all(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path)
}
