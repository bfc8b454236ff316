//! # blobdb
//!
//! A content-addressed blob store.
//!
//! Byte streams are written once, named by the SHA-256 of their content, and
//! read back by that hash. Callers can also attach their own identifiers
//! (a file name, a URL, an external key) and resolve blobs through them.
//!
//! ## Core Concepts
//!
//! - **Blobs**: immutable files at `<root>/<hh>/<hh>/<hh>/<hash>/blob`
//! - **Handles**: a resolved hash plus size, borrowed from the store
//! - **Staged writes**: a temp file the caller fills before it is published
//! - **Secondary ids**: caller-chosen names mapped to a hash in a redb index
//!
//! ## Example
//!
//! ```no_run
//! use blobdb::BlobStore;
//!
//! # fn main() -> blobdb::Result<()> {
//! let store = BlobStore::open("blobs")?;
//! let handle = store.put(&b"The cat sat on the mat"[..])?;
//! handle.add_secondary_id("mat.txt")?;
//!
//! let found = store.find_by_secondary_id("mat.txt")?.expect("registered above");
//! assert_eq!(found.hash(), handle.hash());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod index;
pub mod model;
pub mod store;

mod error;

pub use config::{CliConfig, StoreConfig};
pub use error::{Error, Result};
pub use index::{MemoryIndex, RedbIndex, SecondaryIndex};
pub use model::ContentHash;
pub use store::{BlobStore, Handle, StagedFile};
