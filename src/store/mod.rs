//! Content-addressed blob store
//!
//! Blobs are stored as plain files under a directory tree sharded by their
//! SHA-256 hash, staged in `temp/` and published by atomic rename.

mod blob_store;
mod handle;
mod layout;
mod staging;

pub use blob_store::BlobStore;
pub use handle::Handle;
pub use layout::{Layout, BLOB_FILE_NAME, INDEX_DIR_NAME, NESTING_LEVELS, TEMP_DIR_NAME};
pub use staging::StagedFile;
