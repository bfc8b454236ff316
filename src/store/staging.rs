//! Temp files in the `temp/` staging area
//!
//! Every write lands in a uniquely named file here first and only becomes
//! visible once renamed to its sharded path. A staged file that is dropped
//! without being finalized is removed; a crash leaves it behind.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Length of the random part of a temp file name
const TEMP_NAME_LEN: usize = 16;

/// Fresh temp file name from the thread-local CSPRNG
fn random_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_NAME_LEN)
        .map(char::from)
        .collect()
}

/// An open, writable temp file awaiting [`BlobStore::put_file`](crate::BlobStore::put_file)
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    /// Create an empty file with a random name inside `temp_dir`.
    ///
    /// Uses exclusive create, so a name clash is an error rather than a
    /// silent truncate of someone else's in-flight write.
    pub(crate) fn create_in(temp_dir: &Path) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(&random_name())
            .rand_bytes(0)
            .tempfile_in(temp_dir)?;
        Ok(StagedFile { file })
    }

    /// Current location in the staging area
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn as_file(&self) -> &File {
        self.file.as_file()
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        self.file.as_file_mut()
    }

    pub(crate) fn into_inner(self) -> NamedTempFile {
        self.file
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Read for StagedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for StagedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
