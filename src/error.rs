//! Error types for blobdb

use thiserror::Error;

/// Result type alias for blobdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blobdb operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index error: {0}")]
    Index(#[from] redb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for the routine "no such object" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Map an IO error, turning `ErrorKind::NotFound` into [`Error::NotFound`]
    pub(crate) fn from_io_with(err: std::io::Error, what: impl Into<String>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(what.into())
        } else {
            Error::Io(err)
        }
    }
}

/// Widen any of redb's per-operation error types into [`Error::Index`]
pub(crate) fn index_err(err: impl Into<redb::Error>) -> Error {
    Error::Index(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = Error::from_io_with(io::Error::from(io::ErrorKind::NotFound), "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Object not found: abc");
    }

    #[test]
    fn test_other_io_errors_pass_through() {
        let err = Error::from_io_with(io::Error::from(io::ErrorKind::PermissionDenied), "abc");
        assert!(!err.is_not_found());
        assert!(matches!(err, Error::Io(_)));
    }
}
