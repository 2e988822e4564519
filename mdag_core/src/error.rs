//! Error types for mdag_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using mdag_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or storing a DAG.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The store rejected or failed a write.
    #[error("Store write failed for {key}: {source}")]
    StoreWrite {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// A write targeted a key that already holds different content.
    #[error("Key conflict: {key} already holds different content")]
    KeyConflict { key: String },

    /// Stored object file is corrupted or invalid.
    #[error("Corrupted object at {path}: {reason}")]
    CorruptedObject { path: PathBuf, reason: String },

    /// Serialized object bytes could not be decoded.
    #[error("Invalid object: {reason}")]
    InvalidObject { reason: String },

    /// Invalid digest format or encoding.
    #[error("Invalid digest: {reason}")]
    InvalidDigest { reason: String },

    /// Store is invalid or not initialized.
    #[error("Invalid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    /// Chunker or store configuration is invalid.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Invalid directory entry.
    #[error("Invalid tree entry: {reason}")]
    InvalidTreeEntry { reason: String },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Path is neither a regular file nor a directory.
    #[error("Unsupported file type: {path}")]
    UnsupportedFileType { path: PathBuf },

    /// Compression or decompression failed.
    #[error("Compression error: {reason}")]
    Compression { reason: String },
}

impl Error {
    /// Create a StoreWrite error wrapping the backend failure.
    pub fn store_write(key: impl Into<String>, source: Error) -> Self {
        Error::StoreWrite {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Create a KeyConflict error.
    pub fn key_conflict(key: impl Into<String>) -> Self {
        Error::KeyConflict { key: key.into() }
    }

    /// Create a CorruptedObject error.
    pub fn corrupted_object(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptedObject {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidObject error.
    pub fn invalid_object(reason: impl Into<String>) -> Self {
        Error::InvalidObject {
            reason: reason.into(),
        }
    }

    /// Create an InvalidDigest error.
    pub fn invalid_digest(reason: impl Into<String>) -> Self {
        Error::InvalidDigest {
            reason: reason.into(),
        }
    }

    /// Create an InvalidStore error.
    pub fn invalid_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an InvalidTreeEntry error.
    pub fn invalid_tree_entry(reason: impl Into<String>) -> Self {
        Error::InvalidTreeEntry {
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create an UnsupportedFileType error.
    pub fn unsupported_file_type(path: impl Into<PathBuf>) -> Self {
        Error::UnsupportedFileType { path: path.into() }
    }

    /// Create a Compression error.
    pub fn compression_error(reason: impl Into<String>) -> Self {
        Error::Compression {
            reason: reason.into(),
        }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_store_write_keeps_source() {
        let err = Error::store_write("abcd", Error::compression_error("disk full"));
        assert!(err.to_string().contains("abcd"));
        let source = err.source().expect("source should be set");
        assert!(source.to_string().contains("disk full"));
    }

    #[test]
    fn test_key_conflict_message() {
        let err = Error::key_conflict("abcd");
        assert_eq!(
            err.to_string(),
            "Key conflict: abcd already holds different content"
        );
    }

    #[test]
    fn test_io_from() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io { .. }));
    }
}
