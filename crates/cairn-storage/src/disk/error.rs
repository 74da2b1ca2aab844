//! I/O error types for the disk module.

use std::io;
use std::path::PathBuf;

use cairn_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur while reading or writing pages.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum IoError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Caller buffer does not match the store's page size.
    #[error("page buffer has {actual} bytes, store uses {expected}-byte pages")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Short write (less data than expected).
    #[error("short {operation}: expected {expected} bytes, got {actual}")]
    ShortIo {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The sentinel page ID was passed to the store.
    #[error("invalid page ID: {page_id:?}")]
    InvalidPageId { page_id: PageId },

    /// The store refused a write (fault injection).
    #[error("write of page {page_id} rejected")]
    WriteRejected { page_id: PageId },
}

impl IoError {
    /// Creates a new NotFound error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a new PermissionDenied error.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }

    /// Creates a BufferSizeMismatch error.
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::BufferSizeMismatch { expected, actual }
    }

    /// Creates a ShortIo error for writes.
    pub fn short_write(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "write",
            expected,
            actual,
        }
    }

    /// Returns true if this is a retryable error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source } => {
                source.kind() == io::ErrorKind::Interrupted
                    || source.kind() == io::ErrorKind::WouldBlock
            }
            _ => false,
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Converts from std::io::Error with path context.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_creation() {
        let err = IoError::not_found("/tmp/test.db");
        assert!(err.is_not_found());

        let err = IoError::from_io_with_path(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "/tmp/test.db",
        );
        assert!(matches!(err, IoError::PermissionDenied { .. }));
    }

    #[test]
    fn test_io_error_from_std() {
        let std_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: IoError = std_err.into();
        assert!(matches!(err, IoError::Io { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_retryable() {
        let err: IoError = io::Error::new(io::ErrorKind::Interrupted, "eintr").into();
        assert!(err.is_retryable());

        let err = IoError::WriteRejected {
            page_id: PageId::new(1),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_size_mismatch_message() {
        let err = IoError::size_mismatch(4096, 100);
        assert_eq!(
            err.to_string(),
            "page buffer has 100 bytes, store uses 4096-byte pages"
        );
    }
}
