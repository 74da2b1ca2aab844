//! Buffer pool errors.

use cairn_common::types::PageId;
use thiserror::Error;

use super::frame::FrameId;
use crate::disk::IoError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// No free frame and no evictable frame: every frame is pinned.
    #[error("no free frames available, all pages are pinned")]
    NoFreeFrames,

    /// Page is not resident in the buffer pool.
    #[error("page {page_id} not found in buffer pool")]
    PageNotFound { page_id: PageId },

    /// The sentinel page ID was passed in.
    #[error("invalid page ID: {page_id:?}")]
    InvalidPageId { page_id: PageId },

    /// Page is pinned and cannot be deleted.
    #[error("page {page_id} is pinned ({pin_count} pins)")]
    PagePinned { page_id: PageId, pin_count: u32 },

    /// Page pin count is already zero (cannot unpin).
    #[error("page {page_id} is not pinned")]
    NotPinned { page_id: PageId },

    /// Replacer was asked to drop a frame that is still in use.
    #[error("frame {frame_id} is not evictable")]
    FrameNotEvictable { frame_id: FrameId },

    /// Backing store failure. The operation did not complete.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a page not found error.
    pub fn page_not_found(page_id: PageId) -> Self {
        Self::PageNotFound { page_id }
    }

    /// Returns true if this is a transient error that can be retried.
    ///
    /// Running out of frames clears up as soon as another caller unpins.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoFreeFrames)
    }

    /// Returns true if the backing store failed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<std::io::Error> for BufferError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BufferError::page_not_found(PageId::new(42));
        assert!(matches!(
            err,
            BufferError::PageNotFound {
                page_id
            } if page_id == PageId::new(42)
        ));
    }

    #[test]
    fn test_is_retryable() {
        assert!(BufferError::NoFreeFrames.is_retryable());
        assert!(!BufferError::page_not_found(PageId::new(1)).is_retryable());
    }

    #[test]
    fn test_is_fatal() {
        let err = BufferError::from(IoError::WriteRejected {
            page_id: PageId::new(1),
        });
        assert!(err.is_fatal());

        assert!(!BufferError::NoFreeFrames.is_fatal());
        assert!(!BufferError::NotPinned {
            page_id: PageId::new(1)
        }
        .is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = BufferError::PagePinned {
            page_id: PageId::new(3),
            pin_count: 2,
        };
        assert_eq!(err.to_string(), "page 3 is pinned (2 pins)");
    }
}
