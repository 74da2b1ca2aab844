//! Backing store for the buffer pool.
//!
//! The buffer pool never touches files directly; it reads and writes whole
//! pages through the [`DiskManager`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           DiskManager Trait             │
//! │  (read_page, write_page, sync, ...)     │
//! └─────────────────────────────────────────┘
//!              │                   │
//!              ▼                   ▼
//! ┌─────────────────────┐  ┌─────────────────────┐
//! │   FileDiskManager   │  │  MemoryDiskManager  │
//! │   (one data file)   │  │  (tests, benches)   │
//! └─────────────────────┘  └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use cairn_common::types::PageId;
//! use cairn_storage::disk::{DiskManager, FileDiskManager};
//!
//! fn example() -> cairn_storage::disk::IoResult<()> {
//!     let disk = FileDiskManager::open("data.db", 4096)?;
//!
//!     let page = vec![7u8; 4096];
//!     disk.write_page(PageId::new(0), &page)?;
//!
//!     let mut buf = vec![0u8; 4096];
//!     disk.read_page(PageId::new(0), &mut buf)?;
//!     assert_eq!(buf, page);
//!
//!     disk.sync()
//! }
//! ```

mod error;
mod file;
mod memory;

use cairn_common::types::PageId;

pub use error::{IoError, IoResult};
pub use file::FileDiskManager;
pub use memory::MemoryDiskManager;

/// Synchronous, page-addressed storage.
///
/// Every call transfers exactly one page of `page_size()` bytes. Reading a
/// page that was never written yields zeroed bytes.
pub trait DiskManager: Send + Sync {
    /// Size in bytes of every page in this store.
    fn page_size(&self) -> usize;

    /// Reads the page into `buf`, which must be `page_size()` bytes long.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()>;

    /// Writes `buf`, which must be `page_size()` bytes long, as the page.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()>;

    /// One past the highest page ID the store holds data for.
    ///
    /// A pool opened over an existing store allocates new IDs from here.
    fn page_count(&self) -> IoResult<u64> {
        Ok(0)
    }

    /// Releases the storage behind a deleted page.
    ///
    /// Page IDs are never reused, so the default does nothing.
    fn deallocate_page(&self, _page_id: PageId) {}

    /// Forces written pages to durable storage.
    fn sync(&self) -> IoResult<()> {
        Ok(())
    }
}

/// Rejects the sentinel page ID and buffers of the wrong size.
pub(crate) fn check_request(page_id: PageId, page_size: usize, len: usize) -> IoResult<()> {
    if !page_id.is_valid() {
        return Err(IoError::InvalidPageId { page_id });
    }
    if len != page_size {
        return Err(IoError::size_mismatch(page_size, len));
    }
    Ok(())
}

/// Byte offset of a page, rejecting IDs whose offset overflows.
pub(crate) fn page_offset(page_id: PageId, page_size: usize) -> IoResult<u64> {
    page_id
        .byte_offset(page_size)
        .ok_or(IoError::InvalidPageId { page_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_request() {
        assert!(check_request(PageId::new(0), 4096, 4096).is_ok());
        assert!(matches!(
            check_request(PageId::INVALID, 4096, 4096),
            Err(IoError::InvalidPageId { .. })
        ));
        assert!(matches!(
            check_request(PageId::new(0), 4096, 512),
            Err(IoError::BufferSizeMismatch {
                expected: 4096,
                actual: 512
            })
        ));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(PageId::new(2), 512).unwrap(), 1024);
        assert!(matches!(
            page_offset(PageId::new(1 << 60), 4096),
            Err(IoError::InvalidPageId { .. })
        ));
    }
}
