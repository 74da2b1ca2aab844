//! In-memory page store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cairn_common::types::PageId;
use parking_lot::Mutex;

use super::error::{IoError, IoResult};
use super::{check_request, DiskManager};

/// Page store that keeps every written page in a hash map.
///
/// Useful for tests and benchmarks: it counts transfers and can be told to
/// reject writes so that writeback failures can be exercised.
pub struct MemoryDiskManager {
    pages: Mutex<HashMap<PageId, Box<[u8]>>>,
    page_size: usize,
    num_reads: AtomicU64,
    num_writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryDiskManager {
    /// Creates an empty store of `page_size`-byte pages.
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            page_size,
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Number of pages read so far.
    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Number of pages written so far.
    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Returns true if the page has been written and not deallocated.
    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    /// Number of pages currently stored.
    pub fn num_pages(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns a copy of the stored page, if any.
    pub fn page_bytes(&self, page_id: PageId) -> Option<Vec<u8>> {
        self.pages.lock().get(&page_id).map(|p| p.to_vec())
    }
}

impl DiskManager for MemoryDiskManager {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()> {
        check_request(page_id, self.page_size, buf.len())?;
        match self.pages.lock().get(&page_id) {
            Some(page) => buf.copy_from_slice(page),
            None => buf.fill(0),
        }
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()> {
        check_request(page_id, self.page_size, buf.len())?;
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(IoError::WriteRejected { page_id });
        }
        self.pages.lock().insert(page_id, buf.into());
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn page_count(&self) -> IoResult<u64> {
        Ok(self
            .pages
            .lock()
            .keys()
            .map(|id| id.as_u64() + 1)
            .max()
            .unwrap_or(0))
    }

    fn deallocate_page(&self, page_id: PageId) {
        self.pages.lock().remove(&page_id);
    }
}

impl std::fmt::Debug for MemoryDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDiskManager")
            .field("page_size", &self.page_size)
            .field("num_pages", &self.num_pages())
            .field("num_reads", &self.num_reads())
            .field("num_writes", &self.num_writes())
            .finish()
    }
}
