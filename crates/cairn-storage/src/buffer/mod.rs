//! Buffer pool manager.
//!
//! The buffer pool keeps a fixed number of page frames in memory and
//! mediates every page access for the layers above it:
//!
//! - **Page Table**: Extendible hash from resident page IDs to frames
//! - **Pin/Unpin**: Reference counting so in-use pages stay put
//! - **Dirty Tracking**: Modified pages are written back before reuse
//! - **Eviction Policy**: LRU-K over unpinned frames
//! - **Latches**: Per-page reader/writer latches for callers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     BufferPoolManager                           │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                       Page Table                          │  │
//! │  │          ExtendibleHashTable<PageId, FrameId>             │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                              │                                  │
//! │                              ▼                                  │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                       Frame Array                         │  │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐     ┌─────────┐      │  │
//! │  │  │ Frame 0 │ │ Frame 1 │ │ Frame 2 │ ... │ Frame N │      │  │
//! │  │  │ page_id │ │ page_id │ │ page_id │     │ page_id │      │  │
//! │  │  │ data[]  │ │ data[]  │ │ data[]  │     │ data[]  │      │  │
//! │  │  │ dirty   │ │ dirty   │ │ dirty   │     │ dirty   │      │  │
//! │  │  │ pin_cnt │ │ pin_cnt │ │ pin_cnt │     │ pin_cnt │      │  │
//! │  │  │ latch   │ │ latch   │ │ latch   │     │ latch   │      │  │
//! │  │  └─────────┘ └─────────┘ └─────────┘     └─────────┘      │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │               │                               │                 │
//! │               ▼                               ▼                 │
//! │  ┌────────────────────────┐      ┌────────────────────────────┐ │
//! │  │     LRU-K Replacer     │      │        DiskManager         │ │
//! │  │ (eviction candidates)  │      │   (read/write whole pages) │ │
//! │  └────────────────────────┘      └────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use cairn_storage::buffer::{BufferPoolConfig, BufferPoolManager};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = BufferPoolManager::in_memory(BufferPoolConfig::new(16))?;
//!
//!     // Allocate a page and write to it
//!     let page_id = {
//!         let mut guard = pool.new_page_guarded()?;
//!         guard.data_mut()[..5].copy_from_slice(b"hello");
//!         guard.page_id()
//!     };
//!
//!     // Read it back; the guard unlatches and unpins on drop
//!     let guard = pool.fetch_page_read(page_id)?;
//!     assert_eq!(&guard.data()[..5], b"hello");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

mod config;
mod error;
mod frame;
mod latch;
mod pool;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{BufferFrame, FrameId};
pub use latch::{PageReadGuard, PageWriteGuard};
pub use pool::BufferPoolManager;
pub use replacer::LruKReplacer;

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (required disk read).
    pub misses: u64,
    /// Number of pages evicted.
    pub evictions: u64,
    /// Number of pages written to disk.
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_hit_ratio() {
        let mut stats = BufferPoolStats::default();
        assert_eq!(stats.hit_ratio(), 0.0);

        stats.fetches = 100;
        stats.hits = 80;
        assert!((stats.hit_ratio() - 0.8).abs() < f64::EPSILON);
    }
}
