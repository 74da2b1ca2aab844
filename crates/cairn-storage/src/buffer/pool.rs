//! Buffer pool implementation.
//!
//! The buffer pool manages a fixed-size cache of pages in memory,
//! handling page allocation, fetching, eviction, flushing and deletion.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cairn_common::types::PageId;
use parking_lot::Mutex;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{BufferFrame, FrameId};
use super::latch::{PageReadGuard, PageWriteGuard};
use super::replacer::LruKReplacer;
use super::BufferPoolStats;
use crate::disk::{DiskManager, MemoryDiskManager};
use crate::hash::ExtendibleHashTable;

/// State that only changes under the pool lock.
struct PoolState {
    /// Frames holding no page.
    free_list: VecDeque<FrameId>,
    /// Next page ID to hand out. Never reused.
    next_page_id: PageId,
}

/// The buffer pool manager mediates all page access for upper layers.
///
/// It provides:
/// - A page table (extendible hash) from resident page IDs to frames
/// - LRU-K victim selection among unpinned frames
/// - Pin counting so in-use pages are never evicted
/// - Write-back of dirty pages before their frame is reused
///
/// Every operation runs under one pool-wide mutex, including the write-back
/// of a dirty victim, so operations are atomic with respect to each other.
/// Explicit flushes are the exception: they pin the page and copy its bytes
/// outside the mutex, so holding a page's data lock while calling into the
/// pool cannot deadlock against them.
///
/// Frames come back as `Arc<BufferFrame>`. Every successful
/// [`new_page`](Self::new_page) or [`fetch_page`](Self::fetch_page) must be
/// paired with one [`unpin_page`](Self::unpin_page); the guard APIs do that
/// on drop.
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames.
    frames: Vec<Arc<BufferFrame>>,
    /// Page table: maps PageId -> FrameId.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    /// LRU-K replacer for eviction.
    replacer: LruKReplacer,
    /// Backing store.
    disk: Arc<dyn DiskManager>,
    /// The pool lock.
    state: Mutex<PoolState>,
    /// Fetch counter for statistics.
    fetch_count: AtomicU64,
    /// Hit counter for statistics.
    hit_count: AtomicU64,
    /// Miss counter for statistics.
    miss_count: AtomicU64,
    /// Eviction counter for statistics.
    eviction_count: AtomicU64,
    /// Flush counter for statistics.
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a new buffer pool over `disk`.
    ///
    /// Page IDs continue after the pages the store already holds.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskManager>) -> BufferResult<Self> {
        config.validate()?;
        if disk.page_size() != config.page_size {
            return Err(BufferError::config(format!(
                "disk page size {} does not match pool page size {}",
                disk.page_size(),
                config.page_size
            )));
        }

        let num_frames = config.num_frames;
        let page_size = config.page_size;

        // Create frame array
        let frames: Vec<Arc<BufferFrame>> = (0..num_frames)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), page_size)))
            .collect();

        // Initially, every frame is free.
        let free_list: VecDeque<FrameId> = (0..num_frames).map(FrameId::new).collect();
        let next_page_id = PageId::new(disk.page_count()?);

        tracing::debug!(
            num_frames,
            page_size,
            k = config.replacer_k,
            next_page_id = %next_page_id,
            "buffer pool created"
        );

        Ok(Self {
            page_table: ExtendibleHashTable::new(config.bucket_capacity),
            replacer: LruKReplacer::new(num_frames, config.replacer_k),
            config,
            frames,
            disk,
            state: Mutex::new(PoolState {
                free_list,
                next_page_id,
            }),
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Creates a buffer pool backed by a fresh in-memory store.
    pub fn in_memory(config: BufferPoolConfig) -> BufferResult<Self> {
        let disk = Arc::new(MemoryDiskManager::new(config.page_size));
        Self::new(config, disk)
    }

    /// Allocates a new zeroed page and returns it pinned once.
    ///
    /// Fails with [`BufferError::NoFreeFrames`] when every frame is pinned.
    pub fn new_page(&self) -> BufferResult<(PageId, Arc<BufferFrame>)> {
        let mut state = self.state.lock();

        let frame = self.acquire_frame(&mut state)?;
        let page_id = state.next_page_id;
        state.next_page_id = page_id.next();

        self.install(&frame, page_id);
        tracing::trace!(page_id = %page_id, frame_id = %frame.frame_id(), "new page");

        Ok((page_id, frame))
    }

    /// Fetches a page, reading it from disk if it is not resident, and pins it.
    ///
    /// Fails with [`BufferError::NoFreeFrames`] when the page is not resident
    /// and every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>> {
        check_page_id(page_id)?;
        let mut state = self.state.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        // Check if page is already in buffer pool
        if let Some(frame) = self.resident(page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            frame.pin();
            self.replacer.record_access(frame.frame_id());
            self.replacer.set_evictable(frame.frame_id(), false);
            tracing::trace!(page_id = %page_id, "page hit");
            return Ok(frame);
        }

        // Page not in cache, need to fetch from disk
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame = self.acquire_frame(&mut state)?;

        let read = {
            let mut data = frame.write_data();
            self.disk.read_page(page_id, &mut data)
        };
        if let Err(e) = read {
            frame.reset();
            state.free_list.push_back(frame.frame_id());
            return Err(e.into());
        }

        self.install(&frame, page_id);
        tracing::trace!(page_id = %page_id, frame_id = %frame.frame_id(), "page miss");

        Ok(frame)
    }

    /// Drops one pin on a page, marking it dirty if `is_dirty`.
    ///
    /// When the last pin goes the frame becomes an eviction candidate.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let _state = self.state.lock();

        let frame = self
            .resident(page_id)
            .ok_or(BufferError::PageNotFound { page_id })?;
        if !frame.is_pinned() {
            return Err(BufferError::NotPinned { page_id });
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        self.release_pin(&frame);

        Ok(())
    }

    /// Writes a resident page to disk, dirty or not, and clears its dirty flag.
    ///
    /// The page is pinned for the duration and its bytes are read after the
    /// pool lock is released, so a caller holding the page's data lock may
    /// keep calling into the pool. Writes made while the flush is running
    /// leave the page dirty.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        check_page_id(page_id)?;

        let frame = {
            let _state = self.state.lock();
            let frame = self
                .resident(page_id)
                .ok_or(BufferError::PageNotFound { page_id })?;
            frame.pin();
            self.replacer.set_evictable(frame.frame_id(), false);
            // Cleared before the copy: a writer that finishes after this
            // point reports the page dirty again on unpin.
            frame.set_dirty(false);
            frame
        };

        let written = {
            let data = frame.read_data();
            self.disk.write_page(page_id, &data)
        };

        let _state = self.state.lock();
        if written.is_err() {
            frame.set_dirty(true);
        }
        self.release_pin(&frame);
        written?;

        self.flush_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(page_id = %page_id, frame_id = %frame.frame_id(), "flushed page");
        Ok(())
    }

    /// Writes every resident page to disk. Nothing is evicted.
    ///
    /// Returns the number of pages written.
    pub fn flush_all_pages(&self) -> BufferResult<usize> {
        let resident: Vec<PageId> = {
            let _state = self.state.lock();
            self.frames
                .iter()
                .filter(|f| !f.is_empty())
                .map(|f| f.page_id())
                .collect()
        };

        let mut flushed = 0;
        for page_id in resident {
            match self.flush_page(page_id) {
                Ok(()) => flushed += 1,
                // Evicted or deleted since the scan; eviction wrote it back.
                Err(BufferError::PageNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(flushed, "flushed all pages");
        Ok(flushed)
    }

    /// Deletes a page from the pool and retires its ID.
    ///
    /// A dirty page is written out first. Fails with
    /// [`BufferError::PagePinned`] if anyone still holds a pin. Deleting a
    /// page that is not resident only retires the ID.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        check_page_id(page_id)?;
        let mut state = self.state.lock();

        let Some(frame) = self.resident(page_id) else {
            self.disk.deallocate_page(page_id);
            return Ok(());
        };

        let pin_count = frame.pin_count();
        if pin_count > 0 {
            return Err(BufferError::PagePinned { page_id, pin_count });
        }

        if frame.is_dirty() {
            self.write_back(&frame)?;
        }

        let frame_id = frame.frame_id();
        self.page_table.remove(&page_id);
        self.replacer.remove(frame_id)?;
        frame.reset();
        state.free_list.push_back(frame_id);
        self.disk.deallocate_page(page_id);

        tracing::debug!(page_id = %page_id, frame_id = %frame_id, "deleted page");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Caller latches
    // -------------------------------------------------------------------------

    /// Takes the shared latch of a resident page, blocking until available.
    ///
    /// The caller should hold a pin on the page. The pool lock is not held
    /// while waiting.
    pub fn acquire_read_latch(&self, page_id: PageId) -> BufferResult<()> {
        self.latched_frame(page_id)?.latch_shared();
        Ok(())
    }

    /// Releases a shared latch taken with [`acquire_read_latch`](Self::acquire_read_latch).
    pub fn release_read_latch(&self, page_id: PageId) -> BufferResult<()> {
        self.latched_frame(page_id)?.unlatch_shared();
        Ok(())
    }

    /// Takes the exclusive latch of a resident page, blocking until available.
    pub fn acquire_write_latch(&self, page_id: PageId) -> BufferResult<()> {
        self.latched_frame(page_id)?.latch_exclusive();
        Ok(())
    }

    /// Releases an exclusive latch taken with [`acquire_write_latch`](Self::acquire_write_latch).
    pub fn release_write_latch(&self, page_id: PageId) -> BufferResult<()> {
        self.latched_frame(page_id)?.unlatch_exclusive();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Guarded access
    // -------------------------------------------------------------------------

    /// Fetches a page pinned and read-latched; both are released on drop.
    pub fn fetch_page_read(&self, page_id: PageId) -> BufferResult<PageReadGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        frame.latch_shared();
        Ok(PageReadGuard::new(self, frame, page_id))
    }

    /// Fetches a page pinned and write-latched; both are released on drop.
    pub fn fetch_page_write(&self, page_id: PageId) -> BufferResult<PageWriteGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        frame.latch_exclusive();
        Ok(PageWriteGuard::new(self, frame, page_id))
    }

    /// Allocates a new page and returns it pinned and write-latched.
    pub fn new_page_guarded(&self) -> BufferResult<PageWriteGuard<'_>> {
        let (page_id, frame) = self.new_page()?;
        frame.latch_exclusive();
        Ok(PageWriteGuard::new(self, frame, page_id))
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Returns the number of frames in the buffer pool.
    pub fn pool_size(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Returns the backing store.
    pub fn disk(&self) -> &Arc<dyn DiskManager> {
        &self.disk
    }

    /// Returns true if a page is in the buffer pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(&page_id)
    }

    /// Pin count of a resident page.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let _state = self.state.lock();
        self.resident(page_id).map(|f| f.pin_count())
    }

    /// Dirty flag of a resident page.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let _state = self.state.lock();
        self.resident(page_id).map(|f| f.is_dirty())
    }

    /// Number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of frames the replacer may evict.
    pub fn evictable_count(&self) -> usize {
        self.replacer.size()
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;

        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers (callers hold the pool lock)
    // -------------------------------------------------------------------------

    /// Looks up the frame holding `page_id`.
    fn resident(&self, page_id: PageId) -> Option<Arc<BufferFrame>> {
        let frame_id = self.page_table.find(&page_id)?;
        let frame = &self.frames[frame_id.index()];
        assert_eq!(
            frame.page_id(),
            page_id,
            "page table maps {page_id} to frame {frame_id} holding another page"
        );
        Some(Arc::clone(frame))
    }

    /// Takes a frame from the free list, or evicts one.
    ///
    /// A dirty victim is written back before the replacer lets go of it, so
    /// if that fails the victim stays resident and evictable with its access
    /// history intact. The frame comes back empty and zeroed.
    fn acquire_frame(&self, state: &mut PoolState) -> BufferResult<Arc<BufferFrame>> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(Arc::clone(&self.frames[frame_id.index()]));
        }

        let frame_id = self.replacer.victim().ok_or(BufferError::NoFreeFrames)?;
        let frame = Arc::clone(&self.frames[frame_id.index()]);
        let old_page_id = frame.page_id();
        assert!(
            !frame.is_pinned(),
            "replacer chose pinned frame {frame_id} (page {old_page_id})"
        );

        if frame.is_dirty() {
            if let Err(e) = self.write_back(&frame) {
                tracing::warn!(
                    page_id = %old_page_id,
                    frame_id = %frame_id,
                    error = %e,
                    "write-back of eviction victim failed"
                );
                return Err(e);
            }
        }

        let evicted = self.replacer.evict();
        assert_eq!(evicted, Some(frame_id), "replacer victim changed under the pool lock");
        let removed = self.page_table.remove(&old_page_id);
        assert!(removed, "evicted frame {frame_id} had no page table entry");
        frame.reset();
        self.eviction_count.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(page_id = %old_page_id, frame_id = %frame_id, "evicted page");
        Ok(frame)
    }

    /// Maps `page_id` to an acquired frame and pins it once.
    fn install(&self, frame: &BufferFrame, page_id: PageId) {
        let frame_id = frame.frame_id();
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
    }

    /// Writes an unpinned frame's bytes to its page and clears the dirty flag.
    ///
    /// Only for frames nobody holds a pin on, so the data lock is free.
    fn write_back(&self, frame: &BufferFrame) -> BufferResult<()> {
        let page_id = frame.page_id();
        {
            let data = frame.read_data();
            self.disk.write_page(page_id, &data)?;
        }
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(page_id = %page_id, frame_id = %frame.frame_id(), "wrote page");
        Ok(())
    }

    /// Drops one pin, handing the frame to the replacer when it was the last.
    fn release_pin(&self, frame: &BufferFrame) {
        if frame.unpin() == 0 {
            self.replacer.set_evictable(frame.frame_id(), true);
        }
    }

    /// Frame for a latch call. The pool lock is released before returning.
    fn latched_frame(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>> {
        let _state = self.state.lock();
        self.resident(page_id)
            .ok_or(BufferError::PageNotFound { page_id })
    }
}

fn check_page_id(page_id: PageId) -> BufferResult<()> {
    if page_id.is_valid() {
        Ok(())
    } else {
        Err(BufferError::InvalidPageId { page_id })
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("num_frames", &self.config.num_frames)
            .field("page_size", &self.config.page_size)
            .field("pages_cached", &self.page_table.len())
            .field("stats", &self.stats())
            .finish()
    }
}
