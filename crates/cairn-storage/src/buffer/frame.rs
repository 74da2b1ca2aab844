//! Buffer frame - a slot in the buffer pool that holds a page.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use cairn_common::types::PageId;
use parking_lot::lock_api::RawRwLock as _;
use parking_lot::{RawRwLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Frame identifier - index into the buffer pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new frame ID.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A buffer frame holds a single page in memory.
///
/// Each frame has:
/// - A data buffer for the page contents
/// - Metadata (page_id, dirty flag, pin count)
/// - A reader/writer latch managed by callers
///
/// Metadata is atomic so callers can inspect it without the pool lock, but
/// it is only ever changed by the buffer pool while holding that lock.
///
/// The latch is separate from the lock around `data`: the data lock keeps
/// individual reads and writes sound, while the latch lets a caller hold a
/// page across several operations (for example latch crabbing down a tree).
pub struct BufferFrame {
    /// Frame ID (index in the frame array).
    frame_id: FrameId,
    /// Page data buffer.
    data: RwLock<Vec<u8>>,
    /// Page ID stored in this frame (INVALID if empty).
    page_id: AtomicU64,
    /// Pin count (number of active references).
    pin_count: AtomicU32,
    /// Whether the page is dirty (modified since last flush).
    dirty: AtomicBool,
    /// Caller-managed page latch.
    latch: RawRwLock,
}

impl BufferFrame {
    /// Creates a new empty buffer frame.
    pub fn new(frame_id: FrameId, page_size: usize) -> Self {
        Self {
            frame_id,
            data: RwLock::new(vec![0u8; page_size]),
            page_id: AtomicU64::new(PageId::INVALID.as_u64()),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            latch: RawRwLock::INIT,
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page ID stored in this frame.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.page_id.load(Ordering::Acquire))
    }

    /// Sets the page ID for this frame.
    #[inline]
    pub(crate) fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id.as_u64(), Ordering::Release);
    }

    /// Returns true if this frame is empty (no page assigned).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.page_id().is_valid()
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    ///
    /// The pool checks the count before calling this.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "unpinned frame with pin_count = 0");
        old - 1
    }

    /// Returns true if the frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Returns true if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Sets or clears the dirty flag.
    #[inline]
    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Returns a read lock on the page data.
    #[inline]
    pub fn read_data(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.data.read()
    }

    /// Returns a write lock on the page data.
    ///
    /// Writing does not mark the frame dirty; report it through
    /// `unpin_page(page_id, true)` or a write guard. The guard may be held
    /// across pool calls as long as the page stays pinned.
    #[inline]
    pub fn write_data(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write()
    }

    /// Copies data into the start of the frame.
    pub fn copy_from(&self, data: &[u8]) {
        let mut guard = self.data.write();
        guard[..data.len()].copy_from_slice(data);
    }

    /// Copies data out of the start of the frame.
    pub fn copy_to(&self, buf: &mut [u8]) {
        let guard = self.data.read();
        buf.copy_from_slice(&guard[..buf.len()]);
    }

    /// Resets the frame to empty state and zeroes its bytes.
    pub(crate) fn reset(&self) {
        self.page_id
            .store(PageId::INVALID.as_u64(), Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.data.write().fill(0);
    }

    // -------------------------------------------------------------------------
    // Caller latch
    // -------------------------------------------------------------------------

    /// Blocks until the shared latch is held.
    #[inline]
    pub fn latch_shared(&self) {
        self.latch.lock_shared();
    }

    /// Takes the shared latch if it is free of writers.
    #[inline]
    pub fn try_latch_shared(&self) -> bool {
        self.latch.try_lock_shared()
    }

    /// Releases one shared hold on the latch.
    ///
    /// # Panics
    ///
    /// Panics if the latch is not held.
    pub fn unlatch_shared(&self) {
        assert!(
            self.latch.is_locked() && !self.latch.is_locked_exclusive(),
            "frame {} read latch released while not held",
            self.frame_id
        );
        // SAFETY: the latch is held in shared mode (checked above) and guards
        // no memory, so releasing it can only affect the callers' protocol.
        unsafe { self.latch.unlock_shared() };
    }

    /// Blocks until the exclusive latch is held.
    #[inline]
    pub fn latch_exclusive(&self) {
        self.latch.lock_exclusive();
    }

    /// Takes the exclusive latch if nobody holds it.
    #[inline]
    pub fn try_latch_exclusive(&self) -> bool {
        self.latch.try_lock_exclusive()
    }

    /// Releases the exclusive latch.
    ///
    /// # Panics
    ///
    /// Panics if the latch is not held exclusively.
    pub fn unlatch_exclusive(&self) {
        assert!(
            self.latch.is_locked_exclusive(),
            "frame {} write latch released while not held",
            self.frame_id
        );
        // SAFETY: the latch is held exclusively (checked above) and guards
        // no memory.
        unsafe { self.latch.unlock_exclusive() };
    }

    /// Returns true if any caller holds the latch.
    #[inline]
    pub fn is_latched(&self) -> bool {
        self.latch.is_locked()
    }
}

impl fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .field("latched", &self.is_latched())
            .finish()
    }
}
