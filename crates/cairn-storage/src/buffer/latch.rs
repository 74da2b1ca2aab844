//! Page guards for latched access to pooled pages.
//!
//! A guard owns one pin and one latch on a page. Dropping it releases the
//! latch first and then the pin, reporting the page dirty if it was
//! written through the guard.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use cairn_common::types::PageId;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::{BufferFrame, FrameId};
use super::pool::BufferPoolManager;

/// Shared access to a pinned page.
///
/// This guard:
/// - Holds the page's read latch
/// - Keeps the frame pinned while held
/// - Unlatches and unpins when dropped
pub struct PageReadGuard<'a> {
    pool: &'a BufferPoolManager,
    frame: Arc<BufferFrame>,
    page_id: PageId,
}

impl<'a> PageReadGuard<'a> {
    /// Wraps a frame that is already pinned and read-latched.
    pub(crate) fn new(pool: &'a BufferPoolManager, frame: Arc<BufferFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame,
            page_id,
        }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Returns a reference to the page data.
    #[inline]
    pub fn data(&self) -> impl Deref<Target = [u8]> + '_ {
        PageDataRef {
            guard: self.frame.read_data(),
        }
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.frame.unlatch_shared();
        if let Err(e) = self.pool.unpin_page(self.page_id, false) {
            tracing::error!(page_id = %self.page_id, error = %e, "read guard failed to unpin");
        }
    }
}

impl std::fmt::Debug for PageReadGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageReadGuard")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .finish()
    }
}

/// Exclusive access to a pinned page.
///
/// Writing through [`data_mut`](Self::data_mut) reports the page dirty
/// when the guard is dropped.
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPoolManager,
    frame: Arc<BufferFrame>,
    page_id: PageId,
    /// Set once the page is written through this guard.
    modified: bool,
}

impl<'a> PageWriteGuard<'a> {
    /// Wraps a frame that is already pinned and write-latched.
    pub(crate) fn new(pool: &'a BufferPoolManager, frame: Arc<BufferFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame,
            page_id,
            modified: false,
        }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Returns a reference to the page data.
    #[inline]
    pub fn data(&self) -> impl Deref<Target = [u8]> + '_ {
        PageDataRef {
            guard: self.frame.read_data(),
        }
    }

    /// Returns a mutable reference to the page data.
    ///
    /// This marks the page as modified.
    #[inline]
    pub fn data_mut(&mut self) -> impl DerefMut<Target = [u8]> + '_ {
        self.modified = true;
        PageDataMut {
            guard: self.frame.write_data(),
        }
    }

    /// Marks the page as modified without touching its bytes.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.modified = true;
    }

    /// Returns true if the page was modified through this guard.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.frame.unlatch_exclusive();
        if let Err(e) = self.pool.unpin_page(self.page_id, self.modified) {
            tracing::error!(page_id = %self.page_id, error = %e, "write guard failed to unpin");
        }
    }
}

impl std::fmt::Debug for PageWriteGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWriteGuard")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .field("modified", &self.modified)
            .finish()
    }
}

struct PageDataRef<'a> {
    guard: RwLockReadGuard<'a, Vec<u8>>,
}

impl Deref for PageDataRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

struct PageDataMut<'a> {
    guard: RwLockWriteGuard<'a, Vec<u8>>,
}

impl Deref for PageDataMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for PageDataMut<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
