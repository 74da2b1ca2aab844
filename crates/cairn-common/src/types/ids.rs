//! Core identifier types for cairn.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing a page identifier from being confused with a frame index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page identifier - uniquely identifies a page in the backing store.
///
/// Page identifiers are handed out by a monotonic allocator and are never
/// reused once a page is deleted.
///
/// # Example
///
/// ```rust
/// use cairn_common::types::PageId;
///
/// let page = PageId::new(42);
/// assert_eq!(page.as_u64(), 42);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageId(u64);

impl PageId {
    /// Invalid page ID constant, used as a sentinel value.
    pub const INVALID: Self = Self(u64::MAX);

    /// First page ID handed out by an allocator.
    pub const FIRST: Self = Self(0);

    /// Creates a new `PageId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next page ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid page ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Byte offset of this page in a store of `page_size`-byte pages.
    ///
    /// Returns `None` if the offset does not fit in a `u64`.
    #[inline]
    #[must_use]
    pub const fn byte_offset(self, page_size: usize) -> Option<u64> {
        self.0.checked_mul(page_size as u64)
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "PageId(INVALID)")
        } else {
            write!(f, "PageId({})", self.0)
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<PageId> for u64 {
    #[inline]
    fn from(id: PageId) -> Self {
        id.0
    }
}
