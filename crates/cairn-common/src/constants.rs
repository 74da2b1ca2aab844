//! System-wide constants for cairn.
//!
//! Defaults used when a buffer pool is built without an explicit
//! configuration.

// =============================================================================
// Page Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the typical OS page size and SSD block size.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Minimum page size in bytes.
pub const MIN_PAGE_SIZE: usize = 512;

/// Maximum page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in a buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default history depth `k` for the LRU-K replacer.
pub const DEFAULT_REPLACER_K: usize = 2;

/// Default number of entries a page table bucket holds before it splits.
pub const DEFAULT_BUCKET_CAPACITY: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_constants() {
        assert!(DEFAULT_PAGE_SIZE.is_power_of_two());
        assert!(MIN_PAGE_SIZE.is_power_of_two());
        assert!(MAX_PAGE_SIZE.is_power_of_two());
        assert!(MIN_PAGE_SIZE <= DEFAULT_PAGE_SIZE && DEFAULT_PAGE_SIZE <= MAX_PAGE_SIZE);
    }

    #[test]
    fn test_buffer_pool_constants() {
        assert!(DEFAULT_POOL_SIZE > 0);
        assert!(DEFAULT_REPLACER_K >= 1);
        assert!(DEFAULT_BUCKET_CAPACITY >= 1);
    }
}
