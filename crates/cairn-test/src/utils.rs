//! Fixtures shared by the integration tests.

use std::path::PathBuf;
use std::sync::{Arc, Once};

use cairn_common::types::PageId;
use cairn_storage::buffer::{BufferPoolConfig, BufferPoolManager};
use cairn_storage::disk::{FileDiskManager, MemoryDiskManager};
use tempfile::TempDir;

/// Page size used by the fixtures.
pub const TEST_PAGE_SIZE: usize = 512;

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Pool over a fresh in-memory store.
pub fn memory_pool(num_frames: usize) -> (BufferPoolManager, Arc<MemoryDiskManager>) {
    init_tracing();
    let disk = Arc::new(MemoryDiskManager::new(TEST_PAGE_SIZE));
    let config = BufferPoolConfig::new(num_frames).with_page_size(TEST_PAGE_SIZE);
    let pool = BufferPoolManager::new(config, disk.clone()).expect("valid pool config");
    (pool, disk)
}

/// A data file in its own temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct TempDataFile {
    dir: TempDir,
}

impl TempDataFile {
    /// Creates an empty temporary directory for the data file.
    pub fn new() -> Self {
        init_tracing();
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Path of the data file.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("cairn.db")
    }

    /// Opens a pool over the data file, creating it if needed.
    pub fn open_pool(&self, num_frames: usize) -> BufferPoolManager {
        let disk = FileDiskManager::open(self.path(), TEST_PAGE_SIZE).expect("open data file");
        let config = BufferPoolConfig::new(num_frames).with_page_size(TEST_PAGE_SIZE);
        BufferPoolManager::new(config, Arc::new(disk)).expect("valid pool config")
    }
}

impl Default for TempDataFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Fills a page image with a pattern derived from the page ID and a version.
pub fn page_pattern(page_id: PageId, version: u8) -> Vec<u8> {
    let seed = page_id.as_u64().to_le_bytes();
    (0..TEST_PAGE_SIZE)
        .map(|i| seed[i % seed.len()] ^ version.wrapping_add(i as u8))
        .collect()
}
