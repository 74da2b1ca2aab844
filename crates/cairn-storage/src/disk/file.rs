//! Single-file page store.
//!
//! Page `n` lives at byte offset `n * page_size`. The file grows as pages
//! are written; reads past the end of the file come back zeroed.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use cairn_common::types::PageId;
use parking_lot::Mutex;

use super::error::{IoError, IoResult};
use super::{check_request, page_offset, DiskManager};

/// Page store backed by one data file.
pub struct FileDiskManager {
    /// The data file, wrapped in a mutex so seek + transfer is atomic.
    file: Mutex<File>,
    /// The file path.
    path: PathBuf,
    /// Page size in bytes.
    page_size: usize,
    /// Number of completed page reads.
    num_reads: AtomicU64,
    /// Number of completed page writes.
    num_writes: AtomicU64,
}

impl FileDiskManager {
    /// Opens (creating if needed) the data file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| IoError::from_io_with_path(e, &path))?;

        tracing::debug!(path = %path.display(), page_size, "opened data file");

        Ok(Self {
            file: Mutex::new(file),
            path,
            page_size,
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages read so far.
    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Number of pages written so far.
    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Current file size in bytes.
    pub fn file_size(&self) -> IoResult<u64> {
        Ok(self.file.lock().metadata()?.len())
    }
}

impl DiskManager for FileDiskManager {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()> {
        check_request(page_id, self.page_size, buf.len())?;
        let offset = page_offset(page_id, self.page_size)?;

        let mut file = self.file.lock();
        let file_len = file.metadata()?.len();

        let mut read = 0;
        if offset < file_len {
            file.seek(SeekFrom::Start(offset))?;
            while read < buf.len() {
                let n = file.read(&mut buf[read..])?;
                if n == 0 {
                    break;
                }
                read += n;
            }
        }
        // Never-written tail of the page
        buf[read..].fill(0);
        drop(file);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()> {
        check_request(page_id, self.page_size, buf.len())?;
        let offset = page_offset(page_id, self.page_size)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut written = 0;
        while written < buf.len() {
            let n = file.write(&buf[written..])?;
            if n == 0 {
                return Err(IoError::short_write(buf.len(), written));
            }
            written += n;
        }
        file.flush()?;
        drop(file);

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn page_count(&self) -> IoResult<u64> {
        let page_size = self.page_size as u64;
        Ok(self.file_size()?.div_ceil(page_size))
    }

    fn sync(&self) -> IoResult<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("num_reads", &self.num_reads())
            .field("num_writes", &self.num_writes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("test.db"), 512).unwrap();

        let page = vec![0xABu8; 512];
        disk.write_page(PageId::new(3), &page).unwrap();

        let mut buf = vec![0u8; 512];
        disk.read_page(PageId::new(3), &mut buf).unwrap();
        assert_eq!(buf, page);

        assert_eq!(disk.num_writes(), 1);
        assert_eq!(disk.num_reads(), 1);
        assert_eq!(disk.file_size().unwrap(), 4 * 512);
        assert_eq!(disk.page_count().unwrap(), 4);
    }

    #[test]
    fn test_read_past_end_is_zeroed() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("test.db"), 512).unwrap();

        let mut buf = vec![0xFFu8; 512];
        disk.read_page(PageId::new(10), &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_hole_between_pages_is_zeroed() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("test.db"), 512).unwrap();

        disk.write_page(PageId::new(2), &vec![1u8; 512]).unwrap();

        let mut buf = vec![0xFFu8; 512];
        disk.read_page(PageId::new(1), &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let disk = FileDiskManager::open(&path, 512).unwrap();
            disk.write_page(PageId::new(0), &vec![9u8; 512]).unwrap();
            disk.sync().unwrap();
        }

        let disk = FileDiskManager::open(&path, 512).unwrap();
        let mut buf = vec![0u8; 512];
        disk.read_page(PageId::new(0), &mut buf).unwrap();
        assert_eq!(buf, vec![9u8; 512]);
    }

    #[test]
    fn test_rejects_bad_requests() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("test.db"), 512).unwrap();

        let mut small = vec![0u8; 100];
        assert!(disk.read_page(PageId::new(0), &mut small).is_err());
        assert!(disk.write_page(PageId::INVALID, &vec![0u8; 512]).is_err());
        assert_eq!(disk.num_writes(), 0);
    }

    #[test]
    fn test_offset_overflow_rejected() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("test.db"), 4096).unwrap();
        disk.write_page(PageId::new(0), &vec![0x5Au8; 4096]).unwrap();

        // 2^52 * 4096 wraps to offset 0 if unchecked.
        let far = PageId::new(1 << 52);
        let mut buf = vec![0u8; 4096];
        assert!(matches!(
            disk.read_page(far, &mut buf),
            Err(IoError::InvalidPageId { .. })
        ));
        assert!(matches!(
            disk.write_page(far, &vec![1u8; 4096]),
            Err(IoError::InvalidPageId { .. })
        ));

        disk.read_page(PageId::new(0), &mut buf).unwrap();
        assert_eq!(buf, vec![0x5Au8; 4096]);
        assert_eq!(disk.num_reads(), 1);
    }
}
