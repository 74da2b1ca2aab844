//! Buffer pool configuration.

use std::path::Path;

use cairn_common::constants::{
    DEFAULT_BUCKET_CAPACITY, DEFAULT_PAGE_SIZE, DEFAULT_POOL_SIZE, DEFAULT_REPLACER_K,
    MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};

use super::error::{BufferError, BufferResult};

/// Configuration for the buffer pool.
///
/// All values are fixed for the lifetime of a pool.
///
/// ```
/// use cairn_storage::buffer::BufferPoolConfig;
///
/// let config: BufferPoolConfig = BufferPoolConfig::from_toml_str(
///     "num_frames = 128\nreplacer_k = 3\n",
/// )
/// .unwrap();
/// assert_eq!(config.num_frames, 128);
/// assert_eq!(config.replacer_k, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPoolConfig {
    /// Number of page frames in the buffer pool.
    #[serde(default = "default_num_frames")]
    pub num_frames: usize,
    /// Page size in bytes.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// History depth `k` of the LRU-K replacer.
    #[serde(default = "default_replacer_k")]
    pub replacer_k: usize,
    /// Entries per page table bucket before it splits.
    #[serde(default = "default_bucket_capacity")]
    pub bucket_capacity: usize,
}

fn default_num_frames() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_replacer_k() -> usize {
    DEFAULT_REPLACER_K
}

fn default_bucket_capacity() -> usize {
    DEFAULT_BUCKET_CAPACITY
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified number of frames.
    pub fn new(num_frames: usize) -> Self {
        Self {
            num_frames,
            page_size: DEFAULT_PAGE_SIZE,
            replacer_k: DEFAULT_REPLACER_K,
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the replacer history depth.
    pub fn with_replacer_k(mut self, k: usize) -> Self {
        self.replacer_k = k;
        self
    }

    /// Sets the page table bucket capacity.
    pub fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity;
        self
    }

    /// Returns the total memory used by frame buffers.
    pub fn memory_usage(&self) -> usize {
        self.num_frames * self.page_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BufferResult<()> {
        if self.num_frames == 0 {
            return Err(BufferError::config("num_frames must be > 0"));
        }
        if !self.page_size.is_power_of_two() {
            return Err(BufferError::config("page_size must be a power of 2"));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(BufferError::config(format!(
                "page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"
            )));
        }
        if self.replacer_k == 0 {
            return Err(BufferError::config("replacer_k must be > 0"));
        }
        if self.bucket_capacity == 0 {
            return Err(BufferError::config("bucket_capacity must be > 0"));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> BufferResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| BufferError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> BufferResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> BufferResult<String> {
        toml::to_string_pretty(self).map_err(|e| BufferError::config(e.to_string()))
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
