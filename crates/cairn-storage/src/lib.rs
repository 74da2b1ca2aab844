//! # cairn-storage
//!
//! Page cache for the cairn storage engine.
//!
//! This crate sits between on-disk pages and the access methods above:
//! - A buffer pool of fixed-size frames with pin counting and dirty tracking
//! - LRU-K replacement that resists sequential scan pollution
//! - An extendible hash table used as the page table
//! - A page-addressed disk manager with file and in-memory backends

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool, frames, replacer and page guards
pub mod buffer;

/// Page-addressed backing store
pub mod disk;

/// Concurrent extendible hash table
pub mod hash;

pub use buffer::{BufferError, BufferPoolConfig, BufferPoolManager, BufferResult};
pub use disk::{DiskManager, FileDiskManager, MemoryDiskManager};
