//! # cairn-common
//!
//! Common types and constants for the cairn page cache.
//!
//! This crate provides the foundational pieces shared by the storage
//! components:
//!
//! - **Types**: the `PageId` identifier and its `INVALID` sentinel
//! - **Constants**: page sizes and buffer pool defaults
//!
//! ## Example
//!
//! ```rust
//! use cairn_common::types::PageId;
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert_eq!(page_id.next(), PageId::new(43));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::PageId;
