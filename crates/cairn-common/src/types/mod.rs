//! Type definitions for cairn.
//!
//! This module contains the identifier types shared across the storage layer.

mod ids;

pub use ids::PageId;
