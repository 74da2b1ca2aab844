//! # cairn-test
//!
//! Integration tests for the cairn page cache.
//!
//! This crate contains:
//! - Shared fixtures for building pools over real and in-memory stores
//! - Workload generators for concurrent stress tests

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;

/// Workload generators
pub mod workload;
