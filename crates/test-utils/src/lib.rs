//! Shared test utilities for the ocean-query workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic ocean-grid generators with predictable values
//! - A tempdir-backed harmonized-store builder
//! - A load-counting store double for stampede and cache tests
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod generators;
pub mod store;

// Re-export commonly used items at the crate root
pub use generators::*;
pub use store::*;
