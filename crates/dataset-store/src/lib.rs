//! Harmonized-store access for the ocean-query engine.
//!
//! The out-of-scope processing jobs write one harmonized JSON document
//! per (dataset, date) under a store root. This crate reads those
//! documents, validates them structurally, and keeps opened handles in
//! a bounded, stampede-safe LRU cache. Absent or malformed files are a
//! normal, expected condition, reported as typed errors rather than
//! panics.

pub mod document;
pub mod handle;
pub mod handle_cache;
pub mod store;

pub use document::HarmonizedDocument;
pub use handle::DatasetHandle;
pub use handle_cache::{HandleCache, HandleCacheStats, HandleKey};
pub use store::{DataSource, FsStore, HarmonizedStore, StoreError, StoreResult};
