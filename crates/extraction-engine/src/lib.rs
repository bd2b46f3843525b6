//! Concurrent multi-dataset point extraction.
//!
//! This crate is the orchestration layer of the ocean-query engine:
//! it fans a query out across the requested datasets, applies an
//! explicit per-dataset fallback chain when files are missing or
//! corrupt, absorbs every per-dataset failure into that dataset's
//! result entry, and caches assembled responses with request
//! deduplication.
//!
//! # Architecture
//!
//! ```text
//! extract_multi(lat, lon, date, datasets)
//!      │
//!      ├─► Coordinate::normalize (only error that surfaces)
//!      │
//!      ├─► ResponseCache::get_or_compute (singleflight, TTL)
//!      │         │ miss
//!      │         ▼
//!      └─► DatasetExtractor fan-out (bounded, per-dataset timeout)
//!               │  per dataset:
//!               ├─► GridDescriptor::resolve (O(1))
//!               ├─► HandleCache::acquire  ──► fallback tiers:
//!               │        primary / raw-derived / lookback dates
//!               └─► extract() + quality classification
//! ```
//!
//! A response is always returned for a well-formed query; per-dataset
//! status fields communicate partial failure.

pub mod config;
pub mod extract;
pub mod orchestrator;
pub mod response_cache;
pub mod service;
pub mod types;

pub use config::EngineConfig;
pub use response_cache::{ResponseCache, ResponseCacheStats, ResponseKey};
pub use service::ExtractionService;
pub use types::{ExtractionResult, ExtractionStatus, NoDataReason, UnifiedResponse};
