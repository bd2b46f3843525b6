//! High-level extraction service.
//!
//! `ExtractionService` is the engine's query interface for the
//! routing/CLI layer. It is constructed once at process start from an
//! immutable configuration and an injected harmonized store, owns the
//! two caches, and is the only place their lifecycles are wired
//! together.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dataset_store::{HandleCache, HandleCacheStats, HarmonizedStore};
use ocean_common::{Coordinate, GridDescriptor, OceanResult};

use crate::config::EngineConfig;
use crate::orchestrator::DatasetExtractor;
use crate::response_cache::{ResponseCache, ResponseCacheStats, ResponseKey};
use crate::types::{ExtractionResult, UnifiedResponse};

/// The extraction engine facade.
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(FsStore::new("/data/harmonized"));
/// let service = ExtractionService::new(config, store)?;
///
/// let response = service
///     .extract_multi(25.0, -40.0, date, &["sst".into(), "waves".into()])
///     .await?;
/// ```
pub struct ExtractionService {
    descriptors: Arc<BTreeMap<String, GridDescriptor>>,
    handles: Arc<HandleCache>,
    responses: ResponseCache,
    extractor: DatasetExtractor,
    response_ttl: std::time::Duration,
}

impl ExtractionService {
    /// Build the service from a validated configuration and a
    /// harmonized store.
    pub fn new(config: EngineConfig, store: Arc<dyn HarmonizedStore>) -> OceanResult<Self> {
        config.validate()?;

        let descriptors = Arc::new(config.descriptor_map());
        let handles = Arc::new(HandleCache::new(
            store.clone(),
            config.handle_cache_capacity,
            config.load_timeout(),
        ));
        let responses = ResponseCache::new(config.response_cache_capacity, config.response_ttl());
        let extractor = DatasetExtractor::new(
            descriptors.clone(),
            handles.clone(),
            store,
            config.lookback_days,
            config.extraction_timeout(),
            config.max_concurrent_extractions,
        );

        Ok(Self {
            descriptors,
            handles,
            responses,
            extractor,
            response_ttl: config.response_ttl(),
        })
    }

    /// Multi-dataset point query through the response cache.
    ///
    /// Fails only on a malformed coordinate; every per-dataset
    /// problem is reported inside the response.
    pub async fn extract_multi(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        datasets: &[String],
    ) -> OceanResult<Arc<UnifiedResponse>> {
        let coordinate = Coordinate::normalize(latitude, longitude)?;
        let key = ResponseKey::new(&coordinate, date, datasets);

        // Compute over the key's canonical dataset set so equal keys
        // always produce equal responses.
        let ids = key.datasets.clone();
        let extractor = self.extractor.clone();

        self.responses
            .get_or_compute(key, move || async move {
                extractor.extract_all(coordinate, date, &ids).await
            })
            .await
    }

    /// Single-dataset convenience query. Bypasses the response cache
    /// but shares the handle cache and fallback chain.
    pub async fn extract_one(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        dataset: &str,
    ) -> OceanResult<ExtractionResult> {
        let coordinate = Coordinate::normalize(latitude, longitude)?;
        Ok(self.extractor.extract_one(coordinate, date, dataset).await)
    }

    /// Datasets this service is configured to serve.
    pub fn datasets(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(|s| s.as_str())
    }

    /// Configured response TTL.
    pub fn response_ttl(&self) -> std::time::Duration {
        self.response_ttl
    }

    /// Handle-cache statistics for monitoring.
    pub async fn handle_cache_stats(&self) -> HandleCacheStats {
        self.handles.stats().await
    }

    /// Response-cache statistics for monitoring.
    pub async fn response_cache_stats(&self) -> ResponseCacheStats {
        self.responses.stats().await
    }
}
