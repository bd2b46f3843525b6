//! Multi-dataset fan-out and the per-dataset fallback chain.
//!
//! Each requested dataset is extracted in its own bounded-concurrency
//! task under a fixed timeout; one slow or broken dataset degrades
//! only its own entry. The fallback chain is an explicit ordered list
//! of (date, source) tiers tried in sequence, each returning a value
//! rather than raising.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dataset_store::{DataSource, HandleCache, HarmonizedStore, StoreError};
use futures::stream::{self, StreamExt};
use ocean_common::{Coordinate, GridDescriptor};

use crate::extract::extract;
use crate::types::{ExtractionResult, UnifiedResponse};

/// One rung of the fallback chain: which document to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionTier {
    pub date: NaiveDate,
    pub source: DataSource,
}

/// Orchestrates concurrent per-dataset extraction.
///
/// Cheap to clone; all heavy state is shared behind `Arc`.
#[derive(Clone)]
pub struct DatasetExtractor {
    descriptors: Arc<BTreeMap<String, GridDescriptor>>,
    handles: Arc<HandleCache>,
    store: Arc<dyn HarmonizedStore>,
    lookback_days: u32,
    extraction_timeout: Duration,
    max_concurrent: usize,
}

impl DatasetExtractor {
    pub fn new(
        descriptors: Arc<BTreeMap<String, GridDescriptor>>,
        handles: Arc<HandleCache>,
        store: Arc<dyn HarmonizedStore>,
        lookback_days: u32,
        extraction_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            descriptors,
            handles,
            store,
            lookback_days,
            extraction_timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Extract every requested dataset concurrently and assemble the
    /// unified response. Always returns one entry per dataset.
    pub async fn extract_all(
        &self,
        coordinate: Coordinate,
        date: NaiveDate,
        datasets: &[String],
    ) -> UnifiedResponse {
        let started = Instant::now();

        let per_dataset: BTreeMap<String, ExtractionResult> =
            stream::iter(datasets.to_vec().into_iter().map(|id| {
                let this = self.clone();
                async move {
                    let result = this.extract_one(coordinate, date, &id).await;
                    (id, result)
                }
            }))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        UnifiedResponse {
            coordinate,
            date,
            per_dataset,
            extraction_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Extract one dataset under the per-dataset timeout.
    ///
    /// A timeout abandons the wait, not the underlying handle load:
    /// the load stays in flight and remains cached for later callers
    /// if it completes.
    pub async fn extract_one(
        &self,
        coordinate: Coordinate,
        date: NaiveDate,
        dataset: &str,
    ) -> ExtractionResult {
        match tokio::time::timeout(
            self.extraction_timeout,
            self.extract_with_fallback(coordinate, date, dataset),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    dataset,
                    %date,
                    timeout_ms = self.extraction_timeout.as_millis() as u64,
                    "dataset extraction timed out"
                );
                ExtractionResult::error(
                    coordinate,
                    dataset,
                    format!(
                        "timeout: extraction exceeded {} ms",
                        self.extraction_timeout.as_millis()
                    ),
                )
            }
        }
    }

    /// Try the fallback tiers in order until one yields a result.
    async fn extract_with_fallback(
        &self,
        coordinate: Coordinate,
        date: NaiveDate,
        dataset: &str,
    ) -> ExtractionResult {
        let Some(descriptor) = self.descriptors.get(dataset) else {
            return ExtractionResult::error(
                coordinate,
                dataset,
                format!("no grid descriptor configured for '{}'", dataset),
            );
        };

        let cell = descriptor.resolve(&coordinate);

        // Tier 1 and 2: exact date, primary then raw-derived.
        let exact_date_tiers = [
            ExtractionTier {
                date,
                source: DataSource::Harmonized,
            },
            ExtractionTier {
                date,
                source: DataSource::RawDerived,
            },
        ];
        for tier in exact_date_tiers {
            if let Some(result) = self.try_tier(descriptor, &cell, date, tier).await {
                return result;
            }
        }

        // Tier 3: nearest available date within the lookback window.
        for tier in self.lookback_tiers(dataset, date).await {
            if let Some(result) = self.try_tier(descriptor, &cell, date, tier).await {
                return result;
            }
        }

        ExtractionResult::no_data(
            &cell,
            format!("{}/none", dataset),
            crate::types::NoDataReason::DataGap,
        )
    }

    /// Attempt one tier; `None` means move on to the next.
    async fn try_tier(
        &self,
        descriptor: &GridDescriptor,
        cell: &ocean_common::ResolvedCell,
        requested_date: NaiveDate,
        tier: ExtractionTier,
    ) -> Option<ExtractionResult> {
        match self
            .handles
            .acquire(&descriptor.id, tier.date, tier.source)
            .await
        {
            Ok(handle) => {
                let mut result = extract(descriptor, &handle, cell);
                if tier.date != requested_date {
                    result.substituted_date = Some(tier.date);
                    tracing::info!(
                        dataset = %descriptor.id,
                        requested = %requested_date,
                        served = %tier.date,
                        "served substitute date from lookback window"
                    );
                }
                Some(result)
            }
            Err(StoreError::Unavailable(_)) => None,
            Err(e) => {
                // Corrupt and I/O failures fall through to the next
                // tier exactly like an absent file.
                tracing::debug!(
                    dataset = %descriptor.id,
                    date = %tier.date,
                    source = tier.source.label(),
                    error = %e,
                    "tier failed, trying next"
                );
                None
            }
        }
    }

    /// Lookback tiers: available primary dates strictly before the
    /// requested date, within the window, nearest first.
    async fn lookback_tiers(&self, dataset: &str, date: NaiveDate) -> Vec<ExtractionTier> {
        if self.lookback_days == 0 {
            return Vec::new();
        }

        let dates = match self.store.available_dates(dataset).await {
            Ok(dates) => dates,
            Err(e) => {
                tracing::debug!(dataset, error = %e, "could not list lookback dates");
                return Vec::new();
            }
        };

        let mut candidates: Vec<NaiveDate> = dates
            .into_iter()
            .filter(|d| {
                *d < date && (date - *d).num_days() <= i64::from(self.lookback_days)
            })
            .collect();
        candidates.sort_by_key(|d| (date - *d).num_days());

        candidates
            .into_iter()
            .map(|d| ExtractionTier {
                date: d,
                source: DataSource::Harmonized,
            })
            .collect()
    }
}
