//! Harmonized-store fixtures and doubles.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use dataset_store::{
    DataSource, DatasetHandle, FsStore, HarmonizedDocument, HarmonizedStore, StoreError,
    StoreResult,
};
use tempfile::TempDir;

/// A tempdir-backed harmonized store for tests.
///
/// Documents are written synchronously before the async code under
/// test runs; the directory is removed when the fixture drops.
pub struct TempStore {
    dir: TempDir,
}

impl TempStore {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp store dir"),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// An `FsStore` reading this fixture.
    pub fn store(&self) -> Arc<FsStore> {
        Arc::new(FsStore::new(self.dir.path()))
    }

    /// Write a single-variable harmonized document.
    pub fn write_grid(
        &self,
        dataset: &str,
        date: NaiveDate,
        variable: &str,
        values: Vec<f64>,
    ) {
        self.write_grid_with_mask(dataset, date, variable, values, None);
    }

    /// Write a single-variable document with an optional land mask.
    pub fn write_grid_with_mask(
        &self,
        dataset: &str,
        date: NaiveDate,
        variable: &str,
        values: Vec<f64>,
        land_mask: Option<Vec<bool>>,
    ) {
        let mut variables = BTreeMap::new();
        let cells = values.len();
        variables.insert(variable.to_string(), values);
        self.write_document(
            &HarmonizedDocument {
                dataset: dataset.to_string(),
                date,
                cells,
                fill_value: -9999.0,
                variables,
                land_mask,
            },
            DataSource::Harmonized,
        );
    }

    /// Write a full document under the given source tier.
    pub fn write_document(&self, doc: &HarmonizedDocument, source: DataSource) {
        let path = self.document_path(&doc.dataset, doc.date, source);
        std::fs::create_dir_all(path.parent().expect("document parent dir")).unwrap();
        std::fs::write(&path, serde_json::to_vec(doc).unwrap()).unwrap();
    }

    /// Write raw bytes where a document would live (for corruption
    /// tests).
    pub fn write_raw_bytes(
        &self,
        dataset: &str,
        date: NaiveDate,
        source: DataSource,
        bytes: &[u8],
    ) {
        let path = self.document_path(dataset, date, source);
        std::fs::create_dir_all(path.parent().expect("document parent dir")).unwrap();
        std::fs::write(&path, bytes).unwrap();
    }

    /// Delete a document, simulating an absent date.
    pub fn remove_document(&self, dataset: &str, date: NaiveDate, source: DataSource) {
        let _ = std::fs::remove_file(self.document_path(dataset, date, source));
    }

    fn document_path(
        &self,
        dataset: &str,
        date: NaiveDate,
        source: DataSource,
    ) -> std::path::PathBuf {
        FsStore::new(self.dir.path()).document_path(dataset, date, source)
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store double that delegates to an inner store while counting loads
/// and optionally delaying specific datasets.
///
/// The load counter verifies stampede control (N concurrent acquires
/// for one key must count a single load) and response-cache
/// deduplication (a cached response must not touch the store).
pub struct CountingStore<S> {
    inner: S,
    loads: AtomicU64,
    delays: HashMap<String, Duration>,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            loads: AtomicU64::new(0),
            delays: HashMap::new(),
        }
    }

    /// Delay every load of `dataset`, simulating a slow source.
    pub fn with_dataset_delay(mut self, dataset: &str, delay: Duration) -> Self {
        self.delays.insert(dataset.to_string(), delay);
        self
    }

    /// Number of `load` calls that reached this store.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: HarmonizedStore> HarmonizedStore for CountingStore<S> {
    async fn load(
        &self,
        dataset: &str,
        date: NaiveDate,
        source: DataSource,
    ) -> StoreResult<DatasetHandle> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(dataset) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.load(dataset, date, source).await
    }

    async fn available_dates(&self, dataset: &str) -> StoreResult<Vec<NaiveDate>> {
        self.inner.available_dates(dataset).await
    }
}

/// Store double whose every load fails, for fallback-exhaustion tests.
pub struct EmptyStore;

#[async_trait]
impl HarmonizedStore for EmptyStore {
    async fn load(
        &self,
        dataset: &str,
        date: NaiveDate,
        _source: DataSource,
    ) -> StoreResult<DatasetHandle> {
        Err(StoreError::Unavailable(format!("{}/{}", dataset, date)))
    }

    async fn available_dates(&self, _dataset: &str) -> StoreResult<Vec<NaiveDate>> {
        Ok(Vec::new())
    }
}
