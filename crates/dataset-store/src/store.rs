//! Harmonized-store trait and its filesystem implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::HarmonizedDocument;
use crate::handle::DatasetHandle;

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the harmonized store.
///
/// Clone so a single load outcome can be shared across concurrent
/// waiters of one in-flight load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No file exists for the requested (dataset, date, source).
    #[error("data unavailable: {0}")]
    Unavailable(String),

    /// A file exists but failed structural validation.
    #[error("data corrupt: {0}")]
    Corrupt(String),

    /// I/O failure talking to the store.
    #[error("store i/o error: {0}")]
    Io(String),
}

/// Which source tier a handle was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Primary harmonized document for a date.
    Harmonized,
    /// Alternate raw-derived document, when the collaborator exposes one.
    RawDerived,
}

impl DataSource {
    /// Short label used in result sources and cache keys.
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Harmonized => "harmonized",
            DataSource::RawDerived => "raw",
        }
    }
}

/// Read access to the external harmonized-data store.
///
/// The engine only reads; absent or malformed files are an expected
/// condition. The trait is the seam for test doubles (load counting,
/// artificial delays).
#[async_trait]
pub trait HarmonizedStore: Send + Sync {
    /// Load the grid for one (dataset, date, source) into a handle.
    async fn load(
        &self,
        dataset: &str,
        date: NaiveDate,
        source: DataSource,
    ) -> StoreResult<DatasetHandle>;

    /// Dates for which the primary source has a document, unordered.
    /// Used by the lookback fallback tier.
    async fn available_dates(&self, dataset: &str) -> StoreResult<Vec<NaiveDate>>;
}

/// Filesystem-backed harmonized store.
///
/// Layout under the root:
/// - primary:   `<root>/<dataset>/<YYYY-MM-DD>.json`
/// - alternate: `<root>/<dataset>/raw/<YYYY-MM-DD>.json`
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`. The directory does not need
    /// to exist yet; missing paths read as unavailable.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the document for one (dataset, date, source).
    pub fn document_path(&self, dataset: &str, date: NaiveDate, source: DataSource) -> PathBuf {
        let file = format!("{}.json", date.format("%Y-%m-%d"));
        match source {
            DataSource::Harmonized => self.root.join(dataset).join(file),
            DataSource::RawDerived => self.root.join(dataset).join("raw").join(file),
        }
    }
}

#[async_trait]
impl HarmonizedStore for FsStore {
    async fn load(
        &self,
        dataset: &str,
        date: NaiveDate,
        source: DataSource,
    ) -> StoreResult<DatasetHandle> {
        let path = self.document_path(dataset, date, source);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Unavailable(format!(
                    "{}/{} ({}) has no document",
                    dataset,
                    date,
                    source.label()
                )));
            }
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let doc: HarmonizedDocument = serde_json::from_slice(&bytes).map_err(|e| {
            corrupt(&path, dataset, date, format!("invalid JSON: {}", e))
        })?;

        doc.validate()
            .map_err(|reason| corrupt(&path, dataset, date, reason))?;

        tracing::debug!(
            dataset,
            %date,
            source = source.label(),
            cells = doc.cells,
            "loaded harmonized document"
        );

        Ok(DatasetHandle::from_document(doc, source))
    }

    async fn available_dates(&self, dataset: &str) -> StoreResult<Vec<NaiveDate>> {
        let dir = self.root.join(dataset);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "listing {}: {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(format!("listing {}: {}", dir.display(), e)))?
        {
            let name = entry.file_name();
            let Some(stem) = Path::new(&name).file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                dates.push(date);
            }
        }
        Ok(dates)
    }
}

/// Corrupt files are logged distinctly for operational visibility,
/// then treated like absent files by the fallback chain.
fn corrupt(path: &Path, dataset: &str, date: NaiveDate, reason: String) -> StoreError {
    tracing::warn!(
        dataset,
        %date,
        path = %path.display(),
        %reason,
        "harmonized document failed validation"
    );
    StoreError::Corrupt(format!("{}/{}: {}", dataset, date, reason))
}
