//! Opened dataset handles.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::document::HarmonizedDocument;
use crate::store::DataSource;

/// An opened (dataset, date) grid held in memory.
///
/// Exclusively owned by the handle cache; extractors borrow it for a
/// single extraction call via `Arc` and never retain it past that.
#[derive(Debug)]
pub struct DatasetHandle {
    /// Dataset identifier.
    pub dataset: String,
    /// The day this handle covers.
    pub date: NaiveDate,
    /// Which source tier produced this handle.
    pub source: DataSource,
    /// Number of grid cells.
    pub cells: usize,
    /// Sentinel marking missing cells.
    pub fill_value: f64,
    /// Flattened value arrays per variable.
    variables: BTreeMap<String, Vec<f64>>,
    /// Per-cell land indicator, when the dataset provides one.
    land_mask: Option<Vec<bool>>,
    /// When this handle was opened.
    pub opened_at: DateTime<Utc>,
    /// Approximate resident size, for cache accounting.
    pub size_bytes: usize,
}

impl DatasetHandle {
    /// Build a handle from a validated harmonized document.
    pub fn from_document(doc: HarmonizedDocument, source: DataSource) -> Self {
        let size_bytes = doc.size_bytes();
        Self {
            dataset: doc.dataset,
            date: doc.date,
            source,
            cells: doc.cells,
            fill_value: doc.fill_value,
            variables: doc.variables,
            land_mask: doc.land_mask,
            opened_at: Utc::now(),
            size_bytes,
        }
    }

    /// Read one variable value at a flat cell index.
    ///
    /// Returns `None` when the variable is absent, the index is out
    /// of range, or the stored value is the fill sentinel / NaN.
    pub fn value_at(&self, variable: &str, index: usize) -> Option<f64> {
        let value = *self.variables.get(variable)?.get(index)?;
        if value.is_nan() || value == self.fill_value {
            None
        } else {
            Some(value)
        }
    }

    /// Whether the cell at `index` is marked as land.
    ///
    /// Without a mask, no cell is considered land.
    pub fn is_land(&self, index: usize) -> bool {
        self.land_mask
            .as_ref()
            .and_then(|m| m.get(index).copied())
            .unwrap_or(false)
    }

    /// Variable names carried by this handle.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(|s| s.as_str())
    }
}
