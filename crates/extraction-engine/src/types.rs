//! Response types for extraction queries.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ocean_common::{Coordinate, Quality, ResolvedCell};
use serde::Serialize;

/// Outcome of one dataset's extraction.
///
/// Failure is always expressed through this status; a per-dataset
/// problem never propagates as an error past the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// At least one variable value was extracted.
    Ok,
    /// The resolved cell holds no data.
    NoData { reason: NoDataReason },
    /// The extraction failed (timeout, missing configuration, ...).
    Error { message: String },
}

/// Why a cell holds no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    /// The cell lies over land; absence is expected.
    LandMask,
    /// The cell is ocean but the dataset has a gap there.
    DataGap,
}

/// Per-dataset, per-query extraction result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    #[serde(flatten)]
    pub status: ExtractionStatus,
    /// Extracted value per variable name. Empty unless status is Ok.
    pub values: BTreeMap<String, f64>,
    pub quality: Quality,
    /// Grid cell the query coordinate resolved to.
    pub resolved_coordinate: Coordinate,
    /// Great-circle offset between requested and resolved coordinate.
    pub distance_km: f64,
    /// Source identifier, e.g. "sst/harmonized" or "sst/raw".
    pub source: String,
    /// Set when a fallback date served the request instead of the
    /// requested date. Never silently swapped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substituted_date: Option<NaiveDate>,
}

impl ExtractionResult {
    /// A no-data result at a resolved cell.
    pub fn no_data(cell: &ResolvedCell, source: impl Into<String>, reason: NoDataReason) -> Self {
        Self {
            status: ExtractionStatus::NoData { reason },
            values: BTreeMap::new(),
            quality: Quality::Unknown,
            resolved_coordinate: cell.coordinate,
            distance_km: cell.distance_km,
            source: source.into(),
            substituted_date: None,
        }
    }

    /// An error result. Used before resolution succeeds (unknown
    /// dataset, timeout), so it reports the requested coordinate.
    pub fn error(
        coordinate: Coordinate,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: ExtractionStatus::Error {
                message: message.into(),
            },
            values: BTreeMap::new(),
            quality: Quality::Unknown,
            resolved_coordinate: coordinate,
            distance_km: 0.0,
            source: source.into(),
            substituted_date: None,
        }
    }

    /// Whether this result carries values.
    pub fn is_ok(&self) -> bool {
        matches!(self.status, ExtractionStatus::Ok)
    }
}

/// The assembled answer to a multi-dataset query.
///
/// Always contains one entry per requested dataset; status
/// communicates outcome rather than absence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedResponse {
    /// The (normalized) requested coordinate.
    pub coordinate: Coordinate,
    /// The requested date.
    pub date: NaiveDate,
    /// One result per requested dataset, keyed by dataset id.
    pub per_dataset: BTreeMap<String, ExtractionResult>,
    /// Wall-clock time the extraction took.
    pub extraction_time_ms: u64,
}
