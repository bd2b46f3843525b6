//! Single-dataset extraction.

use std::collections::BTreeMap;

use dataset_store::DatasetHandle;
use ocean_common::{GridDescriptor, Quality, ResolvedCell};

use crate::types::{ExtractionResult, ExtractionStatus, NoDataReason};

/// Read the variable values at a resolved cell and classify them.
///
/// Never fails: missing values become a `NoData` status, attributed
/// to the land mask when the cell is marked as land and to a data
/// gap otherwise.
pub fn extract(
    descriptor: &GridDescriptor,
    handle: &DatasetHandle,
    cell: &ResolvedCell,
) -> ExtractionResult {
    let flat = descriptor.flat_index(&cell.index);
    let source = format!("{}/{}", handle.dataset, handle.source.label());

    let mut values = BTreeMap::new();
    let mut quality = Quality::Unknown;

    // The document self-declares its fill sentinel (filtered inside
    // `value_at`); the descriptor's configured sentinel is honored as
    // well, covering documents written with a stale declaration.
    let read = |name: &str| {
        handle
            .value_at(name, flat)
            .filter(|v| *v != descriptor.fill_value)
    };

    if descriptor.variables.is_empty() {
        // Dataset without declared variables: take whatever the
        // handle carries, classified as unknown quality.
        for name in handle.variable_names().map(str::to_string).collect::<Vec<_>>() {
            if let Some(value) = read(&name) {
                values.insert(name, value);
            }
        }
    } else {
        for var in &descriptor.variables {
            if let Some(value) = read(&var.name) {
                quality = quality.worst(var.classify(value));
                values.insert(var.name.clone(), value);
            }
        }
    }

    if values.is_empty() {
        let reason = if handle.is_land(flat) {
            NoDataReason::LandMask
        } else {
            NoDataReason::DataGap
        };
        return ExtractionResult::no_data(cell, source, reason);
    }

    ExtractionResult {
        status: ExtractionStatus::Ok,
        values,
        quality,
        resolved_coordinate: cell.coordinate,
        distance_km: cell.distance_km,
        source,
        substituted_date: None,
    }
}
