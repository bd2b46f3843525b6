//! On-disk harmonized document format.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One harmonized per-day, per-dataset grid file.
///
/// Written by the out-of-scope processing jobs: values are flattened
/// row-major (regular grids) or sample-ordered (point datasets), in
/// the dataset's canonical longitude convention, with `fill_value`
/// marking missing cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonizedDocument {
    /// Dataset identifier this document belongs to.
    pub dataset: String,
    /// The day this grid covers.
    pub date: NaiveDate,
    /// Number of grid cells every value array must have.
    pub cells: usize,
    /// Sentinel marking missing cells.
    pub fill_value: f64,
    /// Flattened value array per variable name.
    pub variables: BTreeMap<String, Vec<f64>>,
    /// Optional per-cell land indicator (true = over land).
    #[serde(default)]
    pub land_mask: Option<Vec<bool>>,
}

impl HarmonizedDocument {
    /// Structural validation: every array must match the declared
    /// cell count and at least one variable must be present.
    ///
    /// Returns a human-readable description of the first defect.
    pub fn validate(&self) -> Result<(), String> {
        if self.cells == 0 {
            return Err("declared cell count is zero".to_string());
        }
        if self.variables.is_empty() {
            return Err("document carries no variables".to_string());
        }
        for (name, values) in &self.variables {
            if values.len() != self.cells {
                return Err(format!(
                    "variable '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    self.cells
                ));
            }
        }
        if let Some(mask) = &self.land_mask {
            if mask.len() != self.cells {
                return Err(format!(
                    "land mask has {} cells, expected {}",
                    mask.len(),
                    self.cells
                ));
            }
        }
        Ok(())
    }

    /// Rough in-memory footprint, used for cache accounting.
    pub fn size_bytes(&self) -> usize {
        let values: usize = self.variables.values().map(|v| v.len() * 8).sum();
        let mask = self.land_mask.as_ref().map(|m| m.len()).unwrap_or(0);
        values + mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(cells: usize, values: Vec<f64>) -> HarmonizedDocument {
        let mut variables = BTreeMap::new();
        variables.insert("sst".to_string(), values);
        HarmonizedDocument {
            dataset: "sst".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 7, 23).unwrap(),
            cells,
            fill_value: -9999.0,
            variables,
            land_mask: None,
        }
    }

    #[test]
    fn test_valid_document() {
        assert!(doc(3, vec![1.0, 2.0, 3.0]).validate().is_ok());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = doc(4, vec![1.0, 2.0, 3.0]).validate().unwrap_err();
        assert!(err.contains("expected 4"));
    }

    #[test]
    fn test_empty_variables_rejected() {
        let mut d = doc(3, vec![1.0, 2.0, 3.0]);
        d.variables.clear();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_mask_length_checked() {
        let mut d = doc(3, vec![1.0, 2.0, 3.0]);
        d.land_mask = Some(vec![true, false]);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let d = doc(3, vec![1.0, -9999.0, 3.0]);
        let json = serde_json::to_string(&d).unwrap();
        let back: HarmonizedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cells, 3);
        assert_eq!(back.variables["sst"][1], -9999.0);
    }
}
