//! Data-quality classification.
//!
//! Each dataset variable declares a plausible physical range (e.g.
//! oceanic SST in -2..35 °C) and an extended range covering extreme
//! but recordable values. Extracted values are classified against
//! these ranges; datasets without configured ranges classify as
//! `Unknown` rather than failing.

use serde::{Deserialize, Serialize};

/// Quality classification of an extracted value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// All values within their plausible physical ranges.
    Excellent,
    /// Within the extended range but outside the plausible one.
    Good,
    /// Outside even the extended range.
    Questionable,
    /// No ranges configured for the variable(s).
    Unknown,
}

impl Quality {
    /// Combine two classifications, keeping the worse one.
    ///
    /// `Unknown` only wins when nothing else classified.
    pub fn worst(self, other: Quality) -> Quality {
        match (self, other) {
            (Quality::Unknown, q) | (q, Quality::Unknown) => q,
            (a, b) => {
                if severity(a) >= severity(b) {
                    a
                } else {
                    b
                }
            }
        }
    }
}

fn severity(q: Quality) -> u8 {
    match q {
        Quality::Excellent => 0,
        Quality::Good => 1,
        Quality::Questionable => 2,
        Quality::Unknown => 0,
    }
}

/// Declaration of one variable carried by a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Variable name as stored in the harmonized files (e.g. "sst").
    pub name: String,
    /// Physical units (e.g. "degC", "m/s", "pH").
    pub units: String,
    /// Plausible physical range (min, max), inclusive.
    #[serde(default)]
    pub plausible_range: Option<(f64, f64)>,
    /// Extended range covering extreme but recordable values.
    #[serde(default)]
    pub extended_range: Option<(f64, f64)>,
}

impl VariableSpec {
    /// Create a spec with no ranges (classifies as `Unknown`).
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            plausible_range: None,
            extended_range: None,
        }
    }

    /// Attach a plausible range.
    pub fn with_plausible(mut self, min: f64, max: f64) -> Self {
        self.plausible_range = Some((min, max));
        self
    }

    /// Attach an extended range.
    pub fn with_extended(mut self, min: f64, max: f64) -> Self {
        self.extended_range = Some((min, max));
        self
    }

    /// Classify a single value against this spec's ranges.
    pub fn classify(&self, value: f64) -> Quality {
        if let Some((min, max)) = self.plausible_range {
            if value >= min && value <= max {
                return Quality::Excellent;
            }
            match self.extended_range {
                Some((emin, emax)) if value >= emin && value <= emax => Quality::Good,
                _ => Quality::Questionable,
            }
        } else if let Some((emin, emax)) = self.extended_range {
            if value >= emin && value <= emax {
                Quality::Good
            } else {
                Quality::Questionable
            }
        } else {
            Quality::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sst_spec() -> VariableSpec {
        VariableSpec::new("sst", "degC")
            .with_plausible(-2.0, 35.0)
            .with_extended(-4.0, 40.0)
    }

    #[test]
    fn test_classify_plausible() {
        assert_eq!(sst_spec().classify(18.5), Quality::Excellent);
        assert_eq!(sst_spec().classify(-2.0), Quality::Excellent);
        assert_eq!(sst_spec().classify(35.0), Quality::Excellent);
    }

    #[test]
    fn test_classify_extended() {
        assert_eq!(sst_spec().classify(37.0), Quality::Good);
        assert_eq!(sst_spec().classify(-3.5), Quality::Good);
    }

    #[test]
    fn test_classify_questionable() {
        assert_eq!(sst_spec().classify(99.0), Quality::Questionable);
        assert_eq!(sst_spec().classify(-40.0), Quality::Questionable);
    }

    #[test]
    fn test_classify_unknown_without_ranges() {
        let spec = VariableSpec::new("microplastics", "particles/m3");
        assert_eq!(spec.classify(123.0), Quality::Unknown);
    }

    #[test]
    fn test_worst_combination() {
        assert_eq!(
            Quality::Excellent.worst(Quality::Questionable),
            Quality::Questionable
        );
        assert_eq!(Quality::Good.worst(Quality::Excellent), Quality::Good);
        assert_eq!(Quality::Unknown.worst(Quality::Good), Quality::Good);
        assert_eq!(Quality::Unknown.worst(Quality::Unknown), Quality::Unknown);
    }
}
