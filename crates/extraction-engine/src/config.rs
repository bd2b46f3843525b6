//! Engine configuration.
//!
//! Supplied once at process start as an immutable document; the
//! engine never reloads configuration at runtime.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use ocean_common::{GridDescriptor, GridKind, OceanError, OceanResult};
use serde::{Deserialize, Serialize};

/// Configuration for the extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum resident opened dataset handles.
    #[serde(default = "default_handle_cache_capacity")]
    pub handle_cache_capacity: usize,

    /// Maximum cached assembled responses.
    #[serde(default = "default_response_cache_capacity")]
    pub response_cache_capacity: usize,

    /// Time-to-live for cached responses, in seconds.
    #[serde(default = "default_response_ttl_secs")]
    pub response_ttl_secs: u64,

    /// Budget for one dataset's whole extraction, in milliseconds.
    #[serde(default = "default_extraction_timeout_ms")]
    pub extraction_timeout_ms: u64,

    /// Budget for one harmonized-file load, in milliseconds.
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// How many days before the requested date the fallback chain
    /// may substitute.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Upper bound on per-query concurrent dataset extractions.
    #[serde(default = "default_max_concurrent_extractions")]
    pub max_concurrent_extractions: usize,

    /// Grid descriptor per dataset.
    #[serde(default)]
    pub datasets: Vec<GridDescriptor>,
}

fn default_handle_cache_capacity() -> usize {
    32
}

fn default_response_cache_capacity() -> usize {
    256
}

fn default_response_ttl_secs() -> u64 {
    1800
}

fn default_extraction_timeout_ms() -> u64 {
    2000
}

fn default_load_timeout_ms() -> u64 {
    5000
}

fn default_lookback_days() -> u32 {
    7
}

fn default_max_concurrent_extractions() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            handle_cache_capacity: default_handle_cache_capacity(),
            response_cache_capacity: default_response_cache_capacity(),
            response_ttl_secs: default_response_ttl_secs(),
            extraction_timeout_ms: default_extraction_timeout_ms(),
            load_timeout_ms: default_load_timeout_ms(),
            lookback_days: default_lookback_days(),
            max_concurrent_extractions: default_max_concurrent_extractions(),
            datasets: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML configuration document.
    pub fn from_yaml(yaml: &str) -> OceanResult<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| OceanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> OceanResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            OceanError::Config(format!("reading {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_yaml(&text)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> OceanResult<()> {
        if self.handle_cache_capacity == 0 {
            return Err(OceanError::Config(
                "handle_cache_capacity must be > 0".to_string(),
            ));
        }
        if self.response_cache_capacity == 0 {
            return Err(OceanError::Config(
                "response_cache_capacity must be > 0".to_string(),
            ));
        }
        if self.extraction_timeout_ms == 0 || self.load_timeout_ms == 0 {
            return Err(OceanError::Config(
                "timeouts must be > 0".to_string(),
            ));
        }
        if self.max_concurrent_extractions == 0 {
            return Err(OceanError::Config(
                "max_concurrent_extractions must be > 0".to_string(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.id.as_str()) {
                return Err(OceanError::Config(format!(
                    "duplicate dataset id '{}'",
                    dataset.id
                )));
            }
            if dataset.cells() == 0 {
                return Err(OceanError::Config(format!(
                    "dataset '{}' describes an empty grid",
                    dataset.id
                )));
            }
            if let GridKind::Regular(grid) = &dataset.kind {
                let steps_valid = grid.lat_step.is_finite()
                    && grid.lon_step.is_finite()
                    && grid.lat_step > 0.0
                    && grid.lon_step > 0.0;
                if !steps_valid {
                    return Err(OceanError::Config(format!(
                        "dataset '{}': grid steps must be finite and > 0",
                        dataset.id
                    )));
                }
                if !grid.lat_origin.is_finite() || !grid.lon_origin.is_finite() {
                    return Err(OceanError::Config(format!(
                        "dataset '{}': grid origin must be finite",
                        dataset.id
                    )));
                }
            }
            for var in &dataset.variables {
                for range in [var.plausible_range, var.extended_range].into_iter().flatten() {
                    if range.0 > range.1 {
                        return Err(OceanError::Config(format!(
                            "dataset '{}' variable '{}': range min exceeds max",
                            dataset.id, var.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Descriptor table keyed by dataset id.
    pub fn descriptor_map(&self) -> BTreeMap<String, GridDescriptor> {
        self.datasets
            .iter()
            .map(|d| (d.id.clone(), d.clone()))
            .collect()
    }

    /// Response cache TTL as a Duration.
    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.response_ttl_secs)
    }

    /// Per-dataset extraction budget as a Duration.
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    /// Harmonized-file load budget as a Duration.
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}
