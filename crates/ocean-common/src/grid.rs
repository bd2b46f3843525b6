//! Grid descriptors and coordinate-to-cell resolution.
//!
//! Each dataset carries a fixed spatial grid. Regular lat/lon grids
//! resolve in O(1) by rounding to the nearest step multiple; discrete
//! point-observation datasets resolve by a bounded minimum-distance
//! scan. The two strategies form a closed set selected by dataset
//! kind, both honoring the same resolve contract.

use serde::{Deserialize, Serialize};

use crate::coordinate::{haversine_km, wrap_longitude, Coordinate};
use crate::quality::VariableSpec;

/// Immutable description of one dataset's spatial grid.
///
/// Grid parameters never change for a given dataset identity during
/// the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridDescriptor {
    /// Dataset identifier (e.g. "sst", "currents", "waves").
    pub id: String,
    /// Spatial layout and resolution strategy.
    pub kind: GridKind,
    /// Variables this dataset carries.
    pub variables: Vec<VariableSpec>,
    /// Sentinel marking missing cells in harmonized files.
    #[serde(default = "default_fill_value")]
    pub fill_value: f64,
}

fn default_fill_value() -> f64 {
    -9999.0
}

impl GridDescriptor {
    /// Resolve a canonical coordinate to the nearest grid cell.
    pub fn resolve(&self, coordinate: &Coordinate) -> ResolvedCell {
        match &self.kind {
            GridKind::Regular(grid) => grid.resolve(coordinate),
            GridKind::PointSamples { samples } => resolve_samples(samples, coordinate),
        }
    }

    /// Flat array index for a resolved grid index.
    pub fn flat_index(&self, index: &GridIndex) -> usize {
        match (index, &self.kind) {
            (GridIndex::Cell { row, col }, GridKind::Regular(grid)) => row * grid.n_lon + col,
            (GridIndex::Sample { index }, _) => *index,
            // A Cell index can only come out of a Regular resolve.
            (GridIndex::Cell { row, .. }, GridKind::PointSamples { .. }) => *row,
        }
    }

    /// Total number of cells (value-array length in harmonized files).
    pub fn cells(&self) -> usize {
        match &self.kind {
            GridKind::Regular(grid) => grid.n_lat * grid.n_lon,
            GridKind::PointSamples { samples } => samples.len(),
        }
    }

    /// Look up a variable spec by name.
    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Spatial layout of a dataset. Closed set: adding a kind means
/// implementing its resolve strategy here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridKind {
    /// Fixed-step lat/lon grid; O(1) nearest-cell rounding.
    Regular(RegularGrid),
    /// Discrete observation points; bounded minimum-distance scan.
    PointSamples { samples: Vec<SamplePoint> },
}

/// A fixed-resolution lat/lon grid.
///
/// The origin is the southwest grid point; rows run south to north,
/// columns west to east, both with positive steps, row-major values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Latitude step in degrees (e.g. 1.0, 0.083).
    pub lat_step: f64,
    /// Longitude step in degrees.
    pub lon_step: f64,
    /// Latitude of the southernmost grid point.
    pub lat_origin: f64,
    /// Longitude of the westernmost grid point.
    pub lon_origin: f64,
    /// Number of rows (latitude points).
    pub n_lat: usize,
    /// Number of columns (longitude points).
    pub n_lon: usize,
}

impl RegularGrid {
    /// Nearest-cell resolution: round each axis independently to the
    /// nearest step multiple, clamped to the valid index range. A
    /// coordinate exactly between two grid points rounds toward the
    /// lower index.
    pub fn resolve(&self, coordinate: &Coordinate) -> ResolvedCell {
        // Zero-size dimensions resolve to index 0; reads against the
        // empty value array then report no data.
        let max_row = self.n_lat.saturating_sub(1) as i64;
        let max_col = self.n_lon.saturating_sub(1) as i64;
        let row = round_half_down((coordinate.latitude - self.lat_origin) / self.lat_step)
            .clamp(0, max_row) as usize;
        let col = round_half_down((coordinate.longitude - self.lon_origin) / self.lon_step)
            .clamp(0, max_col) as usize;

        let resolved = Coordinate {
            latitude: self.lat_origin + row as f64 * self.lat_step,
            longitude: wrap_longitude(self.lon_origin + col as f64 * self.lon_step),
        };

        ResolvedCell {
            index: GridIndex::Cell { row, col },
            coordinate: resolved,
            distance_km: haversine_km(coordinate, &resolved),
        }
    }
}

/// One discrete observation location of a point-sample dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplePoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Minimum-distance resolution over a bounded candidate set. Ties
/// keep the lower sample index (stable, deterministic).
fn resolve_samples(samples: &[SamplePoint], coordinate: &Coordinate) -> ResolvedCell {
    let mut best_index = 0;
    let mut best_coord = Coordinate {
        latitude: coordinate.latitude,
        longitude: coordinate.longitude,
    };
    let mut best_distance = f64::INFINITY;

    for (i, sample) in samples.iter().enumerate() {
        let candidate = Coordinate {
            latitude: sample.latitude,
            longitude: wrap_longitude(sample.longitude),
        };
        let d = haversine_km(coordinate, &candidate);
        if d < best_distance {
            best_index = i;
            best_coord = candidate;
            best_distance = d;
        }
    }

    ResolvedCell {
        index: GridIndex::Sample { index: best_index },
        coordinate: best_coord,
        distance_km: if best_distance.is_finite() {
            best_distance
        } else {
            0.0
        },
    }
}

/// Index of a resolved cell within its dataset's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridIndex {
    /// Row/column of a regular grid (row-major storage).
    Cell { row: usize, col: usize },
    /// Position within a point-sample list.
    Sample { index: usize },
}

/// Output of grid resolution: the chosen cell, its real-world
/// coordinate, and the offset from the requested coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedCell {
    pub index: GridIndex,
    pub coordinate: Coordinate,
    pub distance_km: f64,
}

/// Round to nearest integer, with exact halves toward the lower value.
fn round_half_down(x: f64) -> i64 {
    (x - 0.5).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_degree_global() -> RegularGrid {
        RegularGrid {
            lat_step: 1.0,
            lon_step: 1.0,
            lat_origin: -89.5,
            lon_origin: -179.5,
            n_lat: 180,
            n_lon: 360,
        }
    }

    #[test]
    fn test_resolve_exact_grid_point() {
        let grid = one_degree_global();
        let coord = Coordinate::normalize(0.5, 0.5).unwrap();
        let cell = grid.resolve(&coord);

        assert_eq!(cell.index, GridIndex::Cell { row: 90, col: 180 });
        assert_eq!(cell.coordinate.latitude, 0.5);
        assert_eq!(cell.coordinate.longitude, 0.5);
        assert_eq!(cell.distance_km, 0.0);
    }

    #[test]
    fn test_resolve_rounds_to_nearest() {
        let grid = one_degree_global();
        let coord = Coordinate::normalize(0.8, 0.1).unwrap();
        let cell = grid.resolve(&coord);

        // 0.8 is nearer 0.5 than 1.5; 0.1 is nearer 0.5 than -0.5.
        assert_eq!(cell.index, GridIndex::Cell { row: 90, col: 180 });
    }

    #[test]
    fn test_resolve_tie_rounds_down() {
        let grid = one_degree_global();
        // 0.0 lies exactly between grid points -0.5 and 0.5.
        let coord = Coordinate::normalize(0.0, 0.0).unwrap();
        let cell = grid.resolve(&coord);

        assert_eq!(cell.index, GridIndex::Cell { row: 89, col: 179 });
        assert_eq!(cell.coordinate.latitude, -0.5);
        assert_eq!(cell.coordinate.longitude, -0.5);
    }

    #[test]
    fn test_resolve_clamps_to_bounds() {
        let grid = RegularGrid {
            lat_step: 1.0,
            lon_step: 1.0,
            lat_origin: 10.0,
            lon_origin: 20.0,
            n_lat: 5,
            n_lon: 5,
        };
        let coord = Coordinate::normalize(50.0, 90.0).unwrap();
        let cell = grid.resolve(&coord);

        assert_eq!(cell.index, GridIndex::Cell { row: 4, col: 4 });
        assert_eq!(cell.coordinate.latitude, 14.0);
        assert_eq!(cell.coordinate.longitude, 24.0);
    }

    #[test]
    fn test_resolve_distance_within_half_diagonal() {
        let grid = one_degree_global();
        // Half diagonal of a 1°x1° cell near the equator is ~78.6 km.
        let half_diagonal_km = 0.5 * (2.0_f64).sqrt() * 111.32;

        for (lat, lon) in [(0.1, 0.2), (0.49, -0.49), (1.2, 3.9), (-0.01, 0.99)] {
            let coord = Coordinate::normalize(lat, lon).unwrap();
            let cell = grid.resolve(&coord);
            assert!(cell.distance_km >= 0.0);
            assert!(
                cell.distance_km <= half_diagonal_km,
                "({}, {}) -> {} km",
                lat,
                lon,
                cell.distance_km
            );
        }
    }

    #[test]
    fn test_resolve_empty_grid_does_not_panic() {
        let grid = RegularGrid {
            lat_step: 1.0,
            lon_step: 1.0,
            lat_origin: 0.0,
            lon_origin: 0.0,
            n_lat: 0,
            n_lon: 0,
        };
        let coord = Coordinate::normalize(2.0, 2.0).unwrap();
        let cell = grid.resolve(&coord);
        assert_eq!(cell.index, GridIndex::Cell { row: 0, col: 0 });
    }

    #[test]
    fn test_flat_index_row_major() {
        let desc = GridDescriptor {
            id: "sst".to_string(),
            kind: GridKind::Regular(one_degree_global()),
            variables: vec![],
            fill_value: -9999.0,
        };
        assert_eq!(desc.flat_index(&GridIndex::Cell { row: 0, col: 0 }), 0);
        assert_eq!(desc.flat_index(&GridIndex::Cell { row: 1, col: 0 }), 360);
        assert_eq!(desc.flat_index(&GridIndex::Cell { row: 2, col: 5 }), 725);
        assert_eq!(desc.cells(), 180 * 360);
    }

    #[test]
    fn test_point_samples_nearest() {
        let desc = GridDescriptor {
            id: "buoys".to_string(),
            kind: GridKind::PointSamples {
                samples: vec![
                    SamplePoint { latitude: 10.0, longitude: 10.0 },
                    SamplePoint { latitude: 20.0, longitude: 20.0 },
                    SamplePoint { latitude: 30.0, longitude: 30.0 },
                ],
            },
            variables: vec![],
            fill_value: -9999.0,
        };

        let coord = Coordinate::normalize(19.0, 21.0).unwrap();
        let cell = desc.resolve(&coord);

        assert_eq!(cell.index, GridIndex::Sample { index: 1 });
        assert_eq!(cell.coordinate.latitude, 20.0);
        assert!(cell.distance_km > 0.0);
        assert_eq!(desc.flat_index(&cell.index), 1);
    }

    #[test]
    fn test_round_half_down() {
        assert_eq!(round_half_down(2.5), 2);
        assert_eq!(round_half_down(2.51), 3);
        assert_eq!(round_half_down(2.49), 2);
        assert_eq!(round_half_down(-0.5), -1);
        assert_eq!(round_half_down(0.0), 0);
    }
}
