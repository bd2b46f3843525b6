//! Common types and utilities shared across the ocean-query workspace.

pub mod coordinate;
pub mod error;
pub mod grid;
pub mod quality;

pub use coordinate::{haversine_km, Coordinate, EARTH_RADIUS_KM};
pub use error::{OceanError, OceanResult};
pub use grid::{GridDescriptor, GridIndex, GridKind, RegularGrid, ResolvedCell, SamplePoint};
pub use quality::{Quality, VariableSpec};
