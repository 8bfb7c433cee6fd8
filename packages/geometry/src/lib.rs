#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metric grid cell construction.
//!
//! Picks a UTM zone for a center point, builds a square of exact side
//! length in that zone, and re-projects its boundary to longitude and
//! latitude for reporting. All areas downstream are measured in the
//! same zone.

pub mod cell;
pub mod projection;

pub use cell::{GridCell, build_cell};
pub use projection::{UtmTransformer, project, proj_string, select_crs, unproject};

use thiserror::Error;

/// Errors that can occur while building grid cell geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Longitude or latitude outside WGS84 bounds, or not finite.
    #[error("Invalid coordinate: longitude={longitude}, latitude={latitude}")]
    InvalidCoordinate {
        /// Offending longitude.
        longitude: f64,
        /// Offending latitude.
        latitude: f64,
    },

    /// Cell side length outside `[0.1, 10.0]` km.
    #[error("Invalid cell size: {side_km} km (expected 0.1 to 10.0)")]
    InvalidCellSize {
        /// Requested side length in kilometers.
        side_km: f64,
    },

    /// The constructed cell's planar area disagrees with `side_km²`.
    #[error("Geometry invariant violated: expected {expected_km2} km2, computed {actual_km2} km2")]
    GeometryInvariantViolation {
        /// `side_km²`.
        expected_km2: f64,
        /// Shoelace area of the constructed polygon.
        actual_km2: f64,
    },

    /// `proj4rs` rejected a projection definition or a transform.
    #[error("Projection error in {crs}: {message}")]
    Projection {
        /// The zone being used, as `EPSG:326zz`/`EPSG:327zz`.
        crs: String,
        /// The underlying `proj4rs` error.
        message: String,
    },
}
