#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic point and projected coordinate system types.
//!
//! These types describe where a grid cell sits on the globe and which
//! locally-accurate planar system its geometry is measured in. They carry
//! no projection math; see `grid_stats_geometry` for that.

use serde::{Deserialize, Serialize};

/// Smallest allowed grid cell side length, in kilometers.
pub const MIN_CELL_KM: f64 = 0.1;

/// Largest allowed grid cell side length, in kilometers.
pub const MAX_CELL_KM: f64 = 10.0;

/// Default grid cell side length, in kilometers.
pub const DEFAULT_CELL_KM: f64 = 1.0;

/// A WGS84 longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point without validating its range.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// Which side of the equator a UTM zone is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    /// Latitude >= 0.
    North,
    /// Latitude < 0. Northings carry the `+south` offset.
    South,
}

/// A Universal Transverse Mercator zone on the WGS84 ellipsoid.
///
/// Chosen once per request from the cell's center point and never
/// changed afterwards, so every projection within a request agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectedCrs {
    /// Zone number, 1 through 60.
    pub zone: u8,
    /// Hemisphere the northing is measured from.
    pub hemisphere: Hemisphere,
}

impl ProjectedCrs {
    /// EPSG code of the equivalent WGS84 / UTM definition
    /// (`326zz` north, `327zz` south).
    #[must_use]
    pub const fn epsg(&self) -> u32 {
        let base = match self.hemisphere {
            Hemisphere::North => 32_600,
            Hemisphere::South => 32_700,
        };
        base + self.zone as u32
    }
}

impl std::fmt::Display for ProjectedCrs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
