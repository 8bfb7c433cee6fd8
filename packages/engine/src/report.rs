//! Request and report types for a single grid cell.

use grid_stats_aggregate_models::MetricBundle;
use grid_stats_geometry_models::DEFAULT_CELL_KM;
use serde::{Deserialize, Serialize};

/// Coordinate reference system of every reported boundary.
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

/// Name of the interpolation method, reported verbatim.
pub const ESTIMATION_METHOD: &str = "areal_weighting";

/// A grid cell statistics request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStatsRequest {
    /// Center latitude in degrees.
    pub lat: f64,
    /// Center longitude in degrees.
    pub lon: f64,
    /// Cell side length in kilometers.
    #[serde(default = "default_cell_km")]
    pub cell_km: f64,
}

const fn default_cell_km() -> f64 {
    DEFAULT_CELL_KM
}

impl GridStatsRequest {
    /// A request for the default 1 km cell.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            cell_km: DEFAULT_CELL_KM,
        }
    }

    #[must_use]
    pub const fn with_cell_km(mut self, cell_km: f64) -> Self {
        self.cell_km = cell_km;
        self
    }
}

/// Echo of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub lat: f64,
    pub lon: f64,
    pub cell_km: f64,
    /// Whether job records were supplied.
    pub include_lodes: bool,
}

/// A Block Group overlapping the cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectingBlockGroup {
    pub geoid: String,
    pub state: String,
    pub county: String,
    pub tract: String,
    pub block_group: String,
    pub overlap_km2: f64,
    /// Overlap area over cell area.
    pub fraction: f64,
}

/// Where the cell is and what it overlaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportArea {
    /// Planar area in the projected system.
    pub area_km2: f64,
    /// Always [`GEOGRAPHIC_CRS`].
    pub crs: String,
    /// The UTM zone areas were measured in, as `EPSG:326zz`/`EPSG:327zz`.
    pub projected_crs: String,
    /// Closed `[lon, lat]` ring.
    pub boundary: Vec<[f64; 2]>,
    /// In GEOID order.
    pub intersecting_block_groups: Vec<IntersectingBlockGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimation {
    pub method: String,
    pub notes: String,
}

/// Everything computed for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridStatsReport {
    pub input: ReportInput,
    pub area: ReportArea,
    pub estimation: Estimation,
    pub metrics: MetricBundle,
}
