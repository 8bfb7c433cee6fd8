#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Areal weighting of Block Group statistics onto a grid cell.
//!
//! Source polygons are validated against the [`VariableCatalog`] when
//! they are ingested, clipped against the cell in its planar system, and
//! their attributes combined by one generic rule per reduction kind.
//! Weights are overlap area over cell area. Population-weighted
//! interpolation is not attempted.

pub mod bundle;
pub mod catalog;
pub mod ingest;
pub mod reduce;
pub mod weighting;

pub use catalog::VariableCatalog;
pub use ingest::{SourcePolygon, group_by_county, sources_from_geojson};
pub use reduce::reduce;
pub use weighting::{WeightedContribution, weight_sources};

use grid_stats_geometry::GeometryError;
use thiserror::Error;

/// Errors that can occur while ingesting or aggregating Block Group data.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A source identifier is not a 12-digit Block Group GEOID.
    #[error("Invalid Block Group GEOID: {geoid:?}")]
    InvalidGeoid {
        /// The rejected identifier.
        geoid: String,
    },

    /// A source carries a variable the catalog does not define.
    #[error("Unknown variable {variable} on Block Group {geoid}")]
    UnknownVariable {
        /// Source GEOID.
        geoid: String,
        /// The unrecognized variable name.
        variable: String,
    },

    /// A source geometry is empty, not polygonal, or has invalid
    /// coordinates.
    #[error("Invalid geometry for Block Group {geoid}: {message}")]
    InvalidGeometry {
        /// Source GEOID.
        geoid: String,
        /// What was wrong with it.
        message: String,
    },

    /// The variable catalog failed to parse or validate.
    #[error("Catalog error: {message}")]
    Catalog {
        /// Description of the problem.
        message: String,
    },

    /// The `GeoJSON` document could not be parsed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Grid cell construction failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
