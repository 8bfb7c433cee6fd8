//! Overlap of source polygons with a grid cell.

use std::collections::BTreeMap;

use geo::{Area, BooleanOps, MapCoords, MultiPolygon};
use grid_stats_aggregate_models::AttributeValue;
use grid_stats_geometry::{GeometryError, GridCell};
use grid_stats_geometry_models::GeoPoint;
use grid_stats_spatial::BoundaryIndex;

use crate::{AggregateError, SourcePolygon};

/// Overlaps below this area, in square kilometers, are dropped.
pub const NEGLIGIBLE_OVERLAP_KM2: f64 = 1e-6;

const SQ_METERS_PER_SQ_KM: f64 = 1_000_000.0;

/// One source polygon's share of the cell.
///
/// Borrows the source it was computed from; it only lives for the
/// duration of an aggregation.
#[derive(Debug, Clone, Copy)]
pub struct WeightedContribution<'a> {
    source: &'a SourcePolygon,
    overlap_area_km2: f64,
    overlap_fraction: f64,
}

impl<'a> WeightedContribution<'a> {
    #[cfg(test)]
    pub(crate) const fn new(
        source: &'a SourcePolygon,
        overlap_area_km2: f64,
        overlap_fraction: f64,
    ) -> Self {
        Self {
            source,
            overlap_area_km2,
            overlap_fraction,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &'a SourcePolygon {
        self.source
    }

    #[must_use]
    pub fn geoid(&self) -> &'a str {
        self.source.geoid()
    }

    /// Planar intersection area with the cell.
    #[must_use]
    pub const fn overlap_area_km2(&self) -> f64 {
        self.overlap_area_km2
    }

    /// `overlap_area / cell_area`, in `(0, 1]`.
    #[must_use]
    pub const fn overlap_fraction(&self) -> f64 {
        self.overlap_fraction
    }

    #[must_use]
    pub const fn values(&self) -> &'a BTreeMap<String, AttributeValue> {
        self.source.values()
    }
}

/// Clips every source against `cell` and returns the non-negligible
/// overlaps, ordered by GEOID.
///
/// Sources whose bounding box misses the cell's padded geographic bounds
/// are discarded before any projection. The rest are projected into the
/// cell's UTM zone and intersected with the planar square, so every area
/// is in the same metric system as the cell itself. A source without a
/// meaningful overlap produces no entry at all.
///
/// # Errors
///
/// Returns [`AggregateError::Geometry`] if a source vertex fails to
/// project.
pub fn weight_sources<'a>(
    cell: &GridCell,
    sources: &'a [SourcePolygon],
) -> Result<Vec<WeightedContribution<'a>>, AggregateError> {
    let cell_area_km2 = cell.area_km2();
    let index = BoundaryIndex::build(sources.iter().map(SourcePolygon::geometry));
    let candidates = index.intersecting(cell.geographic_bounds());

    log::debug!(
        "{} of {} Block Groups have envelopes touching the cell",
        candidates.len(),
        sources.len()
    );

    let mut contributions: Vec<WeightedContribution<'a>> = Vec::with_capacity(candidates.len());

    for position in candidates {
        let source = &sources[position];
        let overlap_area_km2 = planar_overlap_km2(cell, source.geometry())?;

        if overlap_area_km2 < NEGLIGIBLE_OVERLAP_KM2 {
            log::debug!(
                "Dropping Block Group {}: overlap {overlap_area_km2:.3e} km2",
                source.geoid()
            );
            continue;
        }

        contributions.push(WeightedContribution {
            source,
            overlap_area_km2,
            overlap_fraction: (overlap_area_km2 / cell_area_km2).min(1.0),
        });
    }

    contributions.sort_by(|a, b| a.geoid().cmp(b.geoid()));

    log::debug!(
        "{} Block Groups contribute, coverage {:.4}",
        contributions.len(),
        contributions
            .iter()
            .map(WeightedContribution::overlap_fraction)
            .sum::<f64>()
    );

    Ok(contributions)
}

fn planar_overlap_km2(
    cell: &GridCell,
    geometry: &MultiPolygon<f64>,
) -> Result<f64, GeometryError> {
    let transformer = cell.transformer();
    let projected =
        geometry.try_map_coords(|c| transformer.project(GeoPoint::new(c.x, c.y)))?;
    let clipped = projected.intersection(cell.planar_polygon());
    Ok(clipped.unsigned_area() / SQ_METERS_PER_SQ_KM)
}
