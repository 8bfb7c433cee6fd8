//! Square grid cells of exact metric side length.

use geo::{BoundingRect, Coord, Densify, Euclidean, LineString, MapCoords, Polygon, Rect};
use grid_stats_geometry_models::{GeoPoint, MAX_CELL_KM, MIN_CELL_KM, ProjectedCrs};

use crate::GeometryError;
use crate::projection::{UtmTransformer, select_crs};

/// Relative tolerance between the shoelace area and `side_km²`.
const AREA_TOLERANCE: f64 = 1e-3;

const SQ_METERS_PER_SQ_KM: f64 = 1_000_000.0;

/// Longest planar segment, in meters, of the outline used for the
/// geographic bounding box.
const OUTLINE_STEP_M: f64 = 100.0;

/// Padding, in degrees, added on every side of the geographic bounding
/// box. Planar edges are curves in longitude/latitude; the padding
/// covers whatever the densified outline still cuts off.
pub const BOUNDS_MARGIN_DEG: f64 = 1e-4;

/// A square cell centered on a point, axis-aligned to its UTM grid.
///
/// Built once per request and read-only afterwards.
#[derive(Debug)]
pub struct GridCell {
    side_km: f64,
    center: GeoPoint,
    transformer: UtmTransformer,
    planar: Polygon<f64>,
    geographic: Polygon<f64>,
    geographic_bounds: Rect<f64>,
    area_km2: f64,
}

impl GridCell {
    /// Side length in kilometers.
    #[must_use]
    pub const fn side_km(&self) -> f64 {
        self.side_km
    }

    /// The requested center point.
    #[must_use]
    pub const fn center(&self) -> GeoPoint {
        self.center
    }

    /// The UTM zone every geometry of this request is measured in.
    #[must_use]
    pub const fn crs(&self) -> ProjectedCrs {
        self.transformer.crs()
    }

    /// Transforms for this cell's zone.
    #[must_use]
    pub const fn transformer(&self) -> &UtmTransformer {
        &self.transformer
    }

    /// Cell boundary in easting/northing meters.
    #[must_use]
    pub const fn planar_polygon(&self) -> &Polygon<f64> {
        &self.planar
    }

    /// Cell boundary re-projected to longitude/latitude.
    #[must_use]
    pub const fn geographic_polygon(&self) -> &Polygon<f64> {
        &self.geographic
    }

    /// Padded longitude/latitude box containing the whole cell, edges
    /// included.
    #[must_use]
    pub const fn geographic_bounds(&self) -> Rect<f64> {
        self.geographic_bounds
    }

    /// Planar area in square kilometers.
    #[must_use]
    pub const fn area_km2(&self) -> f64 {
        self.area_km2
    }

    /// Projects a geographic point into this cell's planar system.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Projection`] if the transform fails.
    pub fn project(&self, point: GeoPoint) -> Result<Coord<f64>, GeometryError> {
        self.transformer.project(point)
    }

    /// Closed `[longitude, latitude]` ring, counter-clockwise from the
    /// south-west corner.
    #[must_use]
    pub fn boundary_ring(&self) -> Vec<[f64; 2]> {
        self.geographic
            .exterior()
            .coords()
            .map(|c| [c.x, c.y])
            .collect()
    }
}

/// Builds a square of `side_km` kilometers centered on `center`.
///
/// The square is constructed in the UTM zone of the center, so its sides
/// follow grid north rather than true north. Grid convergence is a
/// fraction of a degree for cells this small.
///
/// # Errors
///
/// * [`GeometryError::InvalidCellSize`] if `side_km` is outside
///   `[0.1, 10.0]` or not finite.
/// * [`GeometryError::InvalidCoordinate`] if `center` is out of range.
/// * [`GeometryError::Projection`] if the zone cannot be initialized or
///   a corner fails to transform.
/// * [`GeometryError::GeometryInvariantViolation`] if the planar area of
///   the constructed square disagrees with `side_km²` by more than 0.1%.
pub fn build_cell(center: GeoPoint, side_km: f64) -> Result<GridCell, GeometryError> {
    if !side_km.is_finite() || !(MIN_CELL_KM..=MAX_CELL_KM).contains(&side_km) {
        return Err(GeometryError::InvalidCellSize { side_km });
    }

    let crs = select_crs(center)?;
    let transformer = UtmTransformer::new(crs)?;
    let origin = transformer.project(center)?;
    let half = side_km * 1000.0 / 2.0;

    let corners = [
        Coord {
            x: origin.x - half,
            y: origin.y - half,
        },
        Coord {
            x: origin.x + half,
            y: origin.y - half,
        },
        Coord {
            x: origin.x + half,
            y: origin.y + half,
        },
        Coord {
            x: origin.x - half,
            y: origin.y + half,
        },
        Coord {
            x: origin.x - half,
            y: origin.y - half,
        },
    ];

    let expected_km2 = side_km * side_km;
    let area_km2 = shoelace_area(&corners) / SQ_METERS_PER_SQ_KM;

    if ((area_km2 - expected_km2) / expected_km2).abs() > AREA_TOLERANCE {
        log::error!(
            "Grid cell area mismatch: center=({}, {}) crs={crs} side_km={side_km} \
             expected={expected_km2} km2 actual={area_km2} km2",
            center.longitude,
            center.latitude,
        );
        return Err(GeometryError::GeometryInvariantViolation {
            expected_km2,
            actual_km2: area_km2,
        });
    }

    let planar = Polygon::new(LineString::from(corners.to_vec()), vec![]);
    let to_geographic = |c: Coord<f64>| {
        transformer.unproject(c).map(|point| Coord {
            x: point.longitude,
            y: point.latitude,
        })
    };

    let geographic = planar.try_map_coords(to_geographic)?;
    let outline = Euclidean
        .densify(&planar, OUTLINE_STEP_M)
        .try_map_coords(to_geographic)?;
    let geographic_bounds = outline
        .bounding_rect()
        .map_or_else(
            || {
                let c = Coord {
                    x: center.longitude,
                    y: center.latitude,
                };
                padded(Rect::new(c, c))
            },
            padded,
        );

    log::debug!(
        "Built {side_km} km grid cell at ({}, {}) in {crs}",
        center.longitude,
        center.latitude,
    );

    Ok(GridCell {
        side_km,
        center,
        transformer,
        planar,
        geographic,
        geographic_bounds,
        area_km2,
    })
}

/// Unsigned shoelace area of a closed ring, in the ring's squared units.
#[must_use]
pub fn shoelace_area(ring: &[Coord<f64>]) -> f64 {
    let twice: f64 = ring
        .windows(2)
        .map(|pair| pair[0].x * pair[1].y - pair[1].x * pair[0].y)
        .sum();
    (twice / 2.0).abs()
}

fn padded(rect: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - BOUNDS_MARGIN_DEG,
            y: rect.min().y - BOUNDS_MARGIN_DEG,
        },
        Coord {
            x: rect.max().x + BOUNDS_MARGIN_DEG,
            y: rect.max().y + BOUNDS_MARGIN_DEG,
        },
    )
}
