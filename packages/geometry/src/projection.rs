//! UTM zone selection and WGS84 to UTM transforms.
//!
//! Transforms go through `proj4rs` with proj strings derived from the
//! selected [`ProjectedCrs`]. Cells are at most 10 km across, so every
//! vertex a request touches is projected with the zone of the cell's
//! center.

use geo::Coord;
use grid_stats_geometry_models::{GeoPoint, Hemisphere, ProjectedCrs};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::GeometryError;

/// Geographic WGS84, longitude/latitude in radians on the `proj4rs` side.
const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Chooses the UTM zone and hemisphere for a point.
///
/// Zones are 6° wide starting at -180°; longitude 180° falls in zone 60.
/// Latitude 0 counts as the northern hemisphere.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidCoordinate`] if the point is outside
/// WGS84 bounds or not finite.
pub fn select_crs(point: GeoPoint) -> Result<ProjectedCrs, GeometryError> {
    if !point.is_valid() {
        return Err(GeometryError::InvalidCoordinate {
            longitude: point.longitude,
            latitude: point.latitude,
        });
    }

    let hemisphere = if point.latitude >= 0.0 {
        Hemisphere::North
    } else {
        Hemisphere::South
    };

    Ok(ProjectedCrs {
        zone: zone_for_longitude(point.longitude),
        hemisphere,
    })
}

/// UTM zone number for a longitude, clamped to `1..=60`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn zone_for_longitude(longitude: f64) -> u8 {
    let zone = ((longitude + 180.0) / 6.0).floor() + 1.0;
    zone.clamp(1.0, 60.0) as u8
}

/// The proj string for a UTM zone on the WGS84 datum.
#[must_use]
pub fn proj_string(crs: &ProjectedCrs) -> String {
    let south = match crs.hemisphere {
        Hemisphere::North => "",
        Hemisphere::South => " +south",
    };
    format!(
        "+proj=utm +zone={}{south} +datum=WGS84 +units=m +no_defs",
        crs.zone
    )
}

/// Reusable pair of WGS84 and UTM projections for one zone.
pub struct UtmTransformer {
    crs: ProjectedCrs,
    geographic: Proj,
    planar: Proj,
}

impl std::fmt::Debug for UtmTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtmTransformer")
            .field("crs", &self.crs)
            .finish_non_exhaustive()
    }
}

impl UtmTransformer {
    /// Initializes both projections for `crs`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Projection`] if `proj4rs` rejects either
    /// definition.
    pub fn new(crs: ProjectedCrs) -> Result<Self, GeometryError> {
        let geographic =
            Proj::from_proj_string(WGS84_PROJ).map_err(|e| projection_error(&crs, &e))?;
        let planar = Proj::from_proj_string(&proj_string(&crs))
            .map_err(|e| projection_error(&crs, &e))?;

        Ok(Self {
            crs,
            geographic,
            planar,
        })
    }

    #[must_use]
    pub const fn crs(&self) -> ProjectedCrs {
        self.crs
    }

    /// Projects a geographic point into easting/northing meters.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Projection`] if the transform fails.
    pub fn project(&self, point: GeoPoint) -> Result<Coord<f64>, GeometryError> {
        let mut xyz = (point.longitude.to_radians(), point.latitude.to_radians(), 0.0);
        transform(&self.geographic, &self.planar, &mut xyz)
            .map_err(|e| projection_error(&self.crs, &e))?;
        Ok(Coord { x: xyz.0, y: xyz.1 })
    }

    /// Converts easting/northing meters back to a geographic point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Projection`] if the transform fails.
    pub fn unproject(&self, coord: Coord<f64>) -> Result<GeoPoint, GeometryError> {
        let mut xyz = (coord.x, coord.y, 0.0);
        transform(&self.planar, &self.geographic, &mut xyz)
            .map_err(|e| projection_error(&self.crs, &e))?;
        Ok(GeoPoint::new(xyz.0.to_degrees(), xyz.1.to_degrees()))
    }
}

/// One-off forward transform. Prefer a [`UtmTransformer`] for many points.
///
/// # Errors
///
/// Returns [`GeometryError::Projection`] if the transform fails.
pub fn project(crs: &ProjectedCrs, point: GeoPoint) -> Result<Coord<f64>, GeometryError> {
    UtmTransformer::new(*crs)?.project(point)
}

/// One-off inverse transform. Prefer a [`UtmTransformer`] for many points.
///
/// # Errors
///
/// Returns [`GeometryError::Projection`] if the transform fails.
pub fn unproject(crs: &ProjectedCrs, coord: Coord<f64>) -> Result<GeoPoint, GeometryError> {
    UtmTransformer::new(*crs)?.unproject(coord)
}

fn projection_error(crs: &ProjectedCrs, e: &impl std::fmt::Debug) -> GeometryError {
    GeometryError::Projection {
        crs: crs.to_string(),
        message: format!("{e:?}"),
    }
}
