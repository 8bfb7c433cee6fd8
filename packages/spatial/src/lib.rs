#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for source boundary polygons.
//!
//! Block Group polygons arrive from a provider query that is usually
//! wider than the grid cell. This crate bulk-loads their bounding boxes
//! into an R-tree so that only polygons whose envelope touches the cell
//! are projected and clipped. Also converts `GeoJSON` geometry into
//! `geo` multipolygons.

use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{AABB, RTree, RTreeObject};

/// A polygon's bounding box and its position in the caller's slice.
struct BoundaryEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Envelope index over a slice of polygons.
///
/// Stores positions rather than geometry, so the caller keeps ownership
/// of its polygons and looks them up by the returned indices.
pub struct BoundaryIndex {
    tree: RTree<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Bulk-loads the envelopes of `polygons`. Empty polygons are skipped.
    pub fn build<'a, I>(polygons: I) -> Self
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        let entries: Vec<BoundaryEntry> = polygons
            .into_iter()
            .enumerate()
            .filter_map(|(position, polygon)| {
                let Some(envelope) = compute_envelope(polygon) else {
                    log::debug!("Skipping empty boundary at position {position}");
                    return None;
                };
                Some(BoundaryEntry { position, envelope })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed (non-empty) polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether no polygons were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Positions of polygons whose envelope intersects `rect`, ascending.
    #[must_use]
    pub fn intersecting(&self, rect: Rect<f64>) -> Vec<usize> {
        let query = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.position)
            .collect();
        positions.sort_unstable();
        positions
    }
}

/// Convert a `GeoJSON` geometry into a [`MultiPolygon`].
///
/// Returns `None` for anything other than `Polygon` or `MultiPolygon`.
#[must_use]
pub fn geometry_to_multipolygon(geom: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, polygon};

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]])
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    #[test]
    fn finds_overlapping_envelopes_in_order() {
        let polygons = [
            square(10.0, 10.0, 1.0),
            square(0.0, 0.0, 1.0),
            square(0.5, 0.5, 1.0),
        ];
        let index = BoundaryIndex::build(&polygons);
        assert_eq!(index.len(), 3);
        assert_eq!(index.intersecting(rect(0.2, 0.2, 0.8, 0.8)), vec![1, 2]);
        assert_eq!(index.intersecting(rect(10.5, 10.5, 11.5, 11.5)), vec![0]);
        assert!(index.intersecting(rect(5.0, 5.0, 6.0, 6.0)).is_empty());
    }

    #[test]
    fn skips_empty_polygons() {
        let polygons = [MultiPolygon::<f64>(vec![]), square(0.0, 0.0, 1.0)];
        let index = BoundaryIndex::build(&polygons);
        assert_eq!(index.len(), 1);
        assert_eq!(index.intersecting(rect(0.0, 0.0, 1.0, 1.0)), vec![1]);
    }

    #[test]
    fn empty_index() {
        let index = BoundaryIndex::build(&Vec::<MultiPolygon<f64>>::new());
        assert!(index.is_empty());
        assert!(index.intersecting(rect(0.0, 0.0, 1.0, 1.0)).is_empty());
    }

    fn parse_geometry(json: &str) -> geojson::Geometry {
        let parsed: geojson::GeoJson = json.parse().unwrap();
        geojson::Geometry::try_from(parsed).unwrap()
    }

    #[test]
    fn converts_polygon_geometry() {
        let mp = geometry_to_multipolygon(parse_geometry(
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#,
        ))
        .unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn converts_multipolygon_geometry() {
        let mp = geometry_to_multipolygon(parse_geometry(
            r#"{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,1],[0,0]]],
                [[[2,2],[3,2],[3,3],[2,3],[2,2]]]
            ]}"#,
        ))
        .unwrap();
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn rejects_non_polygon_geometry() {
        assert!(
            geometry_to_multipolygon(parse_geometry(r#"{"type":"Point","coordinates":[0,0]}"#))
                .is_none()
        );
    }
}
