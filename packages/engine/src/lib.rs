#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid cell statistics pipeline.
//!
//! Builds the cell, weights the supplied Block Groups against it, reduces
//! their attributes, and optionally sums workplace jobs for the
//! overlapping Block Groups. [`write_csv`] flattens a report into one
//! CSV row. Performs no I/O: polygons, values and job
//! records are fetched by the caller. Every call owns its state, so
//! concurrent calls need no coordination.

pub mod export;
pub mod report;

pub use export::{csv_header, write_csv};

pub use report::{
    ESTIMATION_METHOD, Estimation, GEOGRAPHIC_CRS, GridStatsReport, GridStatsRequest,
    IntersectingBlockGroup, ReportArea, ReportInput,
};

use std::collections::BTreeSet;

use grid_stats_aggregate::{AggregateError, SourcePolygon, VariableCatalog};
use grid_stats_geometry::GeometryError;
use grid_stats_geometry_models::GeoPoint;
use grid_stats_lodes_models::JobRecord;
use thiserror::Error;

/// Errors that can occur while computing grid cell statistics.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid request geometry, or a failed geometry self-check.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Invalid Block Group input or catalog.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Computes the statistics report for one grid cell.
///
/// An empty intersection is not an error: the report carries an
/// all-`None` metric bundle with `no_data` set.
///
/// # Errors
///
/// * [`GeometryError::InvalidCoordinate`] for an out-of-range center.
/// * [`GeometryError::InvalidCellSize`] for `cell_km` outside `[0.1, 10]`.
/// * [`GeometryError::GeometryInvariantViolation`] if the constructed
///   cell fails its area self-check.
/// * [`GeometryError::Projection`] if a cell or source vertex cannot be
///   transformed, wrapped in [`EngineError::Aggregate`] for sources.
pub fn compute(
    request: &GridStatsRequest,
    sources: &[SourcePolygon],
    jobs: Option<&[JobRecord]>,
    catalog: &VariableCatalog,
) -> Result<GridStatsReport, EngineError> {
    let center = GeoPoint::new(request.lon, request.lat);
    let cell = grid_stats_geometry::build_cell(center, request.cell_km)?;

    log::info!(
        "Grid cell at ({}, {}), {} km, {}",
        request.lat,
        request.lon,
        request.cell_km,
        cell.crs()
    );

    let contributions = grid_stats_aggregate::weight_sources(&cell, sources)?;
    let mut metrics = grid_stats_aggregate::reduce(&contributions, catalog, cell.area_km2());

    let block_groups: BTreeSet<String> = contributions
        .iter()
        .map(|c| c.geoid().to_string())
        .collect();

    match jobs {
        Some(records) if !block_groups.is_empty() => {
            let totals = grid_stats_lodes::filter_and_sum(records, &block_groups);
            metrics.jobs_workplace = Some(totals);
        }
        Some(_) => log::debug!("No intersecting Block Groups; skipping workplace jobs"),
        None => {}
    }

    let intersecting_block_groups: Vec<IntersectingBlockGroup> = contributions
        .iter()
        .map(|contribution| {
            let geoid = contribution.source().parsed_geoid();
            IntersectingBlockGroup {
                geoid: contribution.geoid().to_string(),
                state: geoid.state.clone(),
                county: geoid.county.clone(),
                tract: geoid.tract.clone(),
                block_group: geoid.block_group.clone(),
                overlap_km2: contribution.overlap_area_km2(),
                fraction: contribution.overlap_fraction(),
            }
        })
        .collect();

    let notes = if contributions.is_empty() {
        log::warn!("No Block Groups intersect the grid cell");
        "No Census Block Groups found intersecting the grid cell".to_string()
    } else {
        format!(
            "Statistics from {} intersecting Census Block Groups with area-weighted aggregation",
            contributions.len()
        )
    };

    Ok(GridStatsReport {
        input: ReportInput {
            lat: request.lat,
            lon: request.lon,
            cell_km: request.cell_km,
            include_lodes: jobs.is_some(),
        },
        area: ReportArea {
            area_km2: cell.area_km2(),
            crs: GEOGRAPHIC_CRS.to_string(),
            projected_crs: cell.crs().to_string(),
            boundary: cell.boundary_ring(),
            intersecting_block_groups,
        },
        estimation: Estimation {
            method: ESTIMATION_METHOD.to_string(),
            notes,
        },
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, MultiPolygon, Polygon};
    use grid_stats_geometry::build_cell;
    use grid_stats_lodes_models::{AgeBand, EarningsBand, Sector};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    const LAT: f64 = 42.3601;
    const LON: f64 = -71.0589;

    /// Block Group covering planar offsets (meters) from the Boston cell
    /// center, expressed in longitude/latitude.
    fn block_group(
        catalog: &VariableCatalog,
        geoid: &str,
        (x0, y0, x1, y1): (f64, f64, f64, f64),
        values: &[(&str, Value)],
    ) -> SourcePolygon {
        let cell = build_cell(GeoPoint::new(LON, LAT), 1.0).unwrap();
        let origin = cell.project(cell.center()).unwrap();
        let ring: Vec<Coord<f64>> = [(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]
            .iter()
            .map(|&(dx, dy)| {
                let p = cell
                    .transformer()
                    .unproject(Coord {
                        x: origin.x + dx,
                        y: origin.y + dy,
                    })
                    .unwrap();
                Coord {
                    x: p.longitude,
                    y: p.latitude,
                }
            })
            .collect();

        SourcePolygon::new(
            geoid,
            MultiPolygon(vec![Polygon::new(LineString::from(ring), vec![])]),
            values
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            catalog,
        )
        .unwrap()
    }

    fn jobs(block_id: &str, total: u64) -> JobRecord {
        JobRecord {
            block_id: block_id.to_string(),
            total_jobs: total,
            earnings: BTreeMap::from([(EarningsBand::E3, total)]),
            ages: BTreeMap::from([(AgeBand::A2, total)]),
            sectors: BTreeMap::from([(Sector::HealthCare, total)]),
        }
    }

    fn close(actual: Option<f64>, expected: f64, tolerance: f64) -> bool {
        actual.is_some_and(|a| (a - expected).abs() < tolerance)
    }

    #[test]
    fn half_coverage_end_to_end() {
        let catalog = VariableCatalog::builtin();
        let sources = vec![
            block_group(
                &catalog,
                "250250303002",
                (0.0, -500.0, 1_000.0, 500.0),
                &[("B01003_001E", json!(1000)), ("B25064_001E", json!(2000))],
            ),
            block_group(
                &catalog,
                "250250303001",
                (-1_000.0, -500.0, 0.0, 500.0),
                &[("B01003_001E", json!(1000)), ("B25064_001E", json!(1000))],
            ),
            block_group(
                &catalog,
                "250250399001",
                (3_000.0, 3_000.0, 4_000.0, 4_000.0),
                &[("B01003_001E", json!(9999))],
            ),
        ];
        let records = vec![
            jobs("250250303001001", 10),
            jobs("250250303002004", 5),
            jobs("250250399001000", 1000),
        ];

        let report = compute(
            &GridStatsRequest::new(LAT, LON),
            &sources,
            Some(records.as_slice()),
            &catalog,
        )
        .unwrap();

        assert!(report.input.include_lodes);
        assert!((report.area.area_km2 - 1.0).abs() < 1e-9);
        assert_eq!(report.area.crs, "EPSG:4326");
        assert_eq!(report.area.projected_crs, "EPSG:32619");
        assert_eq!(report.area.boundary.len(), 5);
        assert_eq!(report.area.boundary[0], report.area.boundary[4]);

        let geoids: Vec<&str> = report
            .area
            .intersecting_block_groups
            .iter()
            .map(|bg| bg.geoid.as_str())
            .collect();
        assert_eq!(geoids, vec!["250250303001", "250250303002"]);
        assert_eq!(report.area.intersecting_block_groups[0].tract, "030300");
        for bg in &report.area.intersecting_block_groups {
            assert!((bg.fraction - 0.5).abs() < 1e-5);
        }

        let metrics = &report.metrics;
        assert!(!metrics.no_data);
        assert!(close(metrics.population.total, 1000.0, 1e-2));
        assert!(close(metrics.costs.median_gross_rent, 1500.0, 1e-2));
        assert!(close(metrics.population.coverage_ratio, 1.0, 1e-5));

        let totals = metrics.jobs_workplace.as_ref().unwrap();
        assert_eq!(totals.total_jobs, 15);
        assert_eq!(totals.by_sector[&Sector::HealthCare], 15);
        assert_eq!(totals.by_sector[&Sector::Mining], 0);
        assert_eq!(totals.earnings_bands[&EarningsBand::E1], 0);

        assert!(report.estimation.notes.contains('2'));
        assert_eq!(report.estimation.method, "areal_weighting");
    }

    #[test]
    fn empty_intersection_is_a_valid_report() {
        let catalog = VariableCatalog::builtin();
        let records = vec![jobs("250250303001001", 10)];

        let report = compute(
            &GridStatsRequest::new(LAT, LON),
            &[],
            Some(records.as_slice()),
            &catalog,
        )
        .unwrap();

        assert!(report.metrics.no_data);
        assert!(report.metrics.jobs_workplace.is_none());
        assert!(report.metrics.population.total.is_none());
        assert!(report.metrics.income.median.is_none());
        assert!(report.area.intersecting_block_groups.is_empty());
        assert!(report.estimation.notes.starts_with("No Census Block Groups"));
    }

    #[test]
    fn jobs_absent_without_records() {
        let catalog = VariableCatalog::builtin();
        let sources = vec![block_group(
            &catalog,
            "250250303001",
            (-600.0, -600.0, 600.0, 600.0),
            &[("B01003_001E", json!(1500))],
        )];

        let report = compute(&GridStatsRequest::new(LAT, LON), &sources, None, &catalog).unwrap();
        assert!(!report.input.include_lodes);
        assert!(report.metrics.jobs_workplace.is_none());
        assert!(close(report.metrics.population.total, 1500.0, 1e-3));
    }

    #[test]
    fn rejects_invalid_requests() {
        let catalog = VariableCatalog::builtin();
        assert!(matches!(
            compute(&GridStatsRequest::new(LAT, LON).with_cell_km(0.05), &[], None, &catalog),
            Err(EngineError::Geometry(GeometryError::InvalidCellSize { .. }))
        ));
        assert!(matches!(
            compute(&GridStatsRequest::new(91.0, LON), &[], None, &catalog),
            Err(EngineError::Geometry(GeometryError::InvalidCoordinate { .. }))
        ));
    }

    #[test]
    fn report_serializes_nested_tree() {
        let catalog = VariableCatalog::builtin();
        let report = compute(
            &GridStatsRequest::new(LAT, LON).with_cell_km(2.0),
            &[],
            None,
            &catalog,
        )
        .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["input"]["cell_km"], 2.0);
        assert_eq!(json["estimation"]["method"], "areal_weighting");
        assert!(json["metrics"]["population"]["total"].is_null());
        assert_eq!(json["metrics"]["no_data"], true);
        assert!((json["area"]["area_km2"].as_f64().unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn request_defaults_cell_size() {
        let request: GridStatsRequest =
            serde_json::from_str(r#"{"lat": 42.36, "lon": -71.06}"#).unwrap();
        assert!((request.cell_km - 1.0).abs() < f64::EPSILON);
    }
}
