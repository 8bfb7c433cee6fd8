//! Flat single-row CSV rendering of a [`GridStatsReport`].
//!
//! Absent statistics are written as empty fields, never as `0`. Income
//! bracket columns follow the catalog's bracket keys, so the header is
//! fixed for a given catalog.

use std::io::Write;

use grid_stats_lodes_models::{EarningsBand, JobTotals};

use crate::GridStatsReport;

/// Writes the header and the single data row for `report`.
///
/// # Errors
///
/// Returns [`csv::Error`] if writing to `writer` fails.
pub fn write_csv<W: Write>(report: &GridStatsReport, writer: W) -> Result<(), csv::Error> {
    let columns = columns(report);

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(columns.iter().map(|(name, _)| name.as_str()))?;
    writer.write_record(columns.iter().map(|(_, value)| value.as_str()))?;
    writer.flush()?;

    Ok(())
}

/// Column names in output order.
#[must_use]
pub fn csv_header(report: &GridStatsReport) -> Vec<String> {
    columns(report).into_iter().map(|(name, _)| name).collect()
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn earnings(jobs: Option<&JobTotals>, band: EarningsBand) -> String {
    jobs.and_then(|totals| totals.earnings_bands.get(&band))
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn columns(report: &GridStatsReport) -> Vec<(String, String)> {
    let metrics = &report.metrics;
    let age = &metrics.population.age;
    let age_pct = &metrics.population.age_pct;
    let employment = &metrics.employment;
    let housing = &metrics.housing;
    let units = &housing.units_in_structure;
    let avg_size = &metrics.households.avg_size;
    let jobs = metrics.jobs_workplace.as_ref();

    let head: Vec<(&str, String)> = vec![
        ("lat", report.input.lat.to_string()),
        ("lon", report.input.lon.to_string()),
        ("cell_km", report.input.cell_km.to_string()),
        ("area_km2", report.area.area_km2.to_string()),
        ("projected_crs", report.area.projected_crs.clone()),
        (
            "block_groups",
            report.area.intersecting_block_groups.len().to_string(),
        ),
        ("population_total", number(metrics.population.total)),
        ("households_total", number(metrics.households.total)),
        ("age_0_4", number(age.age_0_4)),
        ("age_5_14", number(age.age_5_14)),
        ("age_15_24", number(age.age_15_24)),
        ("age_25_44", number(age.age_25_44)),
        ("age_45_64", number(age.age_45_64)),
        ("age_65p", number(age.age_65p)),
        ("age_pct_0_4", number(age_pct.age_0_4)),
        ("age_pct_5_14", number(age_pct.age_5_14)),
        ("age_pct_15_24", number(age_pct.age_15_24)),
        ("age_pct_25_44", number(age_pct.age_25_44)),
        ("age_pct_45_64", number(age_pct.age_45_64)),
        ("age_pct_65p", number(age_pct.age_65p)),
        ("income_median", number(metrics.income.median)),
        ("income_mean", number(metrics.income.mean)),
    ];

    let mut columns: Vec<(String, String)> = head
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    for bracket in &metrics.income.brackets {
        columns.push((format!("inc_{}", bracket.key), number(bracket.households)));
    }
    for bracket in &metrics.income.brackets {
        columns.push((format!("inc_pct_{}", bracket.key), number(bracket.pct)));
    }

    let tail: Vec<(&str, String)> = vec![
        ("labor_force", number(employment.labor_force)),
        ("employed", number(employment.employed)),
        ("unemployed", number(employment.unemployed)),
        (
            "unemployment_rate",
            number(employment.unemployment_rate.map(|r| r * 100.0)),
        ),
        ("edu_hs_or_less", number(metrics.education.hs_or_less)),
        ("edu_some_college", number(metrics.education.some_college)),
        ("edu_ba_plus", number(metrics.education.ba_plus)),
        ("housing_units", number(housing.units_total)),
        ("occupied", number(housing.occupied)),
        ("vacant", number(housing.vacant)),
        ("owner", number(housing.tenure.owner)),
        ("renter", number(housing.tenure.renter)),
        ("units_1_det", number(units.one_detached)),
        ("units_1_att", number(units.one_attached)),
        ("units_2", number(units.two_units)),
        ("units_3_4", number(units.three_to_four)),
        ("units_5_9", number(units.five_to_nine)),
        ("units_10_19", number(units.ten_to_nineteen)),
        ("units_20p", number(units.twenty_plus)),
        ("units_mobile_other", number(units.mobile_other)),
        ("avg_hh_size_overall", number(avg_size.overall)),
        ("avg_hh_size_owner", number(avg_size.owner)),
        ("avg_hh_size_renter", number(avg_size.renter)),
        ("median_gross_rent", number(metrics.costs.median_gross_rent)),
        ("median_home_value", number(metrics.costs.median_home_value)),
        (
            "rent_burden_gt30_pct",
            number(metrics.costs.rent_burden_pct.gt_30),
        ),
        (
            "rent_burden_gt50_pct",
            number(metrics.costs.rent_burden_pct.gt_50),
        ),
        (
            "jobs_total",
            jobs.map(|totals| totals.total_jobs.to_string())
                .unwrap_or_default(),
        ),
        ("E1_lt_1250", earnings(jobs, EarningsBand::E1)),
        ("E2_1251_3333", earnings(jobs, EarningsBand::E2)),
        ("E3_gt_3333", earnings(jobs, EarningsBand::E3)),
        ("partial_coverage", metrics.partial_coverage.to_string()),
    ];

    columns.extend(
        tail.into_iter()
            .map(|(name, value)| (name.to_string(), value)),
    );
    columns
}
