//! Assembly of the typed [`MetricBundle`] from reduced metric keys.
//!
//! Derived ratios are computed from the combined numerators and
//! denominators, never by averaging per-Block-Group ratios.

use grid_stats_aggregate_models::{
    AgeDistribution, BracketEstimate, CostMetrics, EducationMetrics, EmploymentMetrics,
    HouseholdMetrics, HouseholdSize, HousingMetrics, IncomeMetrics, MetricBundle,
    PopulationMetrics, RentBurden,
    Tenure, UnitsInStructure, ValidationFlags,
};

use crate::WeightedContribution;
use crate::reduce::{MetricTable, finite};

/// Employment rates below this are flagged.
const MIN_PLAUSIBLE_EMPLOYMENT_RATE: f64 = 0.5;

/// Income median and mean closer than this (dollars) are flagged.
const SUSPICIOUS_INCOME_GAP: f64 = 1.0;

/// Builds the bundle for one cell.
#[must_use]
pub fn assemble(
    table: &MetricTable,
    contributions: &[WeightedContribution<'_>],
    cell_area_km2: f64,
) -> MetricBundle {
    let no_data = contributions.is_empty();
    let coverage_ratio = (!no_data).then(|| {
        contributions
            .iter()
            .map(WeightedContribution::overlap_fraction)
            .sum::<f64>()
    });

    let population_total = table.get("population.total");
    let age = AgeDistribution {
        age_0_4: table.get("population.age.0_4"),
        age_5_14: table.get("population.age.5_14"),
        age_15_24: table.get("population.age.15_24"),
        age_25_44: table.get("population.age.25_44"),
        age_45_64: table.get("population.age.45_64"),
        age_65p: table.get("population.age.65p"),
    };
    let age_pct = AgeDistribution {
        age_0_4: percent(age.age_0_4, population_total),
        age_5_14: percent(age.age_5_14, population_total),
        age_15_24: percent(age.age_15_24, population_total),
        age_25_44: percent(age.age_25_44, population_total),
        age_45_64: percent(age.age_45_64, population_total),
        age_65p: percent(age.age_65p, population_total),
    };
    let population = PopulationMetrics {
        total: population_total,
        density_per_km2: ratio(population_total, Some(cell_area_km2)),
        coverage_ratio: finite(coverage_ratio),
        age,
        age_pct,
    };

    let households = HouseholdMetrics {
        total: table.get("households.total"),
        avg_size: HouseholdSize {
            overall: ratio(
                table.get("households.occupant_population.overall"),
                table.get("housing.tenure.total"),
            ),
            owner: ratio(
                table.get("households.occupant_population.owner"),
                table.get("housing.tenure.owner"),
            ),
            renter: ratio(
                table.get("households.occupant_population.renter"),
                table.get("housing.tenure.renter"),
            ),
        },
    };

    let income_households = table.get("income.households");
    let income = IncomeMetrics {
        median: table.get("income.median"),
        mean: ratio(table.get("income.aggregate"), income_households),
        brackets: table
            .brackets("income.median")
            .iter()
            .map(|bracket| BracketEstimate {
                pct: percent(bracket.households, income_households),
                ..bracket.clone()
            })
            .collect(),
    };

    let labor_force = table.get("employment.labor_force");
    let employed = table.get("employment.employed");
    let unemployed = table.get("employment.unemployed");
    let employment = EmploymentMetrics {
        labor_force,
        employed,
        unemployed,
        employment_rate: ratio(employed, labor_force),
        unemployment_rate: ratio(unemployed, labor_force),
    };

    let education = EducationMetrics {
        hs_or_less: table.get("education.hs_or_less"),
        some_college: table.get("education.some_college"),
        ba_plus: table.get("education.ba_plus"),
    };

    let housing = HousingMetrics {
        units_total: table.get("housing.units_total"),
        occupied: table.get("housing.occupied"),
        vacant: table.get("housing.vacant"),
        tenure: Tenure {
            owner: table.get("housing.tenure.owner"),
            renter: table.get("housing.tenure.renter"),
        },
        units_in_structure: UnitsInStructure {
            one_detached: table.get("housing.units_in_structure.1_det"),
            one_attached: table.get("housing.units_in_structure.1_att"),
            two_units: table.get("housing.units_in_structure.2_units"),
            three_to_four: table.get("housing.units_in_structure.3_4"),
            five_to_nine: table.get("housing.units_in_structure.5_9"),
            ten_to_nineteen: table.get("housing.units_in_structure.10_19"),
            twenty_plus: table.get("housing.units_in_structure.20p"),
            mobile_other: table.get("housing.units_in_structure.mobile_other"),
        },
    };

    let costs = CostMetrics {
        median_gross_rent: table.get("costs.median_gross_rent"),
        median_home_value: table.get("costs.median_home_value"),
        rent_burden_pct: rent_burden(table),
    };

    let validation = validate(&employment, &income);

    let partial_variables: Vec<String> = table.partial_variables().iter().cloned().collect();
    if !partial_variables.is_empty() {
        log::warn!(
            "Partial source coverage for {} variables: {}",
            partial_variables.len(),
            partial_variables.join(", ")
        );
    }

    MetricBundle {
        population,
        households,
        income,
        employment,
        education,
        housing,
        costs,
        jobs_workplace: None,
        validation,
        no_data,
        partial_coverage: !partial_variables.is_empty(),
        partial_variables,
    }
}

/// `numerator / denominator`, `None` when either is absent or the
/// denominator is not positive.
fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => finite(Some(n / d)),
        _ => None,
    }
}

/// [`ratio`] as a percentage.
fn percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    ratio(numerator, denominator).map(|r| r * 100.0)
}

fn rent_burden(table: &MetricTable) -> RentBurden {
    let computed = table.get("costs.rent_burden.universe").map(|universe| {
        universe - table.get("costs.rent_burden.not_computed").unwrap_or(0.0)
    });
    let over_50 = table.get("costs.rent_burden.50_plus");
    let over_30 = match (table.get("costs.rent_burden.30_50"), over_50) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    };

    RentBurden {
        gt_30: percent(over_30, computed),
        gt_50: percent(over_50, computed),
    }
}

fn validate(employment: &EmploymentMetrics, income: &IncomeMetrics) -> ValidationFlags {
    let mut flags = ValidationFlags::default();

    if let (Some(employed), Some(labor_force)) = (employment.employed, employment.labor_force)
        && employed > labor_force
    {
        flags.employment_mismatch = true;
        flags.notes.push(format!(
            "Employed ({employed:.0}) exceeds civilian labor force ({labor_force:.0})"
        ));
    }

    if let Some(rate) = employment.employment_rate
        && rate < MIN_PLAUSIBLE_EMPLOYMENT_RATE
    {
        flags.employment_mismatch = true;
        flags.notes.push(format!(
            "Employment rate {:.1}% is below {:.0}%",
            rate * 100.0,
            MIN_PLAUSIBLE_EMPLOYMENT_RATE * 100.0
        ));
    }

    if let (Some(median), Some(mean)) = (income.median, income.mean)
        && (median - mean).abs() < SUSPICIOUS_INCOME_GAP
    {
        flags.income_suspicious = true;
        flags.notes.push(format!(
            "Median income ({median:.0}) and mean income ({mean:.0}) are nearly identical"
        ));
    }

    for note in &flags.notes {
        log::warn!("{note}");
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::reduce;
    use crate::{SourcePolygon, VariableCatalog};
    use geo::{MultiPolygon, polygon};
    use serde_json::{Value, json};

    fn source(geoid: &str, pairs: &[(&str, Value)]) -> SourcePolygon {
        SourcePolygon::new(
            geoid,
            MultiPolygon(vec![polygon![
                (x: -71.0, y: 42.0),
                (x: -70.99, y: 42.0),
                (x: -70.99, y: 42.01),
                (x: -71.0, y: 42.0),
            ]]),
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            &VariableCatalog::builtin(),
        )
        .unwrap()
    }

    fn full(source: &SourcePolygon) -> Vec<WeightedContribution<'_>> {
        vec![WeightedContribution::new(source, 1.0, 1.0)]
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap_or_else(|| panic!("expected {expected}, got None"));
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_intersection_is_all_none() {
        let bundle = reduce(&[], &VariableCatalog::builtin(), 1.0);

        assert!(bundle.no_data);
        assert!(!bundle.partial_coverage);
        assert_eq!(bundle.population.total, None);
        assert_eq!(bundle.population.density_per_km2, None);
        assert_eq!(bundle.population.coverage_ratio, None);
        assert_eq!(bundle.population.age, AgeDistribution::default());
        assert_eq!(bundle.population.age_pct, AgeDistribution::default());
        assert_eq!(bundle.households, HouseholdMetrics::default());
        assert_eq!(bundle.income.median, None);
        assert_eq!(bundle.income.mean, None);
        assert!(
            bundle
                .income
                .brackets
                .iter()
                .all(|b| b.households.is_none() && b.pct.is_none())
        );
        assert_eq!(bundle.employment, EmploymentMetrics::default());
        assert_eq!(bundle.education, EducationMetrics::default());
        assert_eq!(bundle.housing, HousingMetrics::default());
        assert_eq!(bundle.costs, CostMetrics::default());
        assert_eq!(bundle.jobs_workplace, None);
        assert_eq!(bundle.validation, ValidationFlags::default());
    }

    #[test]
    fn full_coverage_keeps_raw_values() {
        let source = source(
            "250250101011",
            &[
                ("B01003_001E", json!(1500)),
                ("B01001_003E", json!(50)),
                ("B01001_027E", json!(45)),
                ("B01001_020E", json!(100)),
                ("B01001_044E", json!(120)),
            ],
        );
        let bundle = reduce(&full(&source), &VariableCatalog::builtin(), 1.0);

        assert!(!bundle.no_data);
        approx(bundle.population.total, 1500.0);
        approx(bundle.population.density_per_km2, 1500.0);
        approx(bundle.population.coverage_ratio, 1.0);
        approx(bundle.population.age.age_0_4, 95.0);
        approx(bundle.population.age.age_65p, 220.0);
        assert_eq!(bundle.population.age.age_25_44, None);
    }

    #[test]
    fn derived_ratios_use_combined_totals() {
        let source = source(
            "250250101011",
            &[
                ("B25008_001E", json!(2500)),
                ("B25008_002E", json!(1500)),
                ("B25008_003E", json!(1000)),
                ("B25003_001E", json!(1000)),
                ("B25003_002E", json!(500)),
                ("B25003_003E", json!(500)),
                ("B19025_001E", json!(90_000_000)),
                ("B19001_001E", json!(1000)),
                ("B23025_003E", json!(1200)),
                ("B23025_004E", json!(1140)),
                ("B23025_005E", json!(60)),
                ("B25070_001E", json!(520)),
                ("B25070_007E", json!(50)),
                ("B25070_008E", json!(50)),
                ("B25070_009E", json!(50)),
                ("B25070_010E", json!(100)),
                ("B25070_011E", json!(20)),
            ],
        );
        let bundle = reduce(&full(&source), &VariableCatalog::builtin(), 1.0);

        approx(bundle.households.avg_size.overall, 2.5);
        approx(bundle.households.avg_size.owner, 3.0);
        approx(bundle.households.avg_size.renter, 2.0);
        approx(bundle.income.mean, 90_000.0);
        approx(bundle.employment.employment_rate, 0.95);
        approx(bundle.employment.unemployment_rate, 0.05);
        approx(bundle.costs.rent_burden_pct.gt_30, 50.0);
        approx(bundle.costs.rent_burden_pct.gt_50, 20.0);
        assert!(!bundle.validation.employment_mismatch);
        assert!(!bundle.validation.income_suspicious);
        assert!(bundle.validation.notes.is_empty());
    }

    #[test]
    fn zero_denominators_give_none() {
        let source = source(
            "250250101011",
            &[
                ("B25008_001E", json!(0)),
                ("B25003_001E", json!(0)),
                ("B23025_003E", json!(0)),
                ("B23025_004E", json!(0)),
                ("B23025_005E", json!(0)),
                ("B25070_001E", json!(0)),
                ("B25070_010E", json!(0)),
            ],
        );
        let bundle = reduce(&full(&source), &VariableCatalog::builtin(), 1.0);

        assert_eq!(bundle.households.avg_size.overall, None);
        assert_eq!(bundle.employment.employment_rate, None);
        assert_eq!(bundle.employment.unemployment_rate, None);
        assert_eq!(bundle.costs.rent_burden_pct.gt_30, None);
        assert_eq!(bundle.costs.rent_burden_pct.gt_50, None);
        assert_eq!(bundle.population.density_per_km2, None);
    }

    #[test]
    fn shares_are_percentages_of_totals() {
        let catalog = VariableCatalog::builtin();
        let mut pairs = vec![
            ("B01003_001E", json!(200)),
            ("B01001_003E", json!(30)),
            ("B01001_027E", json!(20)),
            ("B19001_001E", json!(80)),
        ];
        for bracket in &catalog.bracket_sets()[0].brackets {
            let count = match bracket.key.as_str() {
                "lt_10k" => 20,
                "200k_plus" => 60,
                _ => 0,
            };
            pairs.push((bracket.variable.as_str(), json!(count)));
        }
        let source = source("250250101011", &pairs);
        let bundle = reduce(&full(&source), &catalog, 1.0);

        approx(bundle.population.age_pct.age_0_4, 25.0);
        assert_eq!(bundle.population.age_pct.age_65p, None);

        let pct = |key: &str| {
            bundle
                .income
                .brackets
                .iter()
                .find(|b| b.key == key)
                .and_then(|b| b.pct)
        };
        approx(pct("lt_10k"), 25.0);
        approx(pct("200k_plus"), 75.0);
        approx(pct("50_60k"), 0.0);
    }

    #[test]
    fn shares_need_a_positive_total() {
        let source = source(
            "250250101011",
            &[("B01003_001E", json!(0)), ("B01001_003E", json!(0))],
        );
        let bundle = reduce(&full(&source), &VariableCatalog::builtin(), 1.0);
        assert_eq!(bundle.population.age_pct.age_0_4, None);
        assert!(bundle.income.brackets.iter().all(|b| b.pct.is_none()));
    }

    #[test]
    fn flags_inconsistent_inputs_without_correcting() {
        let catalog = VariableCatalog::builtin();
        let mut pairs = vec![
            ("B23025_003E", json!(100)),
            ("B23025_004E", json!(140)),
            ("B19025_001E", json!(5_000_000)),
            ("B19001_001E", json!(100)),
        ];
        // Everyone in the 45-50k bracket: median 47,500, mean 50,000.
        for bracket in &catalog.bracket_sets()[0].brackets {
            let count = if bracket.key == "45_50k" { 100 } else { 0 };
            pairs.push((bracket.variable.as_str(), json!(count)));
        }
        let source = source("250250101011", &pairs);
        let bundle = reduce(&full(&source), &catalog, 1.0);

        assert!(bundle.validation.employment_mismatch);
        approx(bundle.employment.employed, 140.0);
        approx(bundle.employment.employment_rate, 1.4);
        assert!(!bundle.validation.income_suspicious);
        approx(bundle.income.median, 47_500.0);
        assert_eq!(bundle.validation.notes.len(), 1);
    }

    #[test]
    fn flags_identical_median_and_mean() {
        let catalog = VariableCatalog::builtin();
        let mut pairs = vec![
            ("B19025_001E", json!(4_750_000)),
            ("B19001_001E", json!(100)),
        ];
        for bracket in &catalog.bracket_sets()[0].brackets {
            let count = if bracket.key == "45_50k" { 100 } else { 0 };
            pairs.push((bracket.variable.as_str(), json!(count)));
        }
        let source = source("250250101011", &pairs);
        let bundle = reduce(&full(&source), &catalog, 1.0);

        assert!(bundle.validation.income_suspicious);
        assert!(!bundle.validation.employment_mismatch);
    }

    #[test]
    fn low_employment_rate_is_flagged() {
        let source = source(
            "250250101011",
            &[("B23025_003E", json!(100)), ("B23025_004E", json!(40))],
        );
        let bundle = reduce(&full(&source), &VariableCatalog::builtin(), 1.0);
        assert!(bundle.validation.employment_mismatch);
        approx(bundle.employment.employment_rate, 0.4);
    }

    #[test]
    fn missing_values_mark_partial_coverage() {
        let a = source("250250101011", &[("B25064_001E", json!(1200))]);
        let b = source("250250101012", &[("B25064_001E", json!(-666_666_666))]);
        let contributions = vec![
            WeightedContribution::new(&a, 0.5, 0.5),
            WeightedContribution::new(&b, 0.5, 0.5),
        ];
        let bundle = reduce(&contributions, &VariableCatalog::builtin(), 1.0);

        approx(bundle.costs.median_gross_rent, 1200.0);
        assert!(bundle.partial_coverage);
        assert_eq!(bundle.partial_variables, vec!["B25064_001E".to_string()]);
        approx(bundle.population.coverage_ratio, 1.0);
    }
}
