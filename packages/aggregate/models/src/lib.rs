#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Variable catalog schema and grid cell statistics types.
//!
//! The catalog is deserialized from TOML and tags every raw Census
//! variable with the rule used to combine it across Block Groups. The
//! [`MetricBundle`] tree is the typed result of that combination.

use std::fmt;

use grid_stats_lodes_models::JobTotals;
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

/// Length of a Block Group GEOID (state 2 + county 3 + tract 6 + group 1).
pub const GEOID_LEN: usize = 12;

/// Every dotted metric key a catalog variable may target.
///
/// Keys outside the reported tree (`income.aggregate`,
/// `households.occupant_population.*`, `costs.rent_burden.*`, ...) are
/// numerators and denominators of derived ratios.
pub const METRIC_KEYS: &[&str] = &[
    "population.total",
    "population.age.0_4",
    "population.age.5_14",
    "population.age.15_24",
    "population.age.25_44",
    "population.age.45_64",
    "population.age.65p",
    "households.total",
    "households.occupant_population.overall",
    "households.occupant_population.owner",
    "households.occupant_population.renter",
    "income.median",
    "income.aggregate",
    "income.households",
    "employment.labor_force",
    "employment.employed",
    "employment.unemployed",
    "education.hs_or_less",
    "education.some_college",
    "education.ba_plus",
    "housing.units_total",
    "housing.occupied",
    "housing.vacant",
    "housing.tenure.total",
    "housing.tenure.owner",
    "housing.tenure.renter",
    "housing.units_in_structure.1_det",
    "housing.units_in_structure.1_att",
    "housing.units_in_structure.2_units",
    "housing.units_in_structure.3_4",
    "housing.units_in_structure.5_9",
    "housing.units_in_structure.10_19",
    "housing.units_in_structure.20p",
    "housing.units_in_structure.mobile_other",
    "costs.median_gross_rent",
    "costs.median_home_value",
    "costs.rent_burden.universe",
    "costs.rent_burden.30_50",
    "costs.rent_burden.50_plus",
    "costs.rent_burden.not_computed",
];

/// How a raw variable combines across overlapping Block Groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReductionKind {
    /// Additive count. Combined as `Σ value × fraction`.
    Extensive,
    /// Rate, mean or published median. Combined as a fraction-weighted
    /// average over the sources that report it.
    IntensiveMean,
    /// One bracket of a distribution. Brackets are summed extensively and
    /// the set's median is interpolated from the combined counts.
    BracketedMedian {
        /// Bracket set identifier.
        set: String,
    },
}

/// A catalog entry for one raw source variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Provider variable name (e.g., `"B01003_001E"`).
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Dotted key of the statistic this variable feeds.
    pub metric: String,
    /// Combination rule.
    pub reduction: ReductionKind,
}

/// One bracket of a distribution, with its numeric bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    /// Variable holding this bracket's count.
    pub variable: String,
    /// Short key used in output (e.g., `"50_60k"`).
    pub key: String,
    /// Inclusive lower bound.
    pub lower: f64,
    /// Upper bound. For the open-ended top bracket this is a conventional
    /// cap used only for interpolation.
    pub upper: f64,
}

/// A named distribution whose median is interpolated from bracket counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketSet {
    /// Set identifier referenced by [`ReductionKind::BracketedMedian`].
    pub id: String,
    /// Metric key the interpolated median is reported under.
    pub median_metric: String,
    /// Brackets in any order; sorted by `lower` when loaded.
    pub brackets: Vec<Bracket>,
}

/// Top-level catalog TOML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Variable definitions.
    pub variables: Vec<VariableDefinition>,
    /// Bracket sets.
    #[serde(default)]
    pub bracket_sets: Vec<BracketSet>,
}

/// A single raw attribute value after ingestion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    /// A usable, non-negative, finite estimate.
    Reported(f64),
    /// The provider returned a placeholder, null, or unusable value.
    Missing,
}

impl AttributeValue {
    /// Classifies a raw number. Census annotation placeholders
    /// (`-666666666`, `-999999999`, ...) are all negative.
    #[must_use]
    pub fn from_number(value: f64) -> Self {
        if value.is_finite() && value >= 0.0 {
            Self::Reported(value)
        } else {
            Self::Missing
        }
    }

    /// The reported value, if any.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Reported(value) => Some(value),
            Self::Missing => None,
        }
    }
}

/// A parsed 12-digit Block Group GEOID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockGroupGeoid {
    /// 2-digit state FIPS code.
    pub state: String,
    /// 3-digit county FIPS code.
    pub county: String,
    /// 6-digit tract code.
    pub tract: String,
    /// 1-digit block group number.
    pub block_group: String,
}

impl BlockGroupGeoid {
    /// Splits a 12-digit GEOID into its components.
    #[must_use]
    pub fn parse(geoid: &str) -> Option<Self> {
        if geoid.len() != GEOID_LEN || !geoid.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            state: geoid[0..2].to_string(),
            county: geoid[2..5].to_string(),
            tract: geoid[5..11].to_string(),
            block_group: geoid[11..12].to_string(),
        })
    }
}

impl fmt::Display for BlockGroupGeoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.state, self.county, self.tract, self.block_group
        )
    }
}

/// Area-weighted statistics for one grid cell.
///
/// Every numeric leaf is a finite number or `None`. `None` means no
/// overlapping Block Group reported the inputs; it is never a stand-in
/// for zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub population: PopulationMetrics,
    pub households: HouseholdMetrics,
    pub income: IncomeMetrics,
    pub employment: EmploymentMetrics,
    pub education: EducationMetrics,
    pub housing: HousingMetrics,
    pub costs: CostMetrics,
    /// Present only when job records were supplied and at least one
    /// Block Group intersects the cell.
    pub jobs_workplace: Option<JobTotals>,
    pub validation: ValidationFlags,
    /// No Block Group overlaps the cell.
    pub no_data: bool,
    /// At least one contributing Block Group lacked a value used by
    /// some statistic.
    pub partial_coverage: bool,
    /// Variables with at least one missing or unreported contribution.
    pub partial_variables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationMetrics {
    pub total: Option<f64>,
    pub density_per_km2: Option<f64>,
    /// Sum of overlap fractions. Below 1 when the cell extends past the
    /// supplied Block Groups.
    pub coverage_ratio: Option<f64>,
    pub age: AgeDistribution,
    /// Each age group as a percentage of `total`.
    pub age_pct: AgeDistribution,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeDistribution {
    #[serde(rename = "0_4")]
    pub age_0_4: Option<f64>,
    #[serde(rename = "5_14")]
    pub age_5_14: Option<f64>,
    #[serde(rename = "15_24")]
    pub age_15_24: Option<f64>,
    #[serde(rename = "25_44")]
    pub age_25_44: Option<f64>,
    #[serde(rename = "45_64")]
    pub age_45_64: Option<f64>,
    #[serde(rename = "65p")]
    pub age_65p: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseholdMetrics {
    pub total: Option<f64>,
    pub avg_size: HouseholdSize,
}

/// Persons per occupied housing unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseholdSize {
    pub overall: Option<f64>,
    pub owner: Option<f64>,
    pub renter: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeMetrics {
    /// Interpolated from the combined bracket counts.
    pub median: Option<f64>,
    /// Aggregate income over households.
    pub mean: Option<f64>,
    pub brackets: Vec<BracketEstimate>,
}

/// Combined household count of one income bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketEstimate {
    pub key: String,
    pub lower: f64,
    pub upper: f64,
    pub households: Option<f64>,
    /// Percentage of the bracket universe's households.
    pub pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmploymentMetrics {
    /// Civilian labor force.
    pub labor_force: Option<f64>,
    pub employed: Option<f64>,
    pub unemployed: Option<f64>,
    /// Employed over civilian labor force, `0.0..=1.0` for consistent input.
    pub employment_rate: Option<f64>,
    /// Unemployed over civilian labor force, `0.0..=1.0`.
    pub unemployment_rate: Option<f64>,
}

/// Educational attainment, population 25 years and over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationMetrics {
    pub hs_or_less: Option<f64>,
    pub some_college: Option<f64>,
    pub ba_plus: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HousingMetrics {
    pub units_total: Option<f64>,
    pub occupied: Option<f64>,
    pub vacant: Option<f64>,
    pub tenure: Tenure,
    pub units_in_structure: UnitsInStructure,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tenure {
    pub owner: Option<f64>,
    pub renter: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitsInStructure {
    #[serde(rename = "1_det")]
    pub one_detached: Option<f64>,
    #[serde(rename = "1_att")]
    pub one_attached: Option<f64>,
    #[serde(rename = "2_units")]
    pub two_units: Option<f64>,
    #[serde(rename = "3_4")]
    pub three_to_four: Option<f64>,
    #[serde(rename = "5_9")]
    pub five_to_nine: Option<f64>,
    #[serde(rename = "10_19")]
    pub ten_to_nineteen: Option<f64>,
    #[serde(rename = "20p")]
    pub twenty_plus: Option<f64>,
    pub mobile_other: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostMetrics {
    pub median_gross_rent: Option<f64>,
    pub median_home_value: Option<f64>,
    pub rent_burden_pct: RentBurden,
}

/// Share of renters (with computed burden) paying above a threshold of
/// household income in gross rent, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RentBurden {
    pub gt_30: Option<f64>,
    pub gt_50: Option<f64>,
}

/// Consistency checks on the combined statistics. Flags are advisory;
/// the statistics are never adjusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFlags {
    pub employment_mismatch: bool,
    pub income_suspicious: bool,
    pub notes: Vec<String>,
}
