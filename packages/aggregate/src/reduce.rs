//! Generic reduction rules, one per [`ReductionKind`].
//!
//! Each catalog variable is reduced on its own, then variables sharing a
//! metric key are merged. No rule ever turns "nothing reported" into
//! zero.

use std::collections::{BTreeMap, BTreeSet};

use grid_stats_aggregate_models::{
    AttributeValue, BracketEstimate, BracketSet, MetricBundle, ReductionKind,
};

use crate::{VariableCatalog, WeightedContribution, bundle};

/// The combined value of one variable or metric key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reduced {
    /// Finite combined value, or `None` when no contribution reported one.
    pub value: Option<f64>,
    /// Some contribution was missing or did not report the input.
    pub partial: bool,
}

impl Reduced {
    const fn absent() -> Self {
        Self {
            value: None,
            partial: false,
        }
    }
}

/// What the contributions say about one variable.
struct Scan {
    weighted_sum: f64,
    reported_weight: f64,
    reported: usize,
    missing: usize,
    unreported: usize,
}

fn scan(contributions: &[WeightedContribution<'_>], variable: &str) -> Scan {
    let mut result = Scan {
        weighted_sum: 0.0,
        reported_weight: 0.0,
        reported: 0,
        missing: 0,
        unreported: 0,
    };

    for contribution in contributions {
        match contribution.source().value(variable) {
            Some(AttributeValue::Reported(value)) => {
                result.weighted_sum += value * contribution.overlap_fraction();
                result.reported_weight += contribution.overlap_fraction();
                result.reported += 1;
            }
            Some(AttributeValue::Missing) => result.missing += 1,
            None => result.unreported += 1,
        }
    }

    result
}

impl Scan {
    /// A variable no contribution mentions is absent rather than partial.
    const fn partial(&self) -> bool {
        self.reported + self.missing > 0 && (self.missing > 0 || self.unreported > 0)
    }
}

/// `Σ value × fraction` over the contributions that report `variable`.
/// Missing and unreported contributions count as zero but mark the
/// result partial.
#[must_use]
pub fn extensive(contributions: &[WeightedContribution<'_>], variable: &str) -> Reduced {
    let scan = scan(contributions, variable);
    Reduced {
        value: finite((scan.reported > 0).then_some(scan.weighted_sum)),
        partial: scan.partial(),
    }
}

/// `Σ value × fraction / Σ fraction` over the contributions that report
/// `variable`.
#[must_use]
pub fn intensive_mean(contributions: &[WeightedContribution<'_>], variable: &str) -> Reduced {
    let scan = scan(contributions, variable);
    let value = if scan.reported > 0 && scan.reported_weight > 0.0 {
        finite(Some(scan.weighted_sum / scan.reported_weight))
    } else {
        None
    };
    Reduced {
        value,
        partial: scan.partial(),
    }
}

/// Combines each bracket extensively, then interpolates the median of the
/// combined distribution.
#[must_use]
pub fn bracketed_median(
    contributions: &[WeightedContribution<'_>],
    set: &BracketSet,
) -> (Reduced, Vec<BracketEstimate>) {
    let mut partial = false;
    let estimates: Vec<BracketEstimate> = set
        .brackets
        .iter()
        .map(|bracket| {
            let combined = extensive(contributions, &bracket.variable);
            partial |= combined.partial;
            BracketEstimate {
                key: bracket.key.clone(),
                lower: bracket.lower,
                upper: bracket.upper,
                households: combined.value,
                pct: None,
            }
        })
        .collect();

    let median = interpolate_median(&estimates);
    if median.is_none() && estimates.iter().any(|e| e.households.is_some()) {
        log::debug!("Bracket set {}: zero combined count, no median", set.id);
    }

    (
        Reduced {
            value: median,
            partial,
        },
        estimates,
    )
}

/// Census bracket median:
/// `lower + (total / 2 - count_below) / bracket_count × bracket_width`.
///
/// `brackets` must be sorted by lower bound. Returns `None` when the
/// combined count is zero or nothing was reported.
#[must_use]
pub fn interpolate_median(brackets: &[BracketEstimate]) -> Option<f64> {
    let total: f64 = brackets.iter().filter_map(|b| b.households).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    let half = total / 2.0;
    let mut below = 0.0;

    for bracket in brackets {
        let count = bracket.households.unwrap_or(0.0);
        if count > 0.0 && below + count >= half {
            let width = bracket.upper - bracket.lower;
            return finite(Some(bracket.lower + (half - below) / count * width));
        }
        below += count;
    }

    None
}

/// Reduced values keyed by metric key, plus bracket detail.
#[derive(Debug, Clone, Default)]
pub struct MetricTable {
    values: BTreeMap<String, Reduced>,
    brackets: BTreeMap<String, Vec<BracketEstimate>>,
    partial_variables: BTreeSet<String>,
}

impl MetricTable {
    /// The combined value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(|reduced| reduced.value)
    }

    /// Combined brackets of the set whose median reports under `median_key`.
    #[must_use]
    pub fn brackets(&self, median_key: &str) -> &[BracketEstimate] {
        self.brackets
            .get(median_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Variables with a missing or unreported contribution, sorted.
    #[must_use]
    pub const fn partial_variables(&self) -> &BTreeSet<String> {
        &self.partial_variables
    }

    fn merge(&mut self, key: &str, reduced: Reduced) {
        self.values
            .entry(key.to_string())
            .and_modify(|existing| {
                existing.value = match (existing.value, reduced.value) {
                    (Some(a), Some(b)) => finite(Some(a + b)),
                    (a, b) => a.or(b),
                };
                existing.partial |= reduced.partial;
            })
            .or_insert(reduced);
    }
}

/// Applies every catalog rule to the contributions.
#[must_use]
pub fn reduce_table(
    contributions: &[WeightedContribution<'_>],
    catalog: &VariableCatalog,
) -> MetricTable {
    let mut table = MetricTable::default();

    for variable in catalog.variables() {
        let reduced = match &variable.reduction {
            ReductionKind::Extensive => extensive(contributions, &variable.name),
            ReductionKind::IntensiveMean => intensive_mean(contributions, &variable.name),
            // Reduced per set below.
            ReductionKind::BracketedMedian { .. } => continue,
        };
        if reduced.partial {
            table.partial_variables.insert(variable.name.clone());
        }
        table.merge(&variable.metric, reduced);
    }

    for set in catalog.bracket_sets() {
        let (median, estimates) = bracketed_median(contributions, set);
        for bracket in &set.brackets {
            if extensive(contributions, &bracket.variable).partial {
                table.partial_variables.insert(bracket.variable.clone());
            }
        }
        table.values.insert(set.median_metric.clone(), median);
        table.brackets.insert(set.median_metric.clone(), estimates);
    }

    for key in grid_stats_aggregate_models::METRIC_KEYS {
        table
            .values
            .entry((*key).to_string())
            .or_insert_with(Reduced::absent);
    }

    table
}

/// Reduces the contributions of one cell into its [`MetricBundle`].
///
/// `cell_area_km2` is used for population density only. An empty
/// `contributions` slice yields an all-`None` bundle with `no_data` set.
#[must_use]
pub fn reduce(
    contributions: &[WeightedContribution<'_>],
    catalog: &VariableCatalog,
    cell_area_km2: f64,
) -> MetricBundle {
    let table = reduce_table(contributions, catalog);
    bundle::assemble(&table, contributions, cell_area_km2)
}

/// Drops `NaN` and infinities.
#[must_use]
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
