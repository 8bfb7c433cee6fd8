//! Variable catalog: which raw variables exist and how each combines.
//!
//! The built-in catalog is embedded at compile time from
//! `catalog/acs5.toml`. Callers may load their own with
//! [`VariableCatalog::from_toml_str`]; both paths run the same
//! validation so a malformed table fails at load, not mid-reduction.

use std::collections::{BTreeMap, BTreeSet};

use grid_stats_aggregate_models::{
    BracketSet, CatalogDocument, METRIC_KEYS, ReductionKind, VariableDefinition,
};

use crate::AggregateError;

/// Number of variables in the built-in catalog. Enforced by a test.
#[cfg(test)]
const EXPECTED_VARIABLE_COUNT: usize = 120;

/// Maximum number of variables the Census Data API accepts per call.
pub const CENSUS_API_VARIABLE_LIMIT: usize = 50;

const BUILTIN_CATALOG: &str = include_str!("../catalog/acs5.toml");

/// A validated variable catalog.
#[derive(Debug, Clone)]
pub struct VariableCatalog {
    variables: Vec<VariableDefinition>,
    by_name: BTreeMap<String, usize>,
    bracket_sets: Vec<BracketSet>,
}

impl VariableCatalog {
    /// Returns the embedded ACS 5-year catalog.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML fails to parse or validate. Since it
    /// is a compile-time constant, failure indicates a development error
    /// and is caught by tests.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_CATALOG)
            .unwrap_or_else(|e| panic!("Failed to parse variable catalog 'acs5': {e}"))
    }

    /// Parses and validates a catalog TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Catalog`] if the TOML is malformed or the
    /// catalog fails validation.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, AggregateError> {
        let document: CatalogDocument =
            toml::de::from_str(toml_str).map_err(|e| AggregateError::Catalog {
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    /// Validates an already-deserialized catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Catalog`] when:
    /// * a variable name appears twice
    /// * a metric key is not part of the statistics tree
    /// * an intensive metric key is shared by more than one variable
    /// * a bracketed variable references a missing set, or reports under
    ///   a key other than the set's median key
    /// * a bracket references a variable outside its set, or has
    ///   `lower >= upper`
    /// * a bracketed variable is not listed by exactly one bracket of its
    ///   set
    pub fn from_document(document: CatalogDocument) -> Result<Self, AggregateError> {
        let CatalogDocument {
            variables,
            mut bracket_sets,
        } = document;

        let mut by_name = BTreeMap::new();
        let mut intensive_keys = BTreeSet::new();

        for (position, variable) in variables.iter().enumerate() {
            if by_name.insert(variable.name.clone(), position).is_some() {
                return Err(catalog_error(format!(
                    "duplicate variable {}",
                    variable.name
                )));
            }

            if !METRIC_KEYS.contains(&variable.metric.as_str()) {
                return Err(catalog_error(format!(
                    "variable {} targets unknown metric {}",
                    variable.name, variable.metric
                )));
            }

            match &variable.reduction {
                ReductionKind::Extensive => {}
                ReductionKind::IntensiveMean => {
                    if !intensive_keys.insert(variable.metric.as_str()) {
                        return Err(catalog_error(format!(
                            "intensive metric {} is shared by more than one variable",
                            variable.metric
                        )));
                    }
                }
                ReductionKind::BracketedMedian { set } => {
                    let Some(bracket_set) = bracket_sets.iter().find(|s| &s.id == set) else {
                        return Err(catalog_error(format!(
                            "variable {} references unknown bracket set {set}",
                            variable.name
                        )));
                    };
                    if bracket_set.median_metric != variable.metric {
                        return Err(catalog_error(format!(
                            "variable {} reports under {} but bracket set {set} reports under {}",
                            variable.name, variable.metric, bracket_set.median_metric
                        )));
                    }
                }
            }
        }

        for bracket_set in &mut bracket_sets {
            if bracket_set.brackets.is_empty() {
                return Err(catalog_error(format!(
                    "bracket set {} has no brackets",
                    bracket_set.id
                )));
            }

            for bracket in &bracket_set.brackets {
                let in_set = by_name
                    .get(&bracket.variable)
                    .map(|&position| &variables[position].reduction)
                    .is_some_and(|reduction| {
                        matches!(
                            reduction,
                            ReductionKind::BracketedMedian { set } if *set == bracket_set.id
                        )
                    });
                if !in_set {
                    return Err(catalog_error(format!(
                        "bracket {} of set {} references {} which is not a variable of that set",
                        bracket.key, bracket_set.id, bracket.variable
                    )));
                }
                if bracket.lower.is_nan() || bracket.upper.is_nan() || bracket.lower >= bracket.upper {
                    return Err(catalog_error(format!(
                        "bracket {} of set {} has lower {} >= upper {}",
                        bracket.key, bracket_set.id, bracket.lower, bracket.upper
                    )));
                }
            }

            bracket_set
                .brackets
                .sort_by(|a, b| a.lower.total_cmp(&b.lower));
        }

        for variable in &variables {
            let ReductionKind::BracketedMedian { set } = &variable.reduction else {
                continue;
            };
            let listed = bracket_sets
                .iter()
                .filter(|s| &s.id == set)
                .flat_map(|s| &s.brackets)
                .filter(|bracket| bracket.variable == variable.name)
                .count();
            if listed != 1 {
                return Err(catalog_error(format!(
                    "variable {} is listed by {listed} brackets of set {set}, expected 1",
                    variable.name
                )));
            }
        }

        log::debug!(
            "Loaded variable catalog: {} variables, {} bracket sets",
            variables.len(),
            bracket_sets.len()
        );

        Ok(Self {
            variables,
            by_name,
            bracket_sets,
        })
    }

    /// Looks up a variable by provider name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VariableDefinition> {
        self.by_name.get(name).map(|&position| &self.variables[position])
    }

    /// Whether the catalog defines `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All variables, in document order.
    #[must_use]
    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }

    /// All bracket sets, brackets sorted by lower bound.
    #[must_use]
    pub fn bracket_sets(&self) -> &[BracketSet] {
        &self.bracket_sets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variable names split into request-sized chunks for a provider that
    /// caps the number of variables per call.
    ///
    /// A `limit` of zero is treated as one.
    #[must_use]
    pub fn request_batches(&self, limit: usize) -> Vec<Vec<&str>> {
        self.variables
            .chunks(limit.max(1))
            .map(|chunk| chunk.iter().map(|v| v.name.as_str()).collect())
            .collect()
    }
}

fn catalog_error(message: String) -> AggregateError {
    AggregateError::Catalog { message }
}
