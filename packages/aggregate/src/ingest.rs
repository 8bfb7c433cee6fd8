//! Ingestion of provider Block Groups into typed source polygons.
//!
//! Attribute keys are checked against the catalog here, so reduction can
//! assume every key it meets is known.

use std::collections::{BTreeMap, BTreeSet};

use geo::{CoordsIter, MultiPolygon};
use geojson::GeoJson;
use grid_stats_aggregate_models::{AttributeValue, BlockGroupGeoid};
use grid_stats_geometry_models::GeoPoint;
use serde_json::Value;

use crate::{AggregateError, VariableCatalog};

/// A Block Group with geographic geometry and catalog-checked values.
#[derive(Debug, Clone)]
pub struct SourcePolygon {
    geoid: BlockGroupGeoid,
    geoid_str: String,
    geometry: MultiPolygon<f64>,
    values: BTreeMap<String, AttributeValue>,
}

impl SourcePolygon {
    /// Validates and types a provider Block Group.
    ///
    /// Raw values are classified by [`attribute_from_json`]. A variable
    /// that is absent from `raw_values` is "not reported", which the
    /// reducer treats differently from [`AttributeValue::Missing`].
    ///
    /// # Errors
    ///
    /// * [`AggregateError::InvalidGeoid`] if `geoid` is not 12 digits.
    /// * [`AggregateError::UnknownVariable`] if a key is not in `catalog`.
    /// * [`AggregateError::InvalidGeometry`] if the geometry is empty or
    ///   has a vertex outside WGS84 bounds.
    pub fn new(
        geoid: &str,
        geometry: MultiPolygon<f64>,
        raw_values: BTreeMap<String, Value>,
        catalog: &VariableCatalog,
    ) -> Result<Self, AggregateError> {
        let Some(parsed) = BlockGroupGeoid::parse(geoid) else {
            return Err(AggregateError::InvalidGeoid {
                geoid: geoid.to_string(),
            });
        };

        if geometry.0.is_empty() {
            return Err(AggregateError::InvalidGeometry {
                geoid: geoid.to_string(),
                message: "empty geometry".to_string(),
            });
        }

        if let Some(bad) = geometry
            .coords_iter()
            .find(|c| !GeoPoint::new(c.x, c.y).is_valid())
        {
            return Err(AggregateError::InvalidGeometry {
                geoid: geoid.to_string(),
                message: format!("vertex out of range: ({}, {})", bad.x, bad.y),
            });
        }

        let mut values = BTreeMap::new();
        for (variable, raw) in raw_values {
            if !catalog.contains(&variable) {
                return Err(AggregateError::UnknownVariable {
                    geoid: geoid.to_string(),
                    variable,
                });
            }
            let value = attribute_from_json(&raw);
            if value == AttributeValue::Missing {
                log::debug!("Block Group {geoid}: {variable} is missing ({raw})");
            }
            values.insert(variable, value);
        }

        Ok(Self {
            geoid: parsed,
            geoid_str: geoid.to_string(),
            geometry,
            values,
        })
    }

    /// The 12-digit GEOID.
    #[must_use]
    pub fn geoid(&self) -> &str {
        &self.geoid_str
    }

    /// The GEOID split into state, county, tract and block group.
    #[must_use]
    pub const fn parsed_geoid(&self) -> &BlockGroupGeoid {
        &self.geoid
    }

    /// Boundary in longitude/latitude.
    #[must_use]
    pub const fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Typed attribute values keyed by variable name.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.values
    }

    /// A single attribute, `None` when not reported.
    #[must_use]
    pub fn value(&self, variable: &str) -> Option<AttributeValue> {
        self.values.get(variable).copied()
    }
}

/// Classifies a raw JSON attribute.
///
/// Numbers go through [`AttributeValue::from_number`]. Numeric strings
/// (the Census API returns every value as a string) are parsed first.
/// Anything else, including `null`, is missing.
#[must_use]
pub fn attribute_from_json(raw: &Value) -> AttributeValue {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .map_or(AttributeValue::Missing, AttributeValue::from_number),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_or(AttributeValue::Missing, AttributeValue::from_number),
        _ => AttributeValue::Missing,
    }
}

/// Loads source polygons from a `GeoJSON` `FeatureCollection`.
///
/// Each feature needs `properties.GEOID` (string) and a
/// `properties.values` object mapping variable names to numbers, numeric
/// strings, or `null`. Features with a repeated GEOID after the first are
/// skipped with a warning.
///
/// # Errors
///
/// Returns an error if the document is not a `FeatureCollection`, or any
/// feature fails [`SourcePolygon::new`] validation.
pub fn sources_from_geojson(
    geojson_str: &str,
    catalog: &VariableCatalog,
) -> Result<Vec<SourcePolygon>, AggregateError> {
    let geojson: GeoJson = geojson_str.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(AggregateError::InvalidGeometry {
            geoid: String::new(),
            message: "expected a FeatureCollection".to_string(),
        });
    };

    let mut seen = BTreeSet::new();
    let mut sources = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let geoid = feature
            .property("GEOID")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AggregateError::InvalidGeoid {
                geoid: feature
                    .property("GEOID")
                    .map_or_else(String::new, ToString::to_string),
            })?;

        if !seen.insert(geoid.clone()) {
            log::warn!("Skipping duplicate Block Group {geoid}");
            continue;
        }

        let raw_values: BTreeMap<String, Value> = match feature.property("values") {
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            Some(Value::Null) | None => BTreeMap::new(),
            Some(other) => {
                return Err(AggregateError::InvalidGeometry {
                    geoid,
                    message: format!("properties.values is not an object: {other}"),
                });
            }
        };

        let Some(geometry) = feature
            .geometry
            .and_then(grid_stats_spatial::geometry_to_multipolygon)
        else {
            return Err(AggregateError::InvalidGeometry {
                geoid,
                message: "missing or non-polygonal geometry".to_string(),
            });
        };

        sources.push(SourcePolygon::new(&geoid, geometry, raw_values, catalog)?);
    }

    log::info!("Loaded {} Block Groups", sources.len());

    Ok(sources)
}

/// Groups GEOIDs as `(state, county) → tract → block groups`, the shape
/// the Census Data API is queried in. Malformed GEOIDs are skipped.
#[must_use]
pub fn group_by_county<'a, I>(
    geoids: I,
) -> BTreeMap<(String, String), BTreeMap<String, BTreeSet<String>>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut grouped: BTreeMap<(String, String), BTreeMap<String, BTreeSet<String>>> =
        BTreeMap::new();

    for geoid in geoids {
        let Some(parsed) = BlockGroupGeoid::parse(geoid) else {
            log::warn!("Skipping malformed GEOID {geoid:?}");
            continue;
        };
        grouped
            .entry((parsed.state, parsed.county))
            .or_default()
            .entry(parsed.tract)
            .or_default()
            .insert(parsed.block_group);
    }

    grouped
}
