#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the Solr address geocoder.
//!
//! This crate contains only data types and simple conversions. It has no
//! heavyweight dependencies (no HTTP client, no I/O) so the server models
//! and the core engine can both depend on it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How a strategy matches its fields against the index.
///
/// The wire form is the `snake_case` name (`"exact"`, `"fuzzy"`), as used by
/// both the TOML config and the `func` key of `GEOCODER_STRATEGIES`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(try_from = "String", into = "String")]
#[strum(serialize_all = "snake_case")]
pub enum MatchKind {
    /// Every field must equal its quoted value.
    Exact,
    /// Every word of every field may differ by a length-dependent edit
    /// distance.
    Fuzzy,
}

impl TryFrom<String> for MatchKind {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MatchKind> for String {
    fn from(kind: MatchKind) -> Self {
        kind.to_string()
    }
}

/// One step of the forward geocoding cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    /// Name reported back to the caller when this strategy matches
    /// (e.g. `"exact_all"`).
    pub name: String,
    /// Which query builder this strategy uses.
    #[serde(alias = "func")]
    pub match_kind: MatchKind,
    /// Address fields this strategy queries. All other configured fields
    /// are treated as absent.
    #[serde(alias = "params")]
    pub fields: Vec<String>,
    /// Optional cap on the number of rows requested by this strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<u32>,
}

impl StrategyDefinition {
    /// Row count to request for this strategy given the caller's limit.
    #[must_use]
    pub fn effective_rows(&self, rows: u32) -> u32 {
        self.row_limit.map_or(rows, |limit| rows.min(limit))
    }
}

/// Cleaned address input: field name to trimmed, non-empty value.
///
/// Empty and whitespace-only values are never stored, so
/// [`AddressQuery::get`] returning `Some` always means the caller actually
/// supplied something for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AddressQuery {
    values: BTreeMap<String, String>,
}

impl AddressQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query from raw `(field, value)` pairs, trimming every value
    /// and dropping the empty ones.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut query = Self::new();
        for (field, value) in pairs {
            query.insert(field, value.as_ref());
        }
        query
    }

    /// Builds a query from a JSON object.
    ///
    /// Strings are used as-is, numbers and booleans are stringified (a
    /// postal code often arrives as `53111` rather than `"53111"`), and
    /// `null`, arrays and objects are treated as absent.
    #[must_use]
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from_pairs(
            object
                .iter()
                .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s))),
        )
    }

    /// Sets `field` to the trimmed `value`, or removes it when the trimmed
    /// value is empty.
    fn insert(&mut self, field: impl Into<String>, value: &str) {
        let field = field.into();
        let value = value.trim();
        if value.is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value.to_string());
        }
    }

    /// Returns the cleaned value for `field`, if one was supplied.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Whether at least one of `fields` has a value.
    #[must_use]
    pub fn has_any<S: AsRef<str>>(&self, fields: &[S]) -> bool {
        fields.iter().any(|f| self.get(f.as_ref()).is_some())
    }

    /// Drops every field that is not in `fields`.
    #[must_use]
    pub fn retain_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.values
            .retain(|k, _| fields.iter().any(|f| f.as_ref() == k.as_str()));
        self
    }
}

/// Converts a scalar JSON value to the string form used for querying.
#[must_use]
pub fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

/// Per-field similarity between the caller's input and the stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMap {
    /// Queried field name to a 0–100 similarity score.
    #[serde(flatten)]
    pub fields: BTreeMap<String, u8>,
    /// The search engine's own relevance score, if it returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solr_score: Option<f64>,
}

/// A search hit reshaped for API consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Document identifier as stored in the index.
    pub id: serde_json::Value,
    /// Stored fields plus flattened `additional_information` entries.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Similarity scores for the queried fields.
    pub quality: QualityMap,
    /// Distance from the reverse-geocoding origin, in kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Outcome of a forward geocoding cascade.
///
/// A `None` strategy with zero results is the "no match" outcome; it is a
/// success, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardResult {
    /// Name of the strategy that produced the results.
    pub strategy: Option<String>,
    /// Number of results.
    pub count: usize,
    /// Results in the order the index ranked them.
    pub results: Vec<NormalizedResult>,
}

impl ForwardResult {
    /// Results produced by the strategy named `strategy`.
    #[must_use]
    pub fn matched(strategy: impl Into<String>, results: Vec<NormalizedResult>) -> Self {
        Self {
            strategy: Some(strategy.into()),
            count: results.len(),
            results,
        }
    }

    /// The outcome when no strategy found anything.
    #[must_use]
    pub const fn no_match() -> Self {
        Self {
            strategy: None,
            count: 0,
            results: Vec::new(),
        }
    }
}

/// A validated reverse geocoding request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverseQuery {
    /// Latitude of the search origin (WGS84).
    pub lat: f64,
    /// Longitude of the search origin (WGS84).
    pub lon: f64,
    /// Maximum number of results, already clamped.
    pub rows: u32,
    /// Search radius in kilometres, always positive.
    pub radius_km: f64,
}

/// Outcome of a reverse lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum ReverseOutcome {
    /// Records inside the radius, nearest first.
    Found(Vec<NormalizedResult>),
    /// Nothing inside the radius.
    NoMatch,
}

impl ReverseOutcome {
    /// Wraps `results`, mapping an empty list to [`ReverseOutcome::NoMatch`].
    #[must_use]
    pub fn from_results(results: Vec<NormalizedResult>) -> Self {
        if results.is_empty() {
            Self::NoMatch
        } else {
            Self::Found(results)
        }
    }
}
