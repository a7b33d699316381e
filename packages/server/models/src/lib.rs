#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the geocoder server.
//!
//! Requests arrive as query strings (GET) or JSON/form bodies (POST), so
//! every request type is built from a loose JSON object rather than a
//! fixed struct. Responses wrap the core result types.

use serde::Serialize;
use serde_json::{Map, Value};
use solr_geocoder_models::{AddressQuery, ForwardResult, scalar_to_string};

/// Raw request parameters, keyed by name.
pub type RawParams = Map<String, Value>;

/// Converts query-string or form pairs into [`RawParams`].
#[must_use]
pub fn params_from_pairs<I>(pairs: I) -> RawParams
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect()
}

/// First present, non-null scalar among `keys`, as a string.
fn first_scalar(params: &RawParams, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| params.get(*k))
        .find_map(scalar_to_string)
}

/// A forward geocoding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
    /// Cleaned address fields.
    pub address: AddressQuery,
    /// Requested row count; `None` if absent or not an integer.
    pub rows: Option<i64>,
}

impl ForwardRequest {
    /// Extracts the address fields and `rows` from raw parameters.
    ///
    /// Unknown keys are carried along in `address`; the geocoder only reads
    /// its configured fields.
    #[must_use]
    pub fn from_params(params: &RawParams) -> Self {
        let rows = first_scalar(params, &["rows"]).and_then(|r| r.trim().parse().ok());
        let mut fields = params.clone();
        fields.remove("rows");
        Self {
            address: AddressQuery::from_json(&fields),
            rows,
        }
    }
}

/// A reverse geocoding request, still unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseRequest {
    /// Latitude.
    pub lat: Option<String>,
    /// Longitude.
    pub lon: Option<String>,
    /// Maximum number of results.
    pub max_results: Option<String>,
    /// Search radius in kilometres.
    pub max_radius: Option<String>,
}

impl ReverseRequest {
    /// Extracts reverse parameters, accepting both camelCase
    /// (`maxResults`, `maxDistance`) and snake_case (`max_results`,
    /// `max_radius`) names.
    #[must_use]
    pub fn from_params(params: &RawParams) -> Self {
        Self {
            lat: first_scalar(params, &["lat"]),
            lon: first_scalar(params, &["lon"]),
            max_results: first_scalar(params, &["maxResults", "max_results"]),
            max_radius: first_scalar(params, &["maxDistance", "max_radius", "max_distance"]),
        }
    }
}

/// Successful forward geocoding response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiForwardResponse {
    /// The request parameters as received.
    pub input: RawParams,
    /// Cascade outcome.
    #[serde(flatten)]
    pub result: ForwardResult,
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// The request parameters as received, for rejected requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<RawParams>,
    /// What went wrong.
    pub error: String,
}

impl ApiError {
    /// An error without the request echo.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            input: None,
            error: error.into(),
        }
    }

    /// An error echoing the rejected request.
    #[must_use]
    pub fn with_input(input: RawParams, error: impl Into<String>) -> Self {
        Self {
            input: Some(input),
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
