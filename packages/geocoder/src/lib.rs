#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding against a Solr index.
//!
//! Resolves address fragments (postal code, city, street, house number)
//! into canonical address records using a cascade of strategies
//! configured in [`config::GeocoderConfig`]:
//!
//! 1. **Exact** strategies quote every field and require all of them.
//! 2. **Fuzzy** strategies allow a length-dependent edit distance per word
//!    (see [`fuzzy`]).
//!
//! Strategies run in configured order and the first one returning any
//! document wins; later strategies are never consulted. Reverse lookups
//! skip the cascade and run a single radius search sorted by distance
//! (see [`reverse`]).
//!
//! Every hit is reshaped by [`normalize`], which also scores how closely
//! each queried field matches the stored value.

pub mod cascade;
pub mod config;
pub mod fuzzy;
pub mod normalize;
pub mod query;
pub mod reverse;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use solr_geocoder_solr::{SearchClient, SearchError};
use thiserror::Error;

use crate::config::GeocoderConfig;

pub use solr_geocoder_models::{
    AddressQuery, ForwardResult, MatchKind, NormalizedResult, QualityMap, ReverseOutcome,
    ReverseQuery, StrategyDefinition,
};

/// Errors from geocoding operations.
///
/// "No match" is not an error; see [`ForwardResult::no_match`] and
/// [`ReverseOutcome::NoMatch`].
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The request was rejected before touching the index.
    #[error("{message}")]
    Validation {
        /// Human-readable reason, returned to the caller.
        message: String,
    },

    /// The index could not answer (unreachable, timeout, error status).
    #[error("Search index unavailable: {0}")]
    Upstream(#[from] SearchError),

    /// The index returned a document that breaks the expected schema.
    #[error("Malformed document field '{field}': {message}")]
    MalformedDocument {
        /// Offending field.
        field: String,
        /// Description of the problem.
        message: String,
    },
}

impl GeocodeError {
    /// Creates a [`GeocodeError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Geocoding engine bound to one configuration and one search client.
///
/// Cheap to clone; both halves are shared behind `Arc`.
#[derive(Clone)]
pub struct Geocoder {
    config: Arc<GeocoderConfig>,
    client: Arc<dyn SearchClient>,
}

impl Geocoder {
    /// Creates an engine. The configuration is expected to be validated
    /// (every [`GeocoderConfig`] constructor does so).
    #[must_use]
    pub fn new(config: Arc<GeocoderConfig>, client: Arc<dyn SearchClient>) -> Self {
        Self { config, client }
    }
}
