#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Solr select client for the address geocoder.
//!
//! The geocoder only ever talks to the index through [`SearchClient`], a
//! single `select` call that takes a [`SelectQuery`] and returns the ranked
//! documents. [`SolrClient`] is the `reqwest`-backed implementation used in
//! production; tests substitute their own implementations.

pub mod client;
pub mod query;

pub use client::SolrClient;
pub use query::{SelectQuery, SpatialFilter};

use thiserror::Error;

/// A raw document as returned by Solr.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Documents returned by a single select call, in the engine's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectResponse {
    /// Matching documents, ranked or sorted by the engine.
    pub docs: Vec<Document>,
    /// Total number of matches, which may exceed `docs.len()`.
    pub num_found: u64,
}

impl SelectResponse {
    /// Wraps a page of documents whose total equals the page size.
    #[must_use]
    pub fn from_docs(docs: Vec<Document>) -> Self {
        let num_found = docs.len() as u64;
        Self { docs, num_found }
    }
}

/// Errors from talking to the search index.
///
/// Every variant means the index could not answer. None of them is ever a
/// legitimate "no results" response.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed (connection refused, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Solr answered with a non-success status code.
    #[error("Solr returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// Response body did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Client settings were invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the invalid setting.
        message: String,
    },
}

impl SearchError {
    /// Whether the request timed out before Solr answered.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Access to the search index.
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    /// Runs a select query and returns the matching documents.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the index is unreachable, times out,
    /// answers with a failure status, or returns a malformed body.
    async fn select(&self, query: &SelectQuery) -> Result<SelectResponse, SearchError>;
}
