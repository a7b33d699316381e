//! `reqwest`-backed Solr client.
//!
//! Issues `GET <core>/select` requests with a bounded timeout. Failed calls
//! are returned as-is with no retry.
//!
//! See <https://solr.apache.org/guide/solr/latest/query-guide/common-query-parameters.html>

use std::time::Duration;

use crate::{Document, SearchClient, SearchError, SelectQuery, SelectResponse};

/// Core URL used when `SOLR_URL` is not set.
pub const DEFAULT_SOLR_URL: &str = "http://solr:8983/solr/addresses";

/// Per-request timeout used when `SOLR_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

/// Maximum length of the response body included in status errors.
const BODY_PREVIEW_LEN: usize = 500;

/// Client for a single Solr core.
#[derive(Debug, Clone)]
pub struct SolrClient {
    client: reqwest::Client,
    select_url: String,
}

impl SolrClient {
    /// Creates a client for the core at `core_url`
    /// (e.g. `"http://localhost:8983/solr/addresses"`).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(core_url: &str, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            select_url: select_url(core_url),
        })
    }

    /// Creates a client from `SOLR_URL` and `SOLR_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `SOLR_TIMEOUT_SECS` is not a
    /// positive integer, or [`SearchError::Http`] if the HTTP client cannot
    /// be built.
    pub fn from_env() -> Result<Self, SearchError> {
        let url = std::env::var("SOLR_URL").unwrap_or_else(|_| DEFAULT_SOLR_URL.to_string());
        let timeout = match std::env::var("SOLR_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => DEFAULT_TIMEOUT,
        };

        log::info!("Using Solr core at {url} (timeout {timeout:?})");
        Self::new(&url, timeout)
    }

    /// Full URL of the select handler.
    #[must_use]
    pub fn select_url(&self) -> &str {
        &self.select_url
    }
}

#[async_trait::async_trait]
impl SearchClient for SolrClient {
    async fn select(&self, query: &SelectQuery) -> Result<SelectResponse, SearchError> {
        let params = query.to_params();
        log::trace!("Solr select {} {params:?}", self.select_url);

        let resp = self
            .client
            .get(&self.select_url)
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: body.chars().take(BODY_PREVIEW_LEN).collect(),
            });
        }

        let body = resp.text().await?;
        parse_select_response(&body)
    }
}

/// Appends `/select` to a core URL, tolerating a trailing slash.
fn select_url(core_url: &str) -> String {
    format!("{}/select", core_url.trim_end_matches('/'))
}

fn parse_timeout(raw: &str) -> Result<Duration, SearchError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SearchError::Config {
            message: format!("SOLR_TIMEOUT_SECS must be a positive integer, got {raw:?}"),
        }),
    }
}

/// Parses a Solr JSON select response body.
fn parse_select_response(body: &str) -> Result<SelectResponse, SearchError> {
    let body: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SearchError::Parse {
            message: format!("Solr response is not JSON: {e}"),
        })?;

    let response = body.get("response").ok_or_else(|| SearchError::Parse {
        message: "Solr response missing 'response' object".to_string(),
    })?;

    let docs = response
        .get("docs")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SearchError::Parse {
            message: "Solr response missing 'docs' array".to_string(),
        })?;

    let docs = docs
        .iter()
        .map(|doc| {
            doc.as_object()
                .cloned()
                .ok_or_else(|| SearchError::Parse {
                    message: format!("Solr document is not an object: {doc}"),
                })
        })
        .collect::<Result<Vec<Document>, _>>()?;

    let num_found = response
        .get("numFound")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(docs.len() as u64);

    Ok(SelectResponse { docs, num_found })
}
