//! In-memory [`SearchClient`] for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use solr_geocoder_solr::{Document, SearchClient, SearchError, SelectQuery, SelectResponse};

use crate::Geocoder;
use crate::config::GeocoderConfig;

/// One scripted answer.
pub enum Reply {
    /// Return these documents.
    Docs(Vec<serde_json::Value>),
    /// Fail as if Solr were down.
    Unavailable,
}

/// Replays scripted replies in order and records every query it receives.
///
/// Once the script runs out every further call returns no documents.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    queries: Mutex<Vec<SelectQuery>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<SelectQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchClient for ScriptedClient {
    async fn select(&self, query: &SelectQuery) -> Result<SelectResponse, SearchError> {
        self.queries.lock().unwrap().push(query.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Docs(docs)) => Ok(SelectResponse::from_docs(
                docs.into_iter()
                    .map(|d| d.as_object().cloned().unwrap())
                    .collect::<Vec<Document>>(),
            )),
            Some(Reply::Unavailable) => Err(SearchError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            }),
            None => Ok(SelectResponse::default()),
        }
    }
}

/// A geocoder on the built-in configuration backed by `client`.
pub fn geocoder(client: &Arc<ScriptedClient>) -> Geocoder {
    let config = GeocoderConfig::builtin().unwrap();
    Geocoder::new(Arc::new(config), client.clone())
}

/// Value of a free-form request parameter of `query`.
pub fn param<'a>(query: &'a SelectQuery, key: &str) -> Option<&'a str> {
    query
        .params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
