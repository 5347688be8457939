//! Related-document search collaborator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::schema::SearchConfig;
use crate::error::CollabError;
use crate::llm::http::classify_status;

/// One hit from the search index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelatedDoc {
    pub title: String,
    pub snippet: String,
    /// Link back to the document, possibly empty.
    #[serde(default)]
    pub reference: String,
    pub id: String,
}

/// Finds documents related to a query over the indexed corpus.
///
/// May legitimately return an empty list; the pipeline decides what to do
/// about that, not the collaborator.
pub trait RelatedDocSearch: Send + Sync {
    fn search(&self, query: &str, page_size: usize) -> Result<Vec<RelatedDoc>, CollabError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<RelatedDoc>,
}

/// [`RelatedDocSearch`] over a JSON search endpoint.
#[derive(Debug)]
pub struct HttpSearch {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpSearch {
    pub fn new(config: &SearchConfig) -> Result<Self, CollabError> {
        if config.endpoint.is_empty() {
            return Err(CollabError::InvalidRequest(
                "search.endpoint is not configured".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollabError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl RelatedDocSearch for HttpSearch {
    fn search(&self, query: &str, page_size: usize) -> Result<Vec<RelatedDoc>, CollabError> {
        let response = self
            .client
            .get(format!("{}/search", self.endpoint))
            .query(&[("q", query), ("page_size", &page_size.to_string())])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    CollabError::Timeout(e.to_string())
                } else {
                    CollabError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| CollabError::MalformedResponse(e.to_string()))?;

        log::info!(
            "Search returned {} results for query ({} chars)",
            parsed.results.len(),
            query.chars().count()
        );
        Ok(parsed.results)
    }
}
