//! HTTP client for a JSON inference endpoint.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::schema::LlmConfig;
use crate::error::CollabError;
use crate::finding::Finding;
use crate::llm::parse::parse_findings;
use crate::llm::prompt::ComparePrompt;
use crate::llm::TextComparer;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// [`TextComparer`] backed by an HTTP inference endpoint.
///
/// Posts `{model, prompt}` to `<endpoint>/generate` and feeds the returned
/// text through the defensive parser. HTTP status classes map onto the
/// transient/permanent error taxonomy so the retry whitelist stays honest.
#[derive(Debug)]
pub struct HttpComparer {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    prompt: ComparePrompt,
}

impl HttpComparer {
    pub fn new(config: &LlmConfig, max_doc_chars: usize) -> Result<Self, CollabError> {
        if config.endpoint.is_empty() {
            return Err(CollabError::InvalidRequest(
                "llm.endpoint is not configured".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollabError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            prompt: ComparePrompt::new(max_doc_chars),
        })
    }
}

impl TextComparer for HttpComparer {
    fn compare(
        &self,
        new_text: &str,
        old_text: &str,
        feedback_context: &str,
    ) -> Result<Vec<Finding>, CollabError> {
        let prompt = self.prompt.render(new_text, old_text, feedback_context);

        let response = self
            .client
            .post(format!("{}/generate", self.endpoint))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "temperature": 0.1,
            }))
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let generated: GenerateResponse = response
            .json()
            .map_err(|e| CollabError::MalformedResponse(e.to_string()))?;

        Ok(parse_findings(&generated.text))
    }
}

fn classify_transport_error(e: reqwest::Error) -> CollabError {
    if e.is_timeout() {
        CollabError::Timeout(e.to_string())
    } else if e.is_connect() {
        CollabError::Unavailable(e.to_string())
    } else {
        CollabError::InvalidRequest(e.to_string())
    }
}

pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> CollabError {
    let detail = format!("{}: {}", status, body.chars().take(200).collect::<String>());
    match status.as_u16() {
        408 => CollabError::Timeout(detail),
        429 => CollabError::RateLimited(detail),
        401 | 403 => CollabError::Auth(detail),
        404 => CollabError::NotFound(detail),
        500..=599 => CollabError::Unavailable(detail),
        _ => CollabError::InvalidRequest(detail),
    }
}
