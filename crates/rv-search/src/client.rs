//! HTTP client for the Elasticsearch REST API.

use std::time::Duration;

use serde_json::Value;

use crate::error::SearchError;
use crate::response::SearchResponse;

/// Thin wrapper over `reqwest` speaking the two operations this service
/// needs: `_search` against an index pattern and delete-by-pattern.
///
/// The per-request timeout is fixed at construction; there is no retry
/// logic anywhere in this layer.
pub struct EsClient {
    http: reqwest::Client,
    base_url: String,
}

impl EsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SearchError::Transport)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Execute a search against every index matching `index_pattern`.
    /// Patterns that match nothing yield an empty response instead of an
    /// error (`ignore_unavailable` + `allow_no_indices`).
    pub async fn search(
        &self,
        index_pattern: &str,
        body: Value,
    ) -> Result<SearchResponse, SearchError> {
        let url = format!(
            "{}/{}/_search?ignore_unavailable=true&allow_no_indices=true",
            self.base_url, index_pattern
        );
        tracing::debug!(index = index_pattern, "search");

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(index = index_pattern, status = status.as_u16(), "search failed");
            return Err(SearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Delete every index matching `index_pattern`. The backend must
    /// acknowledge the deletion or this fails.
    pub async fn delete_index(&self, index_pattern: &str) -> Result<(), SearchError> {
        let url = format!("{}/{}", self.base_url, index_pattern);
        tracing::info!(index = index_pattern, "delete indices");

        let response = self.http.delete(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::NotAcknowledged(index_pattern.to_string()));
        }

        let bytes = response.bytes().await?;
        let ack: Value = serde_json::from_slice(&bytes)?;
        match ack.get("acknowledged").and_then(Value::as_bool) {
            Some(true) => Ok(()),
            _ => Err(SearchError::NotAcknowledged(index_pattern.to_string())),
        }
    }
}
