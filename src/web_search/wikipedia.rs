//! Wikipedia open-search backend
//!
//! One GET to the MediaWiki `opensearch` action. The response is a 4-element
//! array `[query, titles, descriptions, urls]`; only the URLs are used.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::SearchBackend;
use super::types::{SearchError, SearchSource};
use crate::SearchConfig;
use crate::utils::constants::CHROME_USER_AGENT;

pub struct WikipediaBackend {
    client: Client,
    endpoint: String,
    limit: usize,
    timeout_ms: u64,
}

impl WikipediaBackend {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(CHROME_USER_AGENT)
            .build()
            .map_err(|e| SearchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.wikipedia_url(),
            limit: config.results_per_backend,
            timeout_ms: config.request_timeout_secs * 1000,
        })
    }
}

/// URLs from an open-search response; absent or mistyped 4th element → none
pub fn parse_opensearch(body: &Value, limit: usize) -> Vec<String> {
    body.get(3)
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchBackend for WikipediaBackend {
    fn source(&self) -> SearchSource {
        SearchSource::Wikipedia
    }

    async fn fetch(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", limit.as_str()),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(e, self.timeout_ms))?;

        if !response.status().is_success() {
            return Err(SearchError::ApiError {
                status: response.status().as_u16(),
                message: "Wikipedia open-search request failed".to_string(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        let urls = parse_opensearch(&body, self.limit);
        debug!("Wikipedia returned {} URLs for '{}'", urls.len(), query);
        Ok(urls)
    }
}
