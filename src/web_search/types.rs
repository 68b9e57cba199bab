//! Core types for the search backends

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which backend discovered a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// Wikipedia open-search API
    Wikipedia,
    /// DuckDuckGo lite HTML results
    DuckDuckGo,
}

impl SearchSource {
    pub fn label(self) -> &'static str {
        match self {
            SearchSource::Wikipedia => "wikipedia",
            SearchSource::DuckDuckGo => "duckduckgo",
        }
    }
}

impl std::fmt::Display for SearchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A discovered URL tagged with the backend that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateUrl {
    pub url: String,
    pub source: SearchSource,
}

impl CandidateUrl {
    pub fn new(url: impl Into<String>, source: SearchSource) -> Self {
        Self {
            url: url.into(),
            source,
        }
    }
}

/// Errors inside a search backend
///
/// Never leave the backend: `SearchBackend::search` turns them into an empty
/// URL list.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Non-success HTTP status from the search provider
    #[error("Search API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Request could not be sent or the body could not be read
    #[error("Search request failed: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Search timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Response body did not have the expected shape
    #[error("Malformed search response: {0}")]
    Parse(String),

    /// HTTP client could not be constructed
    #[error("Search client setup failed: {0}")]
    Client(String),
}

impl SearchError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            SearchError::Timeout { timeout_ms }
        } else {
            SearchError::Network(err.to_string())
        }
    }
}
