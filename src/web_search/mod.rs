//! Search backends and URL aggregation
//!
//! Each backend turns a query into an ordered list of candidate page URLs.
//! Backends are queried together, both results are awaited, and the lists are
//! merged into one deduplicated, budget-capped sequence.
//!
//! # Architecture
//! - `types` - Source tags, candidate URLs, errors
//! - `wikipedia` - Open-search JSON API backend
//! - `duckduckgo` - Lite HTML scraping backend
//! - `aggregate` - Order-preserving merge

mod aggregate;
pub mod duckduckgo;
mod types;
pub mod wikipedia;

pub use aggregate::{merge, merge_candidates};
pub use duckduckgo::DuckDuckGoBackend;
pub use types::{CandidateUrl, SearchError, SearchSource};
pub use wikipedia::WikipediaBackend;

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use crate::SearchConfig;

/// A search surface that maps a query to candidate page URLs
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Provenance tag attached to every URL this backend produces
    fn source(&self) -> SearchSource;

    /// Query the backend, surfacing internal failures
    async fn fetch(&self, query: &str) -> Result<Vec<String>, SearchError>;

    /// Query the backend; failures are logged and become an empty list
    async fn search(&self, query: &str) -> Vec<String> {
        match self.fetch(query).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!("{} search failed for '{}': {}", self.source(), query, e);
                Vec::new()
            }
        }
    }
}

/// Candidate lists from one fan-out, in backend order
#[derive(Debug, Default)]
pub struct Discovery {
    pub lists: Vec<Vec<CandidateUrl>>,
    /// Backends that answered, even with zero matches
    pub reachable: usize,
}

impl Discovery {
    /// Merge the lists into at most `budget` distinct candidates
    pub fn merged(self, budget: usize) -> Vec<CandidateUrl> {
        merge_candidates(self.lists, budget)
    }
}

/// Query every backend concurrently and wait for all of them
pub async fn discover(backends: &[Arc<dyn SearchBackend>], query: &str) -> Discovery {
    let responses = join_all(backends.iter().map(|backend| async move {
        let source = backend.source();
        match backend.fetch(query).await {
            Ok(urls) => Some(
                urls.into_iter()
                    .map(|url| CandidateUrl::new(url, source))
                    .collect::<Vec<_>>(),
            ),
            Err(e) => {
                warn!("{} search failed for '{}': {}", source, query, e);
                None
            }
        }
    }))
    .await;

    let mut discovery = Discovery::default();
    for response in responses {
        match response {
            Some(candidates) => {
                discovery.reachable += 1;
                discovery.lists.push(candidates);
            }
            None => discovery.lists.push(Vec::new()),
        }
    }

    info!(
        "Discovered {} candidate URLs from {}/{} backends for '{}'",
        discovery.lists.iter().map(Vec::len).sum::<usize>(),
        discovery.reachable,
        backends.len(),
        query
    );

    discovery
}

/// The two production backends, in fan-out order
pub fn default_backends(config: &SearchConfig) -> Result<Vec<Arc<dyn SearchBackend>>, SearchError> {
    let wikipedia: Arc<dyn SearchBackend> = Arc::new(WikipediaBackend::new(config)?);
    let duckduckgo: Arc<dyn SearchBackend> = Arc::new(DuckDuckGoBackend::new(config)?);
    Ok(vec![wikipedia, duckduckgo])
}
