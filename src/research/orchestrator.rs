//! Search orchestration: discover, merge, harvest, assemble
//!
//! A run goes `processing → completed` (or `failed` when no backend could be
//! reached). Harvests for every merged URL start together behind a semaphore
//! and the run only finalizes after all of them have settled.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::result::{SearchRequest, SearchResult};
use super::store::{ResultStore, SharedResult};
use crate::Config;
use crate::harvest::{ChromeContextProvider, HarvestFailure, PageHarvester};
use crate::manager::BrowserManager;
use crate::utils::{HarvestError, ResearchError, validate_harvest_timeout};
use crate::web_search::{CandidateUrl, SearchBackend, default_backends, discover, merge};

pub struct ResearchOrchestrator {
    backends: Vec<Arc<dyn SearchBackend>>,
    harvester: PageHarvester,
    store: Arc<ResultStore>,
    max_concurrent: usize,
}

impl ResearchOrchestrator {
    pub fn new(
        backends: Vec<Arc<dyn SearchBackend>>,
        harvester: PageHarvester,
        store: Arc<ResultStore>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            backends,
            harvester,
            store,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Production wiring: both web backends and Chrome contexts from `manager`
    pub fn with_chrome(config: &Config, manager: Arc<BrowserManager>) -> Result<Self, ResearchError> {
        let backends = default_backends(&config.search)
            .map_err(|e| ResearchError::UnexpectedError(e.to_string()))?;
        let timeout = validate_harvest_timeout(
            Some(config.research.harvest_timeout_secs),
            config.research.harvest_timeout_secs,
        )?;
        let provider = Arc::new(ChromeContextProvider::new(
            manager,
            config.research.min_content_chars,
        ));
        let store = Arc::new(ResultStore::new(Duration::from_secs(
            config.research.result_ttl_secs,
        )));

        Ok(Self::new(
            backends,
            PageHarvester::new(provider, timeout),
            store,
            config.research.max_concurrent_harvests,
        ))
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Full pipeline for one query
    pub async fn run(&self, request: SearchRequest) -> SearchResult {
        let shared = self.store.insert(SearchResult::start(&request));
        info!(
            "[{}] Researching '{}' (budget {})",
            request.request_id, request.query, request.page_budget
        );

        let discovery = discover(&self.backends, &request.query).await;
        if discovery.reachable == 0 {
            let mut result = shared.write().await;
            let reason = ResearchError::BackendsUnreachable(request.query.clone()).to_string();
            warn!("[{}] {}", request.request_id, reason);
            if let Err(e) = result.fail(reason) {
                warn!("[{}] {}", request.request_id, e);
            }
            return result.clone();
        }

        let urls: Vec<String> = discovery
            .merged(request.page_budget)
            .into_iter()
            .map(|candidate| candidate.url)
            .collect();

        self.harvest_into(&urls, &request.request_id, &shared).await;
        self.finalize(&shared, &urls).await
    }

    /// Discovery without harvesting: merged candidates with their provenance
    pub async fn discover_only(
        &self,
        query: &str,
        budget: usize,
    ) -> Result<Vec<CandidateUrl>, ResearchError> {
        let discovery = discover(&self.backends, query).await;
        if discovery.reachable == 0 {
            return Err(ResearchError::BackendsUnreachable(query.to_string()));
        }
        Ok(discovery.merged(budget))
    }

    /// Harvest caller-supplied URLs, skipping discovery
    pub async fn extract_urls(&self, urls: &[String], request_id: &str) -> SearchResult {
        let urls = merge(urls, &[], urls.len());
        let request = SearchRequest::new(String::new(), request_id, urls.len());
        let shared = self.store.insert(SearchResult::start(&request));
        info!("[{}] Extracting {} URLs", request_id, urls.len());

        self.harvest_into(&urls, request_id, &shared).await;
        self.finalize(&shared, &urls).await
    }

    async fn finalize(&self, shared: &SharedResult, order: &[String]) -> SearchResult {
        let mut result = shared.write().await;
        let finalized = match result.order_sources_by(order) {
            Ok(()) => result.complete(),
            Err(e) => Err(e),
        };
        if let Err(e) = finalized {
            warn!("[{}] Could not finalize: {}", result.request_id, e);
        }
        info!(
            "[{}] Completed with {}/{} sources",
            result.request_id,
            result.sources.len(),
            order.len()
        );
        result.clone()
    }

    /// Harvest every URL, appending successes to `shared` as they arrive
    ///
    /// Returns once every attempt has settled.
    async fn harvest_into(&self, urls: &[String], request_id: &str, shared: &SharedResult) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set = JoinSet::new();

        for url in urls {
            let url = url.clone();
            let request_id = request_id.to_string();
            let harvester = self.harvester.clone();
            let semaphore = Arc::clone(&semaphore);
            let shared = Arc::clone(shared);

            join_set.spawn(async move {
                let _permit = semaphore.acquire().await.map_err(|e| HarvestFailure {
                    url: url.clone(),
                    cause: HarvestError::ExtractionFailed(format!("Semaphore error: {e}")),
                })?;

                let page = harvester.harvest(&url, &request_id).await?;

                let mut result = shared.write().await;
                if let Err(e) = result.push_source(page) {
                    warn!("[{}] Dropped source {}: {}", request_id, url, e);
                }
                Ok::<(), HarvestFailure>(())
            });
        }

        let mut failed = 0usize;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                // Already logged by the harvester
                Ok(Err(_)) => failed += 1,
                Err(e) => {
                    failed += 1;
                    warn!("[{}] Harvest task panicked: {}", request_id, e);
                }
            }
        }

        if failed > 0 {
            info!("[{}] {} of {} harvests failed", request_id, failed, urls.len());
        }
    }
}
