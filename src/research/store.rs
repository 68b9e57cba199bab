//! Result store with time-based expiry
//!
//! Every run registers its live `SearchResult` here so callers can poll it by
//! request id. A background sweeper purges results whose age since
//! `timestamp` exceeds the TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::result::SearchResult;

pub type SharedResult = Arc<RwLock<SearchResult>>;

pub struct ResultStore {
    results: DashMap<String, SharedResult>,
    ttl: Duration,
    sweep_token: CancellationToken,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl ResultStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            results: DashMap::new(),
            ttl,
            sweep_token: CancellationToken::new(),
            sweep_task: Mutex::new(None),
        }
    }

    /// Register a result, replacing any earlier one with the same request id
    pub fn insert(&self, result: SearchResult) -> SharedResult {
        let request_id = result.request_id.clone();
        let shared = Arc::new(RwLock::new(result));
        self.results.insert(request_id, shared.clone());
        shared
    }

    pub fn get(&self, request_id: &str) -> Option<SharedResult> {
        self.results.get(request_id).map(|entry| entry.value().clone())
    }

    /// Copy of the current state of a result
    pub async fn snapshot(&self, request_id: &str) -> Option<SearchResult> {
        let shared = self.get(request_id)?;
        let result = shared.read().await;
        Some(result.clone())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Drop every result older than the TTL at `now`; returns how many went
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let expired = self.expired_entries(now).await;
        self.remove_entries(&expired)
    }

    async fn expired_entries(&self, now: DateTime<Utc>) -> Vec<(String, SharedResult)> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);

        let entries: Vec<(String, SharedResult)> = self
            .results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut expired = Vec::new();
        for (request_id, shared) in entries {
            if shared.read().await.age(now) > ttl {
                expired.push((request_id, shared));
            }
        }
        expired
    }

    /// Remove each entry only if the store still holds that same result;
    /// one re-inserted under the id since the scan survives
    fn remove_entries(&self, expired: &[(String, SharedResult)]) -> usize {
        expired
            .iter()
            .filter(|(request_id, shared)| {
                self.results
                    .remove_if(request_id, |_, current| Arc::ptr_eq(current, shared))
                    .is_some()
            })
            .count()
    }

    /// Start the periodic purge; later calls while it runs are no-ops
    pub async fn spawn_sweeper(self: &Arc<Self>, interval: Duration) {
        let mut task = self.sweep_task.lock().await;
        if task.is_some() {
            return;
        }

        let store = Arc::clone(self);
        let token = self.sweep_token.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = store.purge_expired(Utc::now()).await;
                        if purged > 0 {
                            log::info!("Purged {} expired results", purged);
                        }
                    }
                    _ = token.cancelled() => {
                        log::info!("Result sweeper cancelled");
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the sweeper and wait briefly for it to exit
    pub async fn shutdown(&self) {
        self.sweep_token.cancel();

        let mut task = self.sweep_task.lock().await;
        if let Some(handle) = task.take() {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => log::info!("Result sweeper stopped"),
                Ok(Err(e)) => log::warn!("Result sweeper panicked: {:?}", e),
                Err(_) => log::warn!("Result sweeper didn't stop within timeout"),
            }
        }
    }
}
