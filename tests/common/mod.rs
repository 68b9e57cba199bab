// Fakes shared by the integration tests: search backends with canned answers
// and a context provider that counts every context it opens and closes.

#![allow(dead_code)]

use async_trait::async_trait;
use research_harvest::{
    BrowsingContext, ContextEvent, ContextProvider, ExtractionSignal, HarvestError, PageHarvester,
    PageSnapshot, ResearchOrchestrator, ResultStore, SearchBackend, SearchError, SearchSource,
    extract_page,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct FakeBackend {
    source: SearchSource,
    urls: Option<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeBackend {
    pub fn returning(source: SearchSource, urls: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            source,
            urls: Some(urls.iter().map(|u| u.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unreachable(source: SearchSource) -> Arc<Self> {
        Arc::new(Self {
            source,
            urls: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SearchBackend for FakeBackend {
    fn source(&self) -> SearchSource {
        self.source
    }

    async fn fetch(&self, _query: &str) -> Result<Vec<String>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls
            .clone()
            .ok_or_else(|| SearchError::Network("connection refused".to_string()))
    }
}

/// How a fake page behaves once its context is open
#[derive(Debug, Clone)]
pub enum PageBehavior {
    /// Fire the extraction signal after `delay` with this body text
    Loads { body: String, delay: Duration },
    /// Never fire the signal
    Hangs,
    /// Report a navigation failure
    NavigationFails,
    /// Fail inside `open`, after partially creating the context
    OpenFails,
}

impl PageBehavior {
    pub fn loads(body: &str) -> Self {
        PageBehavior::Loads {
            body: body.to_string(),
            delay: Duration::from_millis(5),
        }
    }

    pub fn loads_after(body: &str, delay: Duration) -> Self {
        PageBehavior::Loads {
            body: body.to_string(),
            delay,
        }
    }
}

#[derive(Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub cancelled: AtomicUsize,
    pub opened_urls: Mutex<Vec<String>>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened_urls.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

pub struct FakeProvider {
    behaviors: HashMap<String, PageBehavior>,
    fallback: PageBehavior,
    pub counters: Arc<Counters>,
}

impl FakeProvider {
    pub fn new(fallback: PageBehavior) -> Self {
        Self {
            behaviors: HashMap::new(),
            fallback,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with(mut self, url: &str, behavior: PageBehavior) -> Self {
        self.behaviors.insert(url.to_string(), behavior);
        self
    }
}

struct FakeContext {
    id: String,
    counters: Arc<Counters>,
    closed: bool,
}

#[async_trait]
impl BrowsingContext for FakeContext {
    fn id(&self) -> &str {
        &self.id
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn snapshot_for(url: &str, body: &str) -> PageSnapshot {
    PageSnapshot {
        url: url.to_string(),
        title: format!("Page at {url}"),
        html: format!("<html><body><nav>Home About</nav><p>{body}</p></body></html>"),
    }
}

#[async_trait]
impl ContextProvider for FakeProvider {
    async fn open(
        &self,
        url: &str,
        signal: ExtractionSignal,
    ) -> Result<Box<dyn BrowsingContext>, HarvestError> {
        let behavior = self
            .behaviors
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        let index = self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut urls) = self.counters.opened_urls.lock() {
            urls.push(url.to_string());
        }

        let counters = self.counters.clone();
        match behavior {
            PageBehavior::OpenFails => {
                // Partially created context is discarded before reporting
                counters.closed.fetch_add(1, Ordering::SeqCst);
                return Err(HarvestError::NavigationFailed(format!(
                    "{url}: target crashed"
                )));
            }
            PageBehavior::Loads { body, delay } => {
                let snapshot = snapshot_for(url, &body);
                tokio::spawn(async move {
                    let loaded = tokio::select! {
                        _ = signal.cancelled() => false,
                        _ = tokio::time::sleep(delay) => true,
                    };
                    if loaded {
                        signal.fire(ContextEvent::Extracted(extract_page(&snapshot, 500)));
                    } else {
                        counters.cancelled.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
            PageBehavior::Hangs => {
                tokio::spawn(async move {
                    signal.cancelled().await;
                    counters.cancelled.fetch_add(1, Ordering::SeqCst);
                });
            }
            PageBehavior::NavigationFails => {
                let reason = format!("{url}: net::ERR_NAME_NOT_RESOLVED");
                tokio::spawn(async move {
                    signal.fire(ContextEvent::NavigationFailed(reason));
                });
            }
        }

        Ok(Box::new(FakeContext {
            id: format!("fake-{index}"),
            counters: self.counters.clone(),
            closed: false,
        }))
    }
}

pub fn orchestrator(
    backends: Vec<Arc<dyn SearchBackend>>,
    provider: FakeProvider,
    timeout: Duration,
) -> (ResearchOrchestrator, Arc<Counters>) {
    let counters = provider.counters.clone();
    let harvester = PageHarvester::new(Arc::new(provider), timeout);
    let store = Arc::new(ResultStore::new(Duration::from_secs(3600)));
    (ResearchOrchestrator::new(backends, harvester, store, 3), counters)
}
