//! Browsing contexts backed by the shared headless Chrome
//!
//! Each context is a CDP browser context (own cookies, storage and cache) with
//! one background target in it. The target is created blank, then navigated
//! by a spawned task that snapshots the rendered page, runs the text
//! extractor and fires the extraction signal.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::page::Page;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::context::{BrowsingContext, ContextEvent, ContextProvider, ExtractionSignal};
use crate::browser::BrowserError;
use crate::manager::{BrowserManager, BrowserSlot};
use crate::page_extractor::{PageSnapshot, SNAPSHOT_SCRIPT, extract_page};
use crate::utils::HarvestError;

/// Opens harvest contexts in the browser owned by a `BrowserManager`
pub struct ChromeContextProvider {
    manager: Arc<BrowserManager>,
    min_content_chars: usize,
}

impl ChromeContextProvider {
    pub fn new(manager: Arc<BrowserManager>, min_content_chars: usize) -> Self {
        Self {
            manager,
            min_content_chars,
        }
    }
}

#[async_trait]
impl ContextProvider for ChromeContextProvider {
    async fn open(
        &self,
        url: &str,
        signal: ExtractionSignal,
    ) -> Result<Box<dyn BrowsingContext>, HarvestError> {
        let browser_arc = self
            .manager
            .get_or_launch()
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let guard = browser_arc.lock().await;
        let wrapper = guard.as_ref().ok_or_else(|| {
            BrowserError::LaunchFailed("Browser not available after launch".to_string())
        })?;

        let context_id = wrapper.create_isolated_context().await?;
        let page = match wrapper.open_background_page(&context_id).await {
            Ok(page) => page,
            Err(e) => {
                // Context exists but has no page: discard it before reporting
                if let Err(dispose_err) = wrapper.dispose_context(context_id).await {
                    warn!("Failed to dispose half-open context: {}", dispose_err);
                }
                return Err(e.into());
            }
        };
        drop(guard);

        let id = context_id.inner().clone();
        debug!("Opened context {} for {}", id, url);

        let task = tokio::spawn(drive_page(
            page.clone(),
            url.to_string(),
            signal,
            self.min_content_chars,
        ));

        Ok(Box::new(ChromeContext {
            id,
            context_id: Some(context_id),
            page: Some(page),
            task,
            browser: browser_arc,
        }))
    }
}

/// Navigate, snapshot and extract, unless the attempt is cancelled first
async fn drive_page(page: Page, url: String, signal: ExtractionSignal, min_content_chars: usize) {
    let event = tokio::select! {
        _ = signal.cancelled() => {
            debug!("Extraction for {} cancelled", url);
            return;
        }
        event = load_and_extract(&page, &url, min_content_chars) => event,
    };

    if !signal.fire(event) {
        debug!("Harvester stopped listening before {} reported", url);
    }
}

async fn load_and_extract(page: &Page, url: &str, min_content_chars: usize) -> ContextEvent {
    if let Err(e) = page.goto(url).await {
        return ContextEvent::NavigationFailed(format!("{url}: {e}"));
    }

    let mut snapshot = match page.evaluate(SNAPSHOT_SCRIPT).await {
        Ok(result) => result.into_value::<PageSnapshot>().unwrap_or_else(|e| {
            warn!("Unreadable page snapshot for {}: {}", url, e);
            PageSnapshot::default()
        }),
        Err(e) => {
            warn!("Snapshot script failed for {}: {}", url, e);
            PageSnapshot::default()
        }
    };

    if snapshot.url.is_empty() {
        snapshot.url = url.to_string();
    }

    ContextEvent::Extracted(extract_page(&snapshot, min_content_chars))
}

struct ChromeContext {
    id: String,
    context_id: Option<BrowserContextId>,
    page: Option<Page>,
    task: JoinHandle<()>,
    browser: BrowserSlot,
}

#[async_trait]
impl BrowsingContext for ChromeContext {
    fn id(&self) -> &str {
        &self.id
    }

    async fn close(&mut self) {
        self.task.abort();

        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!("Page in context {} already gone: {}", self.id, e);
        }

        let Some(context_id) = self.context_id.take() else {
            return;
        };

        let guard = self.browser.lock().await;
        match guard.as_ref() {
            Some(wrapper) => {
                if let Err(e) = wrapper.dispose_context(context_id).await {
                    warn!("Failed to dispose context {}: {}", self.id, e);
                } else {
                    debug!("Closed context {}", self.id);
                }
            }
            // Browser already shut down; its contexts went with it
            None => debug!("Browser gone before context {} was closed", self.id),
        }
    }
}
