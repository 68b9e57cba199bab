//! Page harvesting: one URL, one isolated browsing context, one bounded wait
//!
//! # Architecture
//! - `context` - Provider/context traits and the extraction signal
//! - `chrome` - Chrome implementation over CDP browser contexts

mod chrome;
pub mod context;

pub use chrome::ChromeContextProvider;
pub use context::{BrowsingContext, ContextEvent, ContextProvider, ExtractionSignal};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::page_extractor::PageExtraction;
use crate::utils::HarvestError;

/// A successfully harvested page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestedPage {
    /// The URL that was requested, before any redirect
    pub url: String,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub extracted_at: DateTime<Utc>,
}

impl HarvestedPage {
    fn from_extraction(url: &str, extraction: PageExtraction) -> Self {
        Self {
            url: url.to_string(),
            title: extraction.title,
            content: extraction.content,
            word_count: extraction.word_count,
            extracted_at: Utc::now(),
        }
    }
}

/// A harvest attempt that produced no page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{url}: {cause}")]
pub struct HarvestFailure {
    pub url: String,
    pub cause: HarvestError,
}

pub type HarvestOutcome = Result<HarvestedPage, HarvestFailure>;

/// Loads single URLs in isolated contexts and waits for their extraction signal
#[derive(Clone)]
pub struct PageHarvester {
    provider: Arc<dyn ContextProvider>,
    timeout: Duration,
}

impl PageHarvester {
    pub fn new(provider: Arc<dyn ContextProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Harvest `url` once, with no retry
    ///
    /// Exactly one context is opened and, once opened, it is closed on every
    /// exit path before this returns.
    pub async fn harvest(&self, url: &str, request_id: &str) -> HarvestOutcome {
        let cancel = CancellationToken::new();
        let (signal, receiver) = ExtractionSignal::channel(cancel.clone());

        let mut context = match self.provider.open(url, signal).await {
            Ok(context) => context,
            Err(e) => {
                warn!("[{}] Could not open context for {}: {}", request_id, url, e);
                return Err(HarvestFailure {
                    url: url.to_string(),
                    cause: match e {
                        cause @ HarvestError::NavigationFailed(_) => cause,
                        other => HarvestError::NavigationFailed(other.to_string()),
                    },
                });
            }
        };
        debug!("[{}] Context {} loading {}", request_id, context.id(), url);

        let outcome = match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(ContextEvent::Extracted(extraction))) => {
                Ok(HarvestedPage::from_extraction(url, extraction))
            }
            Ok(Ok(ContextEvent::NavigationFailed(reason))) => {
                Err(HarvestError::NavigationFailed(reason))
            }
            Ok(Err(_)) => Err(HarvestError::ExtractionFailed(
                "context dropped the extraction signal".to_string(),
            )),
            Err(_) => Err(HarvestError::Timeout(self.timeout.as_millis() as u64)),
        };

        cancel.cancel();
        context.close().await;

        match outcome {
            Ok(page) => {
                debug!(
                    "[{}] Harvested {} ({} words)",
                    request_id, url, page.word_count
                );
                Ok(page)
            }
            Err(cause) => {
                warn!("[{}] Harvest failed for {}: {}", request_id, url, cause);
                Err(HarvestFailure {
                    url: url.to_string(),
                    cause,
                })
            }
        }
    }
}
