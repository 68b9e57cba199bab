//! Browsing contexts and the signal a loaded page sends back
//!
//! A `ContextProvider` opens one isolated, non-foregrounded context per harvest
//! attempt. The context reports through the `ExtractionSignal` it was opened
//! with: exactly one `ContextEvent`, or nothing at all if the page never
//! finishes. The harvester owns the receiving end and the cancellation token.

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::page_extractor::PageExtraction;
use crate::utils::HarvestError;

/// What a browsing context reports to its harvester
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    /// The page loaded and its text was extracted
    Extracted(PageExtraction),
    /// The page could not be loaded
    NavigationFailed(String),
}

/// Single-use channel from a browsing context to the harvest attempt that owns it
#[derive(Debug)]
pub struct ExtractionSignal {
    sender: oneshot::Sender<ContextEvent>,
    cancel: CancellationToken,
}

impl ExtractionSignal {
    /// Create a signal bound to `cancel` and the receiver the harvester waits on
    pub fn channel(cancel: CancellationToken) -> (Self, oneshot::Receiver<ContextEvent>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender, cancel }, receiver)
    }

    /// Deliver the event; false when the harvester stopped listening
    pub fn fire(self, event: ContextEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Resolves once the attempt is abandoned (timeout or context teardown)
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// An open, isolated page-rendering environment
#[async_trait]
pub trait BrowsingContext: Send {
    fn id(&self) -> &str;

    /// Discard the context and everything loaded in it
    ///
    /// Best effort: failures are logged, never returned.
    async fn close(&mut self);
}

/// Factory for browsing contexts
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Open a background context and start loading `url` in it
    ///
    /// On error nothing stays open: anything partially created has already
    /// been discarded.
    async fn open(
        &self,
        url: &str,
        signal: ExtractionSignal,
    ) -> Result<Box<dyn BrowsingContext>, HarvestError>;
}
