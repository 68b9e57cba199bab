//! The one Chrome process all harvests share
//!
//! Harvests never share a browsing context, only the browser hosting them.
//! The browser starts on first use, is probed before every use and replaced
//! if it stopped answering, and is torn down by `shutdown`.
//!
//! The slot is a `tokio::sync::Mutex`: it is held across CDP calls.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::BrowserConfig;
use crate::browser::{BrowserWrapper, launch_browser};

pub(crate) type BrowserSlot = Arc<Mutex<Option<BrowserWrapper>>>;

pub struct BrowserManager {
    slot: BrowserSlot,
    config: BrowserConfig,
}

/// Close the browser, wait for the process to exit, then remove its profile
///
/// `close` alone leaves a zombie process; the profile can only be removed
/// once Chrome has released it.
async fn retire(mut wrapper: BrowserWrapper) {
    if let Err(e) = wrapper.browser_mut().close().await {
        warn!("Browser close failed: {}", e);
    }
    if let Err(e) = wrapper.browser_mut().wait().await {
        warn!("Waiting for browser exit failed: {}", e);
    }
    wrapper.cleanup_temp_dir();
}

impl BrowserManager {
    /// Nothing launches until the first `get_or_launch`
    #[must_use]
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            config,
        }
    }

    /// The shared browser slot, holding a browser that just answered a probe
    ///
    /// Launches Chrome if none is running and replaces one that no longer
    /// answers `Browser.getVersion`.
    pub(crate) async fn get_or_launch(&self) -> Result<BrowserSlot> {
        let mut slot = self.slot.lock().await;

        if let Some(wrapper) = slot.as_ref() {
            match wrapper.browser().version().await {
                Ok(_) => {
                    debug!("Reusing running browser");
                    return Ok(self.slot.clone());
                }
                Err(e) => {
                    warn!("Browser stopped answering ({}); relaunching", e);
                    if let Some(crashed) = slot.take() {
                        retire(crashed).await;
                    }
                }
            }
        }

        info!("Launching harvest browser");
        let (browser, handler, profile_dir) = launch_browser(&self.config).await?;
        *slot = Some(BrowserWrapper::new(browser, handler, profile_dir));

        Ok(self.slot.clone())
    }

    /// Stop the browser if one is running; repeated calls are no-ops
    pub async fn shutdown(&self) -> Result<()> {
        let running = self.slot.lock().await.take();
        if let Some(wrapper) = running {
            info!("Shutting down harvest browser");
            retire(wrapper).await;
        }
        Ok(())
    }
}

impl Drop for BrowserManager {
    fn drop(&mut self) {
        // Only the handler task is aborted from here; call shutdown() first.
        debug!("BrowserManager dropped");
    }
}
