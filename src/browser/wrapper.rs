//! Browser lifecycle management for page harvesting
//!
//! Wraps a chromiumoxide `Browser` together with its event handler task and
//! profile directory, and exposes the CDP calls the harvester needs to open
//! and discard isolated browsing contexts.

use anyhow::Result;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserError, BrowserResult};
use crate::BrowserConfig;

/// A running Chrome with its CDP handler task and profile directory
///
/// Dropping it aborts the handler; the process itself only exits through
/// `BrowserManager::shutdown`.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Create a fresh browser context (separate cookies, storage and cache)
    pub(crate) async fn create_isolated_context(&self) -> BrowserResult<BrowserContextId> {
        let response = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::ContextCreationFailed(e.to_string()))?;

        let context_id = response.result.browser_context_id.clone();
        debug!("Created browser context {}", context_id.inner());
        Ok(context_id)
    }

    /// Open a blank background target inside `context_id`
    ///
    /// The target is created with `background: true` so it never takes focus;
    /// navigation to the real URL happens afterwards on the returned page.
    pub(crate) async fn open_background_page(
        &self,
        context_id: &BrowserContextId,
    ) -> BrowserResult<Page> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .background(true)
            .build()
            .map_err(BrowserError::PageCreationFailed)?;

        self.browser
            .new_page(params)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))
    }

    /// Dispose a browser context and every target still open inside it
    pub(crate) async fn dispose_context(&self, context_id: BrowserContextId) -> BrowserResult<()> {
        let id = context_id.inner().clone();
        self.browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
            .map_err(|e| BrowserError::ContextDisposalFailed(e.to_string()))?;
        debug!("Disposed browser context {}", id);
        Ok(())
    }

    /// Remove the profile directory
    ///
    /// Only after `Browser::wait` returned: Chrome keeps files open until it
    /// exits and Windows refuses to delete them.
    pub fn cleanup_temp_dir(&mut self) {
        let Some(path) = self.user_data_dir.take() else {
            return;
        };
        match std::fs::remove_dir_all(&path) {
            Ok(()) => debug!("Removed browser profile {}", path.display()),
            Err(e) => warn!("Failed to remove browser profile {}: {}", path.display(), e),
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        if let Some(path) = self.user_data_dir.as_ref() {
            warn!(
                "Browser dropped without shutdown; profile left at {}",
                path.display()
            );
        }
    }
}

/// Launch Chrome with a per-process profile directory
///
/// The caller owns the returned profile path and the handler task; wrap them
/// in a `BrowserWrapper` so both are released.
pub async fn launch_browser(config: &BrowserConfig) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    let profile_dir = std::env::temp_dir().join(format!("research_harvest_{}", std::process::id()));
    info!("Launching browser with profile {}", profile_dir.display());

    let (browser, handler) =
        crate::browser_setup::launch_browser(config, profile_dir.clone()).await?;

    Ok((browser, handler, profile_dir))
}
