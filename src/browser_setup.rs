//! Locating, downloading and launching the Chrome that hosts harvest contexts

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::handler::Handler;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use crate::BrowserConfig;
use crate::utils::constants::CHROME_USER_AGENT;

/// Overrides every other lookup when it names an existing file
const EXECUTABLE_ENV_VAR: &str = "CHROMIUM_PATH";

#[cfg(target_os = "windows")]
const INSTALL_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "~/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/opt/google/chrome/chrome",
];

const PATH_COMMANDS: &[&str] = &["chromium", "chromium-browser", "google-chrome", "chrome"];

/// Flags every harvest browser gets
///
/// Harvest pages live in background targets; without the throttling
/// switches Chrome starves their timers and renderers and pages stall.
const HARVEST_FLAGS: &[&str] = &[
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-background-networking",
    "--disable-blink-features=AutomationControlled",
    "--disable-notifications",
    "--disable-popup-blocking",
    "--disable-extensions",
    "--disable-infobars",
    "--disable-print-preview",
    "--disable-breakpad",
    "--disable-hang-monitor",
    "--disable-prompt-on-repost",
    "--disable-features=TranslateUI",
    "--no-first-run",
    "--no-default-browser-check",
    "--password-store=basic",
    "--use-mock-keychain",
    "--hide-scrollbars",
    "--mute-audio",
];

const INSECURE_FLAGS: &[&str] = &[
    "--disable-web-security",
    "--disable-features=IsolateOrigins,site-per-process",
    "--ignore-certificate-errors",
];

const NO_SANDBOX_FLAGS: &[&str] = &["--no-sandbox", "--disable-setuid-sandbox"];

/// Profile directory removed on drop unless the launch succeeded
struct ProfileDirGuard {
    path: PathBuf,
    keep: bool,
}

impl ProfileDirGuard {
    fn create(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path).with_context(|| {
            format!("Failed to create browser profile directory {}", path.display())
        })?;
        Ok(Self { path, keep: false })
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for ProfileDirGuard {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => info!("Removed profile after failed launch: {}", self.path.display()),
            Err(e) => warn!("Failed to remove profile {}: {}", self.path.display(), e),
        }
    }
}

fn expand_home(location: &str) -> Option<PathBuf> {
    match location.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(location)),
    }
}

fn which(command: &str) -> Option<PathBuf> {
    let output = Command::new("which").arg(command).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!found.is_empty()).then(|| PathBuf::from(found))
}

/// Find an installed Chrome or Chromium
///
/// Order: `$CHROMIUM_PATH`, well-known install locations, then `which` on
/// Unix-like systems.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(configured) = std::env::var(EXECUTABLE_ENV_VAR) {
        let path = PathBuf::from(&configured);
        if path.exists() {
            info!("Using browser from {}: {}", EXECUTABLE_ENV_VAR, path.display());
            return Ok(path);
        }
        warn!("{} points to a missing file: {}", EXECUTABLE_ENV_VAR, configured);
    }

    if let Some(path) = INSTALL_LOCATIONS
        .iter()
        .filter_map(|location| expand_home(location))
        .find(|path| path.exists())
    {
        info!("Found browser at {}", path.display());
        return Ok(path);
    }

    if !cfg!(target_os = "windows")
        && let Some(path) = PATH_COMMANDS.iter().find_map(|command| which(command))
    {
        info!("Found browser on PATH: {}", path.display());
        return Ok(path);
    }

    Err(anyhow::anyhow!("No Chrome/Chromium executable found"))
}

/// Download a Chromium build into the user cache and return its executable
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| std::env::temp_dir().join(".cache"))
        .join("research_harvest")
        .join("chromium");
    std::fs::create_dir_all(&cache_dir).context("Failed to create browser cache directory")?;

    info!("Downloading Chromium into {}", cache_dir.display());
    let options = BrowserFetcherOptions::builder()
        .with_path(&cache_dir)
        .build()
        .context("Failed to build fetcher options")?;
    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Failed to download Chromium")?;

    info!("Chromium ready at {}", revision.executable_path.display());
    Ok(revision.executable_path)
}

/// Containers cannot use the setuid sandbox
fn in_container() -> bool {
    Path::new("/.dockerenv").exists()
        || std::env::var("container").is_ok()
        || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
}

/// Command-line switches for a harvest browser with this config
fn launch_flags(config: &BrowserConfig, containerized: bool) -> Vec<String> {
    let mut flags = vec![format!("--user-agent={CHROME_USER_AGENT}")];
    flags.extend(HARVEST_FLAGS.iter().map(|f| f.to_string()));

    if config.disable_security {
        warn!("Browser security features disabled by config");
        flags.extend(INSECURE_FLAGS.iter().map(|f| f.to_string()));
    }
    if containerized || config.disable_security {
        flags.extend(NO_SANDBOX_FLAGS.iter().map(|f| f.to_string()));
    }
    flags
}

/// Chrome emits CDP events chromiumoxide cannot deserialize; those are noise
fn is_benign_handler_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                if is_benign_handler_error(&message) {
                    trace!("Ignored CDP decode error: {}", message);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        info!("Browser handler task completed");
    })
}

/// Launch Chrome for harvesting with its profile in `profile_dir`
///
/// Falls back to a downloaded Chromium when none is installed. The profile
/// directory is removed again if the launch fails.
pub async fn launch_browser(
    config: &BrowserConfig,
    profile_dir: PathBuf,
) -> Result<(Browser, JoinHandle<()>)> {
    let executable = match find_browser_executable() {
        Ok(path) => path,
        Err(e) => {
            warn!("{}; downloading a managed Chromium", e);
            download_managed_browser().await?
        }
    };

    let profile = ProfileDirGuard::create(profile_dir)?;

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(config.window.width, config.window.height)
        .user_data_dir(&profile.path)
        .chrome_executable(executable)
        .args(launch_flags(config, in_container()));

    builder = if config.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    let (browser, handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;
    let handler_task = spawn_handler(handler);

    profile.keep();
    Ok((browser, handler_task))
}
