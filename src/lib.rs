//! Web research harvester
//!
//! Turns a text query into a handful of cleaned page texts: the query fans out
//! to two search backends, the merged URL list is loaded page by page in
//! isolated headless-Chrome contexts (via chromiumoxide), and readable text is
//! extracted from each rendered DOM.

mod browser;
pub mod browser_setup;
pub mod harvest;
mod manager;
pub mod page_extractor;
pub mod research;
mod utils;
pub mod web_search;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::constants::{
    DEFAULT_HARVEST_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_HARVESTS, DEFAULT_PAGE_BUDGET,
    DUCKDUCKGO_LITE_ENDPOINT, MIN_CONTENT_CHARS, RESULT_TTL_SECS, RESULTS_PER_BACKEND,
    SEARCH_REQUEST_TIMEOUT_SECS, SWEEP_INTERVAL_SECS, WIKIPEDIA_ENDPOINT_TEMPLATE,
};

/// Environment variable naming an alternative config file
pub const CONFIG_ENV_VAR: &str = "RESEARCH_HARVEST_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Orchestration limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Pages harvested per query when the request does not say otherwise
    #[serde(default = "default_page_budget")]
    pub page_budget: usize,

    /// Seconds to wait for a page's extraction signal
    #[serde(default = "default_harvest_timeout_secs")]
    pub harvest_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_harvests")]
    pub max_concurrent_harvests: usize,

    /// Characters a content-container selector must yield to be accepted
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Stored results older than this are purged
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Search backend endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Wikipedia language edition used by the open-search backend
    #[serde(default = "default_language")]
    pub language: String,

    /// Open-search API endpoint; `{lang}` is replaced with `language`
    #[serde(default = "default_wikipedia_endpoint")]
    pub wikipedia_endpoint: String,

    /// Lite (no-JS) HTML result page
    #[serde(default = "default_duckduckgo_endpoint")]
    pub duckduckgo_endpoint: String,

    #[serde(default = "default_results_per_backend")]
    pub results_per_backend: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// How the shared harvest browser is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Turns off same-origin checks, certificate errors and the sandbox.
    /// Harvested pages are untrusted, so leave this off outside debugging.
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Viewport every harvest context renders at
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_page_budget() -> usize {
    DEFAULT_PAGE_BUDGET
}
fn default_harvest_timeout_secs() -> u64 {
    DEFAULT_HARVEST_TIMEOUT_SECS
}
fn default_max_concurrent_harvests() -> usize {
    DEFAULT_MAX_CONCURRENT_HARVESTS
}
fn default_min_content_chars() -> usize {
    MIN_CONTENT_CHARS
}
fn default_result_ttl_secs() -> u64 {
    RESULT_TTL_SECS
}
fn default_sweep_interval_secs() -> u64 {
    SWEEP_INTERVAL_SECS
}

fn default_language() -> String {
    "en".to_string()
}
fn default_wikipedia_endpoint() -> String {
    WIKIPEDIA_ENDPOINT_TEMPLATE.to_string()
}
fn default_duckduckgo_endpoint() -> String {
    DUCKDUCKGO_LITE_ENDPOINT.to_string()
}
fn default_results_per_backend() -> usize {
    RESULTS_PER_BACKEND
}
fn default_request_timeout_secs() -> u64 {
    SEARCH_REQUEST_TIMEOUT_SECS
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            page_budget: default_page_budget(),
            harvest_timeout_secs: default_harvest_timeout_secs(),
            max_concurrent_harvests: default_max_concurrent_harvests(),
            min_content_chars: default_min_content_chars(),
            result_ttl_secs: default_result_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            wikipedia_endpoint: default_wikipedia_endpoint(),
            duckduckgo_endpoint: default_duckduckgo_endpoint(),
            results_per_backend: default_results_per_backend(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SearchConfig {
    /// Open-search endpoint with the language edition substituted
    pub fn wikipedia_url(&self) -> String {
        self.wikipedia_endpoint.replace("{lang}", &self.language)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: default_disable_security(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// Load config from a YAML file, falling back to defaults when it is absent
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

/// Load config from `$RESEARCH_HARVEST_CONFIG`, else config.yaml in package root
pub fn load_yaml_config() -> anyhow::Result<Config> {
    let config_path = std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml"));

    load_config_from(&config_path)
}

pub use browser::{
    BrowserError, BrowserResult, BrowserWrapper, download_managed_browser,
    find_browser_executable, launch_browser,
};
pub use harvest::{
    BrowsingContext, ChromeContextProvider, ContextEvent, ContextProvider, ExtractionSignal,
    HarvestFailure, HarvestOutcome, HarvestedPage, PageHarvester,
};
pub use manager::BrowserManager;
pub use page_extractor::{PageExtraction, PageSnapshot, clean_text, extract_page, word_count};
pub use research::{
    ResearchOrchestrator, ResearchRequest, ResearchResponse, ResearchService, ResearchStatus,
    ResponsePayload, ResultError, ResultStore, SearchRequest, SearchResult, SharedResult,
};
pub use utils::{HarvestError, ResearchError, validate_harvest_timeout};
pub use web_search::{
    CandidateUrl, Discovery, DuckDuckGoBackend, SearchBackend, SearchError, SearchSource,
    WikipediaBackend, default_backends, discover, merge, merge_candidates,
};
