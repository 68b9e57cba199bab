//! Shared configuration constants for the research pipeline
//!
//! Default values used by `Config` and the components it parameterizes, kept
//! in one place so the YAML defaults and the code agree.

/// Chrome user agent string presented by both the browser and the search clients
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Pages harvested per query unless the caller asks for a different budget
pub const DEFAULT_PAGE_BUDGET: usize = 3;

/// Largest page budget a request may ask for
pub const MAX_PAGE_BUDGET: usize = 20;

/// Per-page wait for the extraction signal
pub const DEFAULT_HARVEST_TIMEOUT_SECS: u64 = 30;

/// Harvests allowed in flight at once within one run
pub const DEFAULT_MAX_CONCURRENT_HARVESTS: usize = 3;

/// Minimum extracted characters for a content-container selector to win
pub const MIN_CONTENT_CHARS: usize = 500;

/// Stored results older than this are purged (1 hour)
pub const RESULT_TTL_SECS: u64 = 3600;

/// Interval between expiry sweeps of the result store (5 minutes)
pub const SWEEP_INTERVAL_SECS: u64 = 300;

/// Matches requested from each search backend
pub const RESULTS_PER_BACKEND: usize = 3;

/// HTTP timeout for search backend requests
pub const SEARCH_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const WIKIPEDIA_ENDPOINT_TEMPLATE: &str = "https://{lang}.wikipedia.org/w/api.php";

pub const DUCKDUCKGO_LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";
