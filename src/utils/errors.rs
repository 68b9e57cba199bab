use thiserror::Error;

use crate::browser::BrowserError;

/// Why a single harvest attempt produced no source
///
/// Every variant is contained per URL: the orchestrator logs it and the run
/// simply ends up with fewer sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarvestError {
    #[error("No extraction signal within {0}ms")]
    Timeout(u64),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
}

impl From<BrowserError> for HarvestError {
    fn from(err: BrowserError) -> Self {
        HarvestError::NavigationFailed(err.to_string())
    }
}

/// Errors that stop an orchestration run or a request from producing a result
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No search backend reachable for query: {0}")]
    BackendsUnreachable(String),

    #[error("Result not found: {0}")]
    NotFound(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

/// Implement From<serde_json::Error> for ResearchError
impl From<serde_json::Error> for ResearchError {
    fn from(err: serde_json::Error) -> Self {
        ResearchError::InvalidRequest(err.to_string())
    }
}
