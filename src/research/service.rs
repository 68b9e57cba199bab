//! Inbound request dispatch
//!
//! Requests arrive as JSON objects tagged by `type`. Every entry point answers
//! with a `ResearchResponse`; failures become `{success: false, error}` and are
//! never raised across this boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::orchestrator::ResearchOrchestrator;
use super::result::{ResearchStatus, SearchRequest, SearchResult};
use crate::utils::ResearchError;
use crate::utils::constants::MAX_PAGE_BUDGET;
use crate::web_search::CandidateUrl;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ResearchRequest {
    /// Discover, harvest and return extracted sources
    SearchAndExtract {
        query: String,
        request_id: String,
        #[serde(default)]
        page_budget: Option<usize>,
    },
    /// Discover only; return candidate URLs with provenance
    SearchOnly {
        query: String,
        request_id: String,
        #[serde(default)]
        page_budget: Option<usize>,
    },
    /// Harvest the given URLs without discovery
    ExtractUrls {
        urls: Vec<String>,
        request_id: String,
    },
    /// Fetch a stored result
    GetResult { request_id: String },
}

impl ResearchRequest {
    pub fn request_id(&self) -> &str {
        match self {
            Self::SearchAndExtract { request_id, .. }
            | Self::SearchOnly { request_id, .. }
            | Self::ExtractUrls { request_id, .. }
            | Self::GetResult { request_id } => request_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Result(SearchResult),
    Candidates(Vec<CandidateUrl>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResponse {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResponsePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResearchResponse {
    pub fn failure(request_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            request_id: request_id.into(),
            result_count: None,
            results: None,
            error: Some(error.to_string()),
        }
    }

    fn from_result(result: SearchResult) -> Self {
        let success = result.status != ResearchStatus::Failed;
        Self {
            success,
            request_id: result.request_id.clone(),
            result_count: Some(result.sources.len()),
            error: result.error.clone(),
            results: Some(ResponsePayload::Result(result)),
        }
    }

    fn from_candidates(request_id: String, candidates: Vec<CandidateUrl>) -> Self {
        Self {
            success: true,
            request_id,
            result_count: Some(candidates.len()),
            results: Some(ResponsePayload::Candidates(candidates)),
            error: None,
        }
    }
}

/// Front door for host applications
#[derive(Clone)]
pub struct ResearchService {
    orchestrator: Arc<ResearchOrchestrator>,
    default_page_budget: usize,
}

impl ResearchService {
    pub fn new(orchestrator: Arc<ResearchOrchestrator>, default_page_budget: usize) -> Self {
        Self {
            orchestrator,
            default_page_budget,
        }
    }

    pub fn orchestrator(&self) -> &Arc<ResearchOrchestrator> {
        &self.orchestrator
    }

    /// Parse and handle one JSON request line
    pub async fn handle_json(&self, line: &str) -> ResearchResponse {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => return ResearchResponse::failure("", ResearchError::from(e)),
        };

        let request_id = value
            .get("requestId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match serde_json::from_value::<ResearchRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => ResearchResponse::failure(request_id, ResearchError::from(e)),
        }
    }

    pub async fn handle(&self, request: ResearchRequest) -> ResearchResponse {
        let request_id = request.request_id().to_string();
        debug!("[{}] Handling {:?}", request_id, request);

        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[{}] Request failed: {}", request_id, e);
                ResearchResponse::failure(request_id, e)
            }
        }
    }

    async fn dispatch(&self, request: ResearchRequest) -> Result<ResearchResponse, ResearchError> {
        match request {
            ResearchRequest::SearchAndExtract {
                query,
                request_id,
                page_budget,
            } => {
                let query = validate_query(&query)?;
                let budget = self.page_budget(page_budget)?;
                let result = self
                    .orchestrator
                    .run(SearchRequest::new(query, request_id, budget))
                    .await;
                Ok(ResearchResponse::from_result(result))
            }
            ResearchRequest::SearchOnly {
                query,
                request_id,
                page_budget,
            } => {
                let query = validate_query(&query)?;
                let budget = self.page_budget(page_budget)?;
                let candidates = self.orchestrator.discover_only(&query, budget).await?;
                Ok(ResearchResponse::from_candidates(request_id, candidates))
            }
            ResearchRequest::ExtractUrls { urls, request_id } => {
                validate_urls(&urls)?;
                let result = self.orchestrator.extract_urls(&urls, &request_id).await;
                Ok(ResearchResponse::from_result(result))
            }
            ResearchRequest::GetResult { request_id } => {
                let result = self
                    .orchestrator
                    .store()
                    .snapshot(&request_id)
                    .await
                    .ok_or_else(|| ResearchError::NotFound(request_id.clone()))?;
                Ok(ResearchResponse::from_result(result))
            }
        }
    }

    fn page_budget(&self, requested: Option<usize>) -> Result<usize, ResearchError> {
        match requested {
            Some(budget) if !(1..=MAX_PAGE_BUDGET).contains(&budget) => {
                Err(ResearchError::InvalidRequest(format!(
                    "pageBudget must be between 1 and {MAX_PAGE_BUDGET}, got {budget}"
                )))
            }
            Some(budget) => Ok(budget),
            None => Ok(self.default_page_budget),
        }
    }
}

fn validate_query(query: &str) -> Result<String, ResearchError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ResearchError::InvalidRequest(
            "query must not be empty".to_string(),
        ));
    }
    Ok(query.to_string())
}

fn validate_urls(urls: &[String]) -> Result<(), ResearchError> {
    if urls.is_empty() {
        return Err(ResearchError::InvalidRequest(
            "urls must not be empty".to_string(),
        ));
    }
    for raw in urls {
        let valid = Url::parse(raw)
            .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some());
        if !valid {
            return Err(ResearchError::InvalidRequest(format!(
                "not an http(s) URL: {raw}"
            )));
        }
    }
    Ok(())
}
