//! Request and result records for one orchestration run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::harvest::HarvestedPage;

/// One research query as issued by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub request_id: String,
    pub page_budget: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, request_id: impl Into<String>, page_budget: usize) -> Self {
        Self {
            query: query.into(),
            request_id: request_id.into(),
            page_budget,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    /// Harvests still in flight
    Processing,
    /// Every harvest settled
    Completed,
    /// The run could not execute at all
    Failed,
}

/// Rejected mutations of a `SearchResult`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    #[error("Result {0} is already finalized")]
    Finalized(String),

    #[error("Source {0} is already present")]
    DuplicateSource(String),

    #[error("Page budget of {0} already reached")]
    BudgetExceeded(usize),
}

/// Live record of a run; append-only until finalized
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub request_id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub status: ResearchStatus,
    pub sources: Vec<HarvestedPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub page_budget: usize,
}

impl SearchResult {
    /// Start a run in `processing`, stamped now
    pub fn start(request: &SearchRequest) -> Self {
        Self {
            request_id: request.request_id.clone(),
            query: request.query.clone(),
            timestamp: Utc::now(),
            status: ResearchStatus::Processing,
            sources: Vec::new(),
            completed_at: None,
            error: None,
            page_budget: request.page_budget,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.status != ResearchStatus::Processing
    }

    fn ensure_open(&self) -> Result<(), ResultError> {
        if self.is_finalized() {
            return Err(ResultError::Finalized(self.request_id.clone()));
        }
        Ok(())
    }

    /// Append a harvested page
    pub fn push_source(&mut self, page: HarvestedPage) -> Result<(), ResultError> {
        self.ensure_open()?;
        if self.sources.iter().any(|s| s.url == page.url) {
            return Err(ResultError::DuplicateSource(page.url));
        }
        if self.sources.len() >= self.page_budget {
            return Err(ResultError::BudgetExceeded(self.page_budget));
        }
        self.sources.push(page);
        Ok(())
    }

    /// Reorder sources to follow `order`; URLs not in `order` go last
    pub fn order_sources_by(&mut self, order: &[String]) -> Result<(), ResultError> {
        self.ensure_open()?;
        self.sources.sort_by_key(|source| {
            order
                .iter()
                .position(|url| *url == source.url)
                .unwrap_or(usize::MAX)
        });
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), ResultError> {
        self.ensure_open()?;
        self.status = ResearchStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ResultError> {
        self.ensure_open()?;
        self.status = ResearchStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Wall-clock age since the run started
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}
