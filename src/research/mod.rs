//! Search orchestration, result records and request dispatch

mod orchestrator;
mod result;
mod service;
mod store;
mod transport;

pub use orchestrator::ResearchOrchestrator;
pub use result::{ResearchStatus, ResultError, SearchRequest, SearchResult};
pub use service::{ResearchRequest, ResearchResponse, ResearchService, ResponsePayload};
pub use store::{ResultStore, SharedResult};
