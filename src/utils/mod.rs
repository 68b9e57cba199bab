// Shared research utilities
pub mod constants;
mod errors;
mod timeout;

pub use errors::{HarvestError, ResearchError};
pub use timeout::validate_harvest_timeout;
