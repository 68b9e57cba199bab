//! Timeout validation for harvest attempts

use std::time::Duration;

use super::errors::ResearchError;

/// Maximum per-page harvest timeout (5 minutes)
/// Covers slow-loading sites, heavy SPAs, and network delays
pub const MAX_HARVEST_TIMEOUT_SECS: u64 = 300;

/// Validate the per-page harvest timeout
///
/// # Arguments
/// * `timeout_secs` - Optional timeout in seconds
/// * `default_secs` - Default timeout if None provided
///
/// # Returns
/// * `Ok(Duration)` - Validated Duration object
/// * `Err(ResearchError)` - If timeout is zero or exceeds MAX_HARVEST_TIMEOUT_SECS
///
/// # Example
/// ```rust
/// use research_harvest::validate_harvest_timeout;
///
/// let timeout = validate_harvest_timeout(Some(25), 30).unwrap();
/// assert_eq!(timeout.as_secs(), 25);
/// ```
pub fn validate_harvest_timeout(
    timeout_secs: Option<u64>,
    default_secs: u64,
) -> Result<Duration, ResearchError> {
    let secs = timeout_secs.unwrap_or(default_secs);

    if secs == 0 {
        return Err(ResearchError::InvalidRequest(
            "Harvest timeout must be at least 1 second".to_string(),
        ));
    }

    if secs > MAX_HARVEST_TIMEOUT_SECS {
        return Err(ResearchError::InvalidRequest(format!(
            "Harvest timeout cannot exceed {}s ({} minutes). Received: {}s ({:.1} minutes)",
            MAX_HARVEST_TIMEOUT_SECS,
            MAX_HARVEST_TIMEOUT_SECS / 60,
            secs,
            secs as f64 / 60.0
        )));
    }

    Ok(Duration::from_secs(secs))
}
