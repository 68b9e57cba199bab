//! Browser infrastructure for launching Chrome and opening isolated contexts

mod wrapper;

pub use crate::browser_setup::{download_managed_browser, find_browser_executable};
pub use wrapper::{BrowserWrapper, launch_browser};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create browser context: {0}")]
    ContextCreationFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Failed to dispose browser context: {0}")]
    ContextDisposalFailed(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;
