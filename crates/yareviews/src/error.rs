//! Library boundary errors.
//!
//! Only browser startup, tab creation and navigation can fail a call. Missing
//! page content never shows up here; it resolves to `None` or zero fields.

/// All errors surfaced by the public API.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Browser not available: {0}")]
    BrowserUnavailable(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HarvestResult<T> = Result<T, HarvestError>;
