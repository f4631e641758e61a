//! Error types for the watch pipeline.
//!
//! Only whole-run failures live here. A listing that cannot be read or priced
//! is not an error: it is dropped and counted in [`crate::models::RunStats`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("timed out after {timeout_ms}ms fetching {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("notification failed: {0}")]
    Notify(String),
}

impl WatchError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(url: &str, timeout_ms: u64) -> Self {
        Self::Timeout {
            url: url.to_string(),
            timeout_ms,
        }
    }

    /// Whether another attempt at the same fetch could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
