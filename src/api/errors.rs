//! Error types for requests against the proxy backend

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend error (status {status_code}): {message}")]
    Status {
        status_code: u16,
        message: String,
    },

    #[error("Failed to parse response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Short label for the status bar
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "network",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
            FetchError::InvalidUrl(_) => "config",
        }
    }
}
