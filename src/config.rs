//! Centralized configuration management for proxy-view

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_USER_AGENT: &str = "proxy-view/0.1.0";
const DEFAULT_LOG_FILE: &str = "proxy_view.log";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the proxy backend
    pub base_url: String,
    /// File that receives the diagnostic log
    pub log_file: PathBuf,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds, `None` leaves the transport default
    pub timeout_seconds: Option<u64>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            log_file: DEFAULT_LOG_FILE.into(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("PROXY_VIEW_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let log_file = std::env::var("PROXY_VIEW_LOG_FILE")
            .unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string())
            .into();

        let http = HttpConfig {
            timeout_seconds: parse_env_var("PROXY_VIEW_HTTP_TIMEOUT_SECONDS")?,
            user_agent: std::env::var("PROXY_VIEW_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
        };

        Ok(Config {
            base_url,
            log_file,
            http,
        })
    }

    /// Replace the base URL, e.g. from a command line flag
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        self
    }

    /// Base URL without trailing slashes
    pub fn base_url_str(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http.timeout_seconds.map(Duration::from_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(self.base_url_str())
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "Base URL must start with http:// or https://: {}",
                self.base_url
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(anyhow::anyhow!("Base URL has no host: {}", self.base_url));
        }

        if self.http.timeout_seconds == Some(0) {
            return Err(anyhow::anyhow!("HTTP timeout must be greater than zero"));
        }

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}
