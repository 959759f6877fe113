//! Proxy backend API
//!
//! Talks to the HTTP service that owns the proxy list. The service exposes a
//! read endpoint, a regenerate endpoint that answers with the new list, and a
//! health check.

pub mod client;
pub mod errors;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::models::{HealthStatus, ProxyMap};

pub use client::ProxyApi;
pub use errors::FetchError;

/// Endpoint paths relative to the configured base URL
pub struct Endpoints;

impl Endpoints {
    pub const PROXIES: &'static str = "/proxies";
    pub const UPDATE_PROXIES: &'static str = "/update-proxies";
    pub const HEALTH: &'static str = "/health";
}

/// User-triggerable actions against the list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAction {
    /// `GET /proxies`
    Load,
    /// `POST /update-proxies`, regenerate then return the new list
    Refresh,
}

impl FetchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchAction::Load => "Load",
            FetchAction::Refresh => "Refresh",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            FetchAction::Load => Endpoints::PROXIES,
            FetchAction::Refresh => Endpoints::UPDATE_PROXIES,
        }
    }
}

/// Source of proxy lists
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// Read the current list
    async fn fetch_proxies(&self) -> Result<ProxyMap, FetchError>;

    /// Ask the backend to regenerate its list and return it
    async fn update_proxies(&self) -> Result<ProxyMap, FetchError>;

    /// Query backend liveness
    async fn health(&self) -> Result<HealthStatus, FetchError>;

    /// Dispatch a list action to the matching endpoint
    async fn fetch(&self, action: FetchAction) -> Result<ProxyMap, FetchError> {
        match action {
            FetchAction::Load => self.fetch_proxies().await,
            FetchAction::Refresh => self.update_proxies().await,
        }
    }
}
