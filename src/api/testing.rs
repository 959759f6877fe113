//! In-memory `ProxySource` used by unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{FetchAction, FetchError, ProxySource};
use crate::models::{HealthStatus, ProxyMap};

#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
}

impl Reply {
    fn produce(&self, endpoint: &str) -> Result<ProxyMap, FetchError> {
        match self {
            Reply::Body(body) => serde_json::from_str(body).map_err(|source| FetchError::Decode {
                endpoint: endpoint.to_string(),
                source,
            }),
            Reply::Status(code) => Err(FetchError::Status {
                status_code: *code,
                message: "fake failure".to_string(),
            }),
        }
    }
}

pub struct FakeSource {
    load: Mutex<Reply>,
    refresh: Mutex<Reply>,
    load_delay: Mutex<Option<Duration>>,
    refresh_delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(load: Reply, refresh: Reply) -> Self {
        Self {
            load: Mutex::new(load),
            refresh: Mutex::new(refresh),
            load_delay: Mutex::new(None),
            refresh_delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_body(body: &str) -> Self {
        Self::new(Reply::Body(body.to_string()), Reply::Body(body.to_string()))
    }

    pub fn set_load(&self, reply: Reply) {
        *self.load.lock().unwrap() = reply;
    }

    pub fn set_delay(&self, action: FetchAction, delay: Duration) {
        let slot = match action {
            FetchAction::Load => &self.load_delay,
            FetchAction::Refresh => &self.refresh_delay,
        };
        *slot.lock().unwrap() = Some(delay);
    }

    async fn wait(&self, action: FetchAction) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = match action {
            FetchAction::Load => *self.load_delay.lock().unwrap(),
            FetchAction::Refresh => *self.refresh_delay.lock().unwrap(),
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ProxySource for FakeSource {
    async fn fetch_proxies(&self) -> Result<ProxyMap, FetchError> {
        let reply = self.load.lock().unwrap().clone();
        self.wait(FetchAction::Load).await;
        reply.produce("/proxies")
    }

    async fn update_proxies(&self) -> Result<ProxyMap, FetchError> {
        let reply = self.refresh.lock().unwrap().clone();
        self.wait(FetchAction::Refresh).await;
        reply.produce("/update-proxies")
    }

    async fn health(&self) -> Result<HealthStatus, FetchError> {
        Ok(HealthStatus {
            status: "ok".to_string(),
            service: "fake".to_string(),
        })
    }
}
