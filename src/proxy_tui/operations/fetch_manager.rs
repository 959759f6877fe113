//! Fetch manager for running list requests off the UI loop

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    api::{FetchAction, FetchError, ProxySource},
    models::{HealthStatus, ProxyMap},
    proxy_tui::{
        events::AppEvent,
        proxy_list::{ProxyListView, RequestTicket},
    },
};

/// Raw result of a spawned request, before it is applied to the view
enum Completion {
    Fetch {
        ticket: RequestTicket,
        result: Result<ProxyMap, FetchError>,
    },
    Health(Result<HealthStatus, FetchError>),
}

/// Spawns requests on the tokio runtime and collects their results.
///
/// Requests are never cancelled. Overlapping requests all run to completion
/// and the view decides which result still counts.
pub struct FetchManager {
    source: Arc<dyn ProxySource>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl FetchManager {
    pub fn new(source: Arc<dyn ProxySource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Number of spawned requests whose result has not been collected yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Issue a ticket on the view and run the request in the background
    pub fn start(&mut self, view: &mut ProxyListView, action: FetchAction) -> RequestTicket {
        let ticket = view.begin(action);
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = source.fetch(action).await;
            if tx.send(Completion::Fetch { ticket, result }).is_err() {
                debug!("Fetch manager dropped before token {} finished", ticket.token);
            }
        });

        ticket
    }

    /// Probe the backend health endpoint in the background
    pub fn check_health(&mut self) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = source.health().await;
            let _ = tx.send(Completion::Health(result));
        });
    }

    /// Apply every result that is already available, without waiting
    pub fn poll(&mut self, view: &mut ProxyListView) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            events.push(self.complete(view, completion));
        }
        events
    }

    /// Wait for the next result and apply it
    pub async fn next(&mut self, view: &mut ProxyListView) -> Option<AppEvent> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        Some(self.complete(view, completion))
    }

    fn complete(&mut self, view: &mut ProxyListView, completion: Completion) -> AppEvent {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Fetch { ticket, result } => {
                let settlement = view.settle(ticket, result);
                AppEvent::FetchSettled { ticket, settlement }
            }
            Completion::Health(result) => {
                if let Err(e) = &result {
                    warn!("Backend health check failed: {}", e);
                }
                AppEvent::HealthChecked(result)
            }
        }
    }
}
