//! Events produced by background operations for the proxy TUI

use crate::api::FetchError;
use crate::models::HealthStatus;

use super::proxy_list::{RequestTicket, Settlement};

/// Results that come back to the UI loop from spawned tasks
#[derive(Debug)]
pub enum AppEvent {
    /// A list request finished and was handed to the view
    FetchSettled {
        ticket: RequestTicket,
        settlement: Settlement,
    },
    /// Startup health probe finished
    HealthChecked(Result<HealthStatus, FetchError>),
}
