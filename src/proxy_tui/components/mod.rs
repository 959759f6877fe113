//! Reusable UI components for the proxy TUI

pub mod proxy_table;
pub mod status_display;

pub use proxy_table::{ProxyTable, ProxyTableConfig};
pub use status_display::StatusDisplay;
