//! Proxy list Terminal User Interface (TUI)
//!
//! Shows the backend's proxy list as a table, with keys to reload it or ask
//! the backend to regenerate it. Requests run in the background while the
//! table is swapped for a loading indicator.

pub mod app;
pub mod components;
pub mod events;
pub mod operations;
pub mod proxy_list;
pub mod ui;

pub use app::App;
pub use events::AppEvent;
pub use proxy_list::{ProxyListView, RenderModel, RequestTicket, Settlement, TableRow};
