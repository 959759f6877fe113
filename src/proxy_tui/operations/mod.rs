//! Async operation managers for the proxy TUI

pub mod fetch_manager;

pub use fetch_manager::FetchManager;
