use clap::{Parser, Subcommand};

use proxy_view::api::FetchAction;

#[derive(Parser)]
#[command(name = "proxy-view")]
#[command(about = "Browse and refresh the proxy list served by a proxy backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run in CLI mode (print output and exit, no interactive TUI)
    #[arg(long, global = true)]
    pub cli: bool,

    /// Backend base URL (overrides PROXY_VIEW_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Clone, Copy)]
pub enum Commands {
    /// Fetch the current proxy list
    #[command(alias = "load")]
    List,
    /// Ask the backend to regenerate its proxy list, then show it
    #[command(alias = "update")]
    Refresh,
    /// Check whether the backend is up
    Health,
}

impl Commands {
    /// The list action behind this command, if any
    pub fn fetch_action(&self) -> Option<FetchAction> {
        match self {
            Commands::List => Some(FetchAction::Load),
            Commands::Refresh => Some(FetchAction::Refresh),
            Commands::Health => None,
        }
    }
}
