use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tracing::{error, info};

mod cli;

use cli::{Cli, Commands};
use proxy_view::{
    api::{ProxyApi, ProxySource},
    config::Config,
    proxy_tui::{
        components::proxy_table::plain_table, App, ProxyListView, Settlement,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "proxy_view=info");
    }

    let config = Config::from_env()?.with_base_url(cli.base_url.clone());
    config.validate()?;

    init_logging(&config, cli.cli)?;
    info!("Starting proxy-view against {}", config.base_url_str());

    let api = ProxyApi::new(&config).context("Failed to build HTTP client")?;

    if cli.cli {
        let Some(command) = cli.command else {
            eprintln!("Error: CLI mode requires a command (list, refresh or health)");
            std::process::exit(1);
        };
        return handle_cli_command(command, &api).await;
    }

    // Setup terminal for TUI mode
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, Arc::new(api));
    if let Some(action) = cli.command.and_then(|c| c.fetch_action()) {
        app.start(action);
    }

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    match result {
        Ok(_) => {
            info!("proxy-view exited successfully");
        }
        Err(e) => {
            error!("proxy-view encountered an error: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Log to the configured file, and to stderr as well outside the TUI
fn init_logging(config: &Config, to_stderr: bool) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let directory = config
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let file_name = config
        .log_file
        .file_name()
        .context("Log file path has no file name")?;
    let file_appender = tracing_appender::rolling::never(directory, file_name);

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env())
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    Ok(())
}

/// Handle CLI mode commands - print output and exit
async fn handle_cli_command(command: Commands, api: &ProxyApi) -> Result<()> {
    let Some(action) = command.fetch_action() else {
        return match api.health().await {
            Ok(health) => {
                println!("Backend {}: {} ({})", api.base_url(), health.status, health.service);
                if !health.is_ok() {
                    std::process::exit(1);
                }
                Ok(())
            }
            Err(e) => {
                eprintln!("Health check failed for {}: {}", api.base_url(), e);
                std::process::exit(1);
            }
        };
    };

    let mut view = ProxyListView::new();
    match view.run(api, action).await {
        Settlement::Applied(count) => {
            if count == 0 {
                println!("No proxies returned by {}", api.base_url());
            } else {
                print!("{}", plain_table(&view.rows(), 60));
                println!();
                println!("Total: {} proxies", count);
            }
            Ok(())
        }
        Settlement::Failed(e) => {
            eprintln!("{} failed: {}", action.as_str(), e);
            std::process::exit(1);
        }
        Settlement::Stale => Ok(()),
    }
}
