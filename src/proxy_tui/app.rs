//! Main TUI application state and logic

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    components::{ProxyTable, ProxyTableConfig, StatusDisplay},
    events::AppEvent,
    operations::FetchManager,
    proxy_list::{ProxyListView, Settlement},
    ui::{centered_rect, Styles},
};
use crate::api::{FetchAction, ProxySource};
use crate::config::Config;

const IDLE_HINT: &str = "l/Enter: Load | r: Refresh | ↑/↓: Select | ?: Help | q: Quit";
const TICK: Duration = Duration::from_millis(100);

/// Main TUI application state
pub struct App {
    /// Application configuration
    pub config: Config,
    pub view: ProxyListView,
    pub table: ProxyTable,
    pub status: StatusDisplay,
    pub fetcher: FetchManager,

    /// Result of the last health probe
    pub backend_status: Option<String>,
    pub should_quit: bool,
    pub show_help_popup: bool,
}

impl App {
    /// Create a new TUI application
    pub fn new(config: Config, source: Arc<dyn ProxySource>) -> Self {
        Self {
            config,
            view: ProxyListView::new(),
            table: ProxyTable::new(ProxyTableConfig::new("Proxies")),
            status: StatusDisplay::new().with_idle_text(IDLE_HINT),
            fetcher: FetchManager::new(source),
            backend_status: None,
            should_quit: false,
            show_help_popup: false,
        }
    }

    /// Run the main application loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.fetcher.check_health();

        loop {
            for event in self.fetcher.poll(&mut self.view) {
                self.handle_app_event(event);
            }

            terminal.draw(|f| self.draw(f))?;

            // Poll with a timeout so finished requests show up without a key press
            if crossterm::event::poll(TICK)? {
                if let Event::Key(key) = crossterm::event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        if self.fetcher.in_flight() > 0 {
            info!("Exiting with {} request(s) still in flight", self.fetcher.in_flight());
        }
        Ok(())
    }

    /// Kick off a list action in the background
    pub fn start(&mut self, action: FetchAction) {
        let ticket = self.fetcher.start(&mut self.view, action);
        info!("{} requested (token {})", action.as_str(), ticket.token);
        self.status.set_loading(match action {
            FetchAction::Load => "Loading proxies...".to_string(),
            FetchAction::Refresh => "Asking backend to regenerate proxies...".to_string(),
        });
    }

    /// Handle keyboard input events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::F(1) | KeyCode::Char('?') => {
                self.show_help_popup = !self.show_help_popup;
                return;
            }
            KeyCode::Esc => {
                self.show_help_popup = false;
                return;
            }
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }

        if self.show_help_popup {
            return;
        }

        match key.code {
            KeyCode::Char('l') | KeyCode::Enter => self.start(FetchAction::Load),
            KeyCode::Char('r') => self.start(FetchAction::Refresh),
            KeyCode::Up | KeyCode::Char('k') => self.table.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.table.navigate_down(),
            KeyCode::PageUp => self.table.page_up(),
            KeyCode::PageDown => self.table.page_down(),
            KeyCode::Home => self.table.navigate_to_first(),
            KeyCode::End => self.table.navigate_to_last(),
            _ => {}
        }
    }

    /// Fold a background result into the UI state
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::FetchSettled { ticket, settlement } => match settlement {
                Settlement::Applied(count) => {
                    self.table.sync(&self.view.rows());
                    self.status.set_success(format!(
                        "{} complete: {} prox{}",
                        ticket.action.as_str(),
                        count,
                        if count == 1 { "y" } else { "ies" }
                    ));
                }
                Settlement::Failed(e) => {
                    self.status.set_error(format!(
                        "{} failed [{}]: {} (press l or r to retry)",
                        ticket.action.as_str(),
                        e.kind(),
                        e
                    ));
                }
                Settlement::Stale => {
                    debug!("Ignoring superseded {} (token {})", ticket.action.as_str(), ticket.token);
                }
            },
            AppEvent::HealthChecked(Ok(health)) => {
                let label = if health.service.is_empty() {
                    health.status.clone()
                } else {
                    format!("{} ({})", health.status, health.service)
                };
                if !health.is_ok() {
                    if !self.view.is_busy() {
                        self.status
                            .set_error(format!("Backend reports status '{}'", health.status));
                    }
                } else if self.status.get_current().is_none() {
                    self.status.set_info(format!("Backend is up: {}", label));
                }
                self.backend_status = Some(label);
            }
            AppEvent::HealthChecked(Err(e)) => {
                self.backend_status = Some("unreachable".to_string());
                if !self.view.is_busy() {
                    self.status.set_error(format!("Backend health check failed: {}", e));
                }
            }
        }
    }

    /// Draw the UI
    pub fn draw(&mut self, f: &mut Frame) {
        let size = f.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(f, chunks[0]);

        let model = self.view.render();
        self.table.render(f, chunks[1], &model);

        self.status.render(f, chunks[2]);

        if self.show_help_popup {
            self.draw_help_popup(f, size);
        }
    }

    fn header_text(&self) -> String {
        let health = self.backend_status.as_deref().unwrap_or("checking...");
        let updated = self
            .view
            .last_updated()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        format!(
            "Backend: {} | Health: {} | Updated: {} | In flight: {}",
            self.config.base_url_str(),
            health,
            updated,
            self.fetcher.in_flight()
        )
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let header = Paragraph::new(self.header_text())
            .style(Styles::info())
            .block(
                Block::default()
                    .title("Proxy List")
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border()),
            );
        f.render_widget(header, area);
    }

    fn draw_help_popup(&self, f: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 50, area);

        f.render_widget(Clear, popup_area);

        let help_popup = Paragraph::new(help_text())
            .block(
                Block::default()
                    .title("Help - Shortcuts")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Yellow)),
            )
            .style(Style::default().fg(Color::White));

        f.render_widget(help_popup, popup_area);
    }
}

fn help_text() -> &'static str {
    "Proxy List:\n\
    l / Enter - Load list from backend\n\
    r - Ask backend to regenerate, then show the new list\n\
    ↑/↓ or k/j - Move selection\n\
    Page Up/Down - Move selection by a page\n\
    Home/End - First/last proxy\n\n\
    Global Shortcuts:\n\
    ESC - Close this help\n\
    Q - Quit application\n\
    F1 / ? - Toggle this help"
}
