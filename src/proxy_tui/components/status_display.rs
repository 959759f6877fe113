//! Status line component for request progress and failures

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::proxy_tui::ui::Styles;

/// Types of status messages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusType {
    Info,
    Success,
    Error,
    Loading,
}

impl StatusType {
    fn prefix(&self) -> &'static str {
        match self {
            StatusType::Info => "ℹ",
            StatusType::Success => "✓",
            StatusType::Error => "✗",
            StatusType::Loading => "⟳",
        }
    }

    fn style(&self) -> Style {
        match self {
            StatusType::Info => Styles::info(),
            StatusType::Success => Styles::success(),
            StatusType::Error => Styles::error(),
            StatusType::Loading => Styles::warning(),
        }
    }
}

/// Status message with type and content
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub status_type: StatusType,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl StatusMessage {
    pub fn new(message: String, status_type: StatusType) -> Self {
        Self {
            message,
            status_type,
            timestamp: chrono::Local::now(),
        }
    }
}

/// Single-line status display with an idle hint
pub struct StatusDisplay {
    pub current_message: Option<StatusMessage>,
    pub idle_text: String,
    pub show_timestamp: bool,
}

impl Default for StatusDisplay {
    fn default() -> Self {
        Self {
            current_message: None,
            idle_text: "Ready".to_string(),
            show_timestamp: true,
        }
    }
}

impl StatusDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_text(mut self, text: &str) -> Self {
        self.idle_text = text.to_string();
        self
    }

    pub fn set_info(&mut self, message: String) {
        self.current_message = Some(StatusMessage::new(message, StatusType::Info));
    }

    pub fn set_success(&mut self, message: String) {
        self.current_message = Some(StatusMessage::new(message, StatusType::Success));
    }

    pub fn set_error(&mut self, message: String) {
        self.current_message = Some(StatusMessage::new(message, StatusType::Error));
    }

    pub fn set_loading(&mut self, message: String) {
        self.current_message = Some(StatusMessage::new(message, StatusType::Loading));
    }

    pub fn get_current(&self) -> Option<&StatusMessage> {
        self.current_message.as_ref()
    }

    /// Text shown in the status line
    pub fn text(&self) -> String {
        match &self.current_message {
            Some(message) if self.show_timestamp => format!(
                "{} [{}] {}",
                message.status_type.prefix(),
                message.timestamp.format("%H:%M:%S"),
                message.message
            ),
            Some(message) => format!("{} {}", message.status_type.prefix(), message.message),
            None => self.idle_text.clone(),
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let style = self
            .current_message
            .as_ref()
            .map(|m| m.status_type.style())
            .unwrap_or_else(Styles::inactive);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Styles::inactive_border());

        let paragraph = Paragraph::new(self.text()).style(style).block(block);

        f.render_widget(paragraph, area);
    }
}
