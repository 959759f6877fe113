//! Proxy table component

use ratatui::{
    layout::{Alignment, Constraint, Rect},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::proxy_tui::{
    proxy_list::{RenderModel, TableRow, COLUMNS},
    ui::Styles,
};

/// Configuration for proxy table display
#[derive(Debug, Clone)]
pub struct ProxyTableConfig {
    pub title: String,
    pub max_link_width: usize,
    pub page_size: usize,
}

impl Default for ProxyTableConfig {
    fn default() -> Self {
        Self {
            title: "Proxies".to_string(),
            max_link_width: 60,
            page_size: 10,
        }
    }
}

impl ProxyTableConfig {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }
}

/// Table of proxies with a selection that follows the row key across reloads
pub struct ProxyTable {
    pub state: TableState,
    pub config: ProxyTableConfig,
    keys: Vec<String>,
    selected_key: Option<String>,
}

impl ProxyTable {
    pub fn new(config: ProxyTableConfig) -> Self {
        Self {
            state: TableState::default(),
            config,
            keys: Vec::new(),
            selected_key: None,
        }
    }

    /// Take over a new set of rows and restore the selection by key
    pub fn sync(&mut self, rows: &[TableRow]) {
        let previous_index = self.state.selected();
        self.keys = rows.iter().map(|row| row.key.clone()).collect();

        let index = if self.keys.is_empty() {
            None
        } else if let Some(pos) = self
            .selected_key
            .as_ref()
            .and_then(|key| self.keys.iter().position(|k| k == key))
        {
            Some(pos)
        } else {
            // selected row vanished: stay at the same height
            Some(previous_index.unwrap_or(0).min(self.keys.len() - 1))
        };

        self.select(index);
    }

    fn select(&mut self, index: Option<usize>) {
        self.state.select(index);
        self.selected_key = index.and_then(|i| self.keys.get(i).cloned());
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.state.selected()
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.selected_key.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.keys.len()
    }

    pub fn navigate_up(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let selected = self.state.selected().unwrap_or(0);
        let new_selected = if selected == 0 {
            self.keys.len() - 1
        } else {
            selected - 1
        };
        self.select(Some(new_selected));
    }

    pub fn navigate_down(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let selected = self.state.selected().unwrap_or(0);
        self.select(Some((selected + 1) % self.keys.len()));
    }

    pub fn page_up(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let selected = self.state.selected().unwrap_or(0);
        self.select(Some(selected.saturating_sub(self.config.page_size)));
    }

    pub fn page_down(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let selected = self.state.selected().unwrap_or(0);
        let last = self.keys.len() - 1;
        self.select(Some((selected + self.config.page_size).min(last)));
    }

    pub fn navigate_to_first(&mut self) {
        if !self.keys.is_empty() {
            self.select(Some(0));
        }
    }

    pub fn navigate_to_last(&mut self) {
        if !self.keys.is_empty() {
            self.select(Some(self.keys.len() - 1));
        }
    }

    /// Render either the loading indicator or the table
    pub fn render(&mut self, f: &mut Frame, area: Rect, model: &RenderModel) {
        match model {
            RenderModel::Loading => {
                let block = Block::default()
                    .title(format!("{} (Loading)", self.config.title))
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border());
                let paragraph = Paragraph::new("⟳ Loading proxies...")
                    .style(Styles::warning())
                    .alignment(Alignment::Center)
                    .block(block);
                f.render_widget(paragraph, area);
            }
            RenderModel::Table(rows) => self.render_rows(f, area, rows),
        }
    }

    fn render_rows(&mut self, f: &mut Frame, area: Rect, rows: &[TableRow]) {
        let header = Row::new(COLUMNS.iter().map(|c| Cell::from(*c))).style(Styles::title());

        let body: Vec<Row> = rows
            .iter()
            .map(|row| {
                let mut cells = row.cells.clone();
                cells[0] = truncate_to_width(&cells[0], self.config.max_link_width);
                Row::new(cells.into_iter().map(Cell::from))
            })
            .collect();

        let title = if rows.is_empty() {
            format!("{} (Empty)", self.config.title)
        } else {
            format!("{} ({})", self.config.title, rows.len())
        };

        let widths = [
            Constraint::Min(20),
            Constraint::Length(16),
            Constraint::Length(7),
            Constraint::Length(14),
            Constraint::Length(10),
        ];

        let table = Table::new(body, widths)
            .header(header)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            )
            .highlight_style(Styles::selected())
            .highlight_symbol("> ");

        f.render_stateful_widget(table, area, &mut self.state);
    }
}

/// Cut `s` to at most `max_width` display columns, marking the cut with `…`
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

fn pad_to_width(s: &str, width: usize) -> String {
    let padding = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(padding))
}

/// Plain-text rendering of the table for non-interactive output
pub fn plain_table(rows: &[TableRow], max_link_width: usize) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells = row.cells.to_vec();
            cells[0] = truncate_to_width(&cells[0], max_link_width);
            cells
        })
        .collect();

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.width()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let format_line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| pad_to_width(v, *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(COLUMNS.to_vec()));
    out.push('\n');
    let total_width = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
    out.push_str(&"-".repeat(total_width));
    out.push('\n');
    for row in &cells {
        out.push_str(&format_line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}
