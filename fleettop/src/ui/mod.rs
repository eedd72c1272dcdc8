//! UI module root: top-level layout plus drawing functions for each panel.

pub mod clients;
pub mod detail;
pub mod header;
pub mod util;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, Status};

pub fn draw(f: &mut ratatui::Frame<'_>, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // header
            Constraint::Min(10),    // client list + detail
            Constraint::Length(3),  // status line
        ])
        .split(f.area());

    header::draw_header(f, rows[0], app);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(20)])
        .split(rows[1]);

    clients::draw_clients(f, cols[0], app);
    detail::draw_detail(f, cols[1], app);

    draw_status(f, rows[2], &app.status);
}

fn draw_status(f: &mut ratatui::Frame<'_>, area: Rect, status: &Status) {
    let style = if status.error {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let p = Paragraph::new(status.text.as_str())
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
