//! Top header with the fleet size and connection state.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders},
};

use crate::app::App;

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let title = if app.connected {
        format!(
            "fleettop — {} agent(s) connected  (press 'q' to quit)",
            app.state.len()
        )
    } else {
        "fleettop — hub connection lost  (press 'q' to quit)".to_string()
    };
    let style = if app.connected {
        Style::default()
    } else {
        Style::default().fg(Color::Red)
    };
    f.render_widget(
        Block::default()
            .title(title)
            .title_style(style)
            .borders(Borders::BOTTOM),
        area,
    );
}
