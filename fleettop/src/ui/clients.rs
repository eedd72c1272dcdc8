//! Left panel: the list of connected agents.

use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::app::App;

pub fn draw_clients(f: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let now = Utc::now();
    let items: Vec<ListItem> = app
        .state
        .order()
        .iter()
        .filter_map(|key| app.state.get(key))
        .map(|client| {
            let age = now
                .signed_duration_since(client.last_update)
                .num_seconds()
                .max(0);
            ListItem::new(vec![
                Line::from(Span::styled(
                    client.display_name().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("{} | updated {age}s ago", client.remote_addr),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Clients"))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    if !app.state.is_empty() {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}
