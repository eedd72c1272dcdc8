//! Right panel: gauges, history sparkline and top processes for the
//! selected agent.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Row, Sparkline, Table},
};

use crate::app::App;
use crate::history::StatsHistory;
use crate::types::ClientStateSummary;
use crate::ui::util::{human, truncate};

pub fn draw_detail(f: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let Some(key) = app.selected_key() else {
        let p = Paragraph::new("No client selected.\n\nWaiting for data...")
            .block(Block::default().borders(Borders::ALL).title("Details"));
        f.render_widget(p, area);
        return;
    };
    let Some(client) = app.state.get(&key) else {
        let p = Paragraph::new("Data unavailable.")
            .block(Block::default().borders(Borders::ALL).title("Details"));
        f.render_widget(p, area);
        return;
    };

    let block = Block::default().borders(Borders::ALL).title("Details");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // identity + hardware
            Constraint::Length(3), // cpu gauge
            Constraint::Length(4), // cpu history
            Constraint::Length(2), // memory gauge
            Constraint::Length(2), // disk gauge
            Constraint::Min(4),    // processes
        ])
        .split(inner);

    draw_identity(f, rows[0], client);
    draw_cpu(f, rows[1], client);
    draw_cpu_history(f, rows[2], app.state.history(&key));
    draw_memory(f, rows[3], client);
    draw_disk(f, rows[4], client);
    draw_processes(f, rows[5], client);
}

fn draw_identity(f: &mut ratatui::Frame<'_>, area: Rect, client: &ClientStateSummary) {
    let mut lines = vec![Line::from(vec![
        Span::styled("Client: ", Style::default().fg(Color::Yellow)),
        Span::raw(client.display_name().to_string()),
        Span::raw("   "),
        Span::styled("Origin: ", Style::default().fg(Color::Yellow)),
        Span::raw(client.remote_addr.clone()),
    ])];
    if let Some(general) = &client.general {
        lines.push(Line::from(format!(
            "{} | {} cores @ {:.0} MHz",
            general.model_name, general.cores, general.mhz
        )));
    }
    if client.stats_interval_ms > 0 {
        lines.push(Line::from(vec![
            Span::styled("Reporting every ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{} ms", client.stats_interval_ms)),
        ]));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn usage_color(pct: f64) -> Color {
    if pct >= 90.0 {
        Color::Red
    } else if pct >= 70.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn draw_cpu(f: &mut ratatui::Frame<'_>, area: Rect, client: &ClientStateSummary) {
    let Some(cpu) = &client.cpu else {
        f.render_widget(Paragraph::new("CPU: no data yet"), area);
        return;
    };
    let pct = cpu.usage.clamp(0.0, 100.0);
    let g = Gauge::default()
        .block(Block::default().borders(Borders::NONE).title(format!(
            "CPU ({} cores reporting)",
            cpu.cores_usage.len()
        )))
        .gauge_style(Style::default().fg(usage_color(pct)))
        .percent(pct as u16)
        .label(format!("{pct:.1}%"));
    f.render_widget(g, area);
}

fn draw_cpu_history(f: &mut ratatui::Frame<'_>, area: Rect, history: Option<&StatsHistory>) {
    let values: Vec<u64> = history
        .map(|h| h.cpu.iter().copied().collect())
        .unwrap_or_default();
    let s = Sparkline::default()
        .block(Block::default().borders(Borders::NONE).title("CPU history (%)"))
        .data(&values)
        .max(100)
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(s, area);
}

fn draw_memory(f: &mut ratatui::Frame<'_>, area: Rect, client: &ClientStateSummary) {
    let Some(mem) = &client.memory else {
        f.render_widget(Paragraph::new("Memory: no data yet"), area);
        return;
    };
    let pct = mem.used_percent.clamp(0.0, 100.0);
    let g = Gauge::default()
        .block(Block::default().borders(Borders::NONE).title("Memory"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .percent(pct as u16)
        .label(format!("{} / {} ({pct:.1}%)", human(mem.used), human(mem.total)));
    f.render_widget(g, area);
}

fn draw_disk(f: &mut ratatui::Frame<'_>, area: Rect, client: &ClientStateSummary) {
    let Some(disk) = &client.disk else {
        f.render_widget(Paragraph::new("Disk: no data yet"), area);
        return;
    };
    let pct = disk.used_percent.clamp(0.0, 100.0);
    let g = Gauge::default()
        .block(Block::default().borders(Borders::NONE).title("Disk"))
        .gauge_style(Style::default().fg(Color::Blue))
        .percent(pct as u16)
        .label(format!("{} / {} ({pct:.1}%)", human(disk.used), human(disk.total)));
    f.render_widget(g, area);
}

fn draw_processes(f: &mut ratatui::Frame<'_>, area: Rect, client: &ClientStateSummary) {
    let Some(procs) = &client.processes else {
        f.render_widget(Paragraph::new("Processes: no data yet"), area);
        return;
    };

    // summaries arrive pre-sorted by CPU, but don't rely on it
    let mut sorted: Vec<_> = procs.processes.iter().collect();
    sorted.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let rows: Vec<Row> = sorted
        .iter()
        .take(5)
        .map(|p| {
            Row::new(vec![
                p.pid.to_string(),
                truncate(&p.name, 24),
                format!("{:.1}%", p.cpu_percent),
                format!("{:.1}MB", p.memory_mb),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(16),
            Constraint::Length(8),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["PID", "NAME", "CPU", "MEM"])
            .style(Style::default().fg(Color::Yellow)),
    )
    .block(Block::default().borders(Borders::TOP).title("Top processes"));
    f.render_widget(table, area);
}
