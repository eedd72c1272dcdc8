//! App state and main loop: input handling, hub events, and drawing.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::net::{self, HubEvent, HubHandle};
use crate::state::FleetState;
use crate::ui;

pub const INTERVAL_STEP_MS: i64 = 1000;
pub const MIN_INTERVAL_MS: i64 = 500;
pub const MAX_INTERVAL_MS: i64 = 60_000;
const DEFAULT_INTERVAL_MS: i64 = 5000;

/// Clamps a stepped interval into the allowed range. A zero current value
/// (agent never advertised) steps from the default cadence.
pub(crate) fn step_interval(current: i64, delta: i64) -> i64 {
    let base = if current == 0 {
        DEFAULT_INTERVAL_MS
    } else {
        current
    };
    (base + delta).clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

pub struct Status {
    pub text: String,
    pub error: bool,
}

pub struct App {
    pub state: FleetState,
    pub selected: usize,
    pub status: Status,
    pub connected: bool,
    should_quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            state: FleetState::new(),
            selected: 0,
            status: Status {
                text: "Connected. Up/Down to navigate, +/- to change interval, r to refresh, q to quit."
                    .into(),
                error: false,
            },
            connected: true,
            should_quit: false,
        }
    }

    pub async fn run(&mut self, host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // Bootstrap failure is fatal; everything after is surfaced in the
        // status line instead.
        let (hub, mut events) = net::connect(host, port).await?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal, &hub, &mut events).await;

        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        hub: &HubHandle,
        events: &mut mpsc::Receiver<HubEvent>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key.code, hub).await;
                }
            }
            if self.should_quit {
                break;
            }

            // Drain pending hub events
            while let Ok(event) = events.try_recv() {
                self.apply_event(event);
            }
            self.clamp_selection();

            terminal.draw(|f| self.draw(f))?;

            sleep(Duration::from_millis(150)).await;
        }
        Ok(())
    }

    async fn handle_key(&mut self, code: KeyCode, hub: &HubHandle) {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.state.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => match hub.request_snapshot().await {
                Ok(()) => self.set_status("Requesting snapshot from hub...", false),
                Err(error) => {
                    self.set_status(format!("Failed to request snapshot: {error}"), true)
                }
            },
            // '+' asks for a faster cadence, '-' for a slower one
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.change_selected_interval(hub, -INTERVAL_STEP_MS).await;
            }
            KeyCode::Char('-') | KeyCode::Char('_') => {
                self.change_selected_interval(hub, INTERVAL_STEP_MS).await;
            }
            _ => {}
        }
    }

    fn apply_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Snapshot(list) => {
                let n = list.len();
                self.state.apply_snapshot(list);
                if n == 0 {
                    self.set_status("No clients connected yet.", false);
                } else {
                    self.set_status(format!("{n} client(s) connected."), false);
                }
            }
            HubEvent::Update(summary) => {
                self.state.apply_update(summary);
            }
            HubEvent::Removed(client_id) => {
                self.state.apply_removal(&client_id);
                self.set_status(format!("Client {client_id} disconnected."), false);
            }
            HubEvent::Disconnected(reason) => {
                self.connected = false;
                self.set_status(format!("Connection closed: {reason}"), true);
            }
        }
    }

    async fn change_selected_interval(&mut self, hub: &HubHandle, delta: i64) {
        let Some(key) = self.selected_key() else {
            self.set_status("Select a client before changing the interval.", false);
            return;
        };
        let (current, target) = match self.state.get(&key) {
            Some(client) => {
                let current = if client.stats_interval_ms == 0 {
                    DEFAULT_INTERVAL_MS
                } else {
                    client.stats_interval_ms
                };
                (current, client.display_name().to_string())
            }
            None => {
                self.set_status("Client not found.", false);
                return;
            }
        };

        let next = step_interval(current, delta);
        if next == current {
            let limit = if delta < 0 { "minimum" } else { "maximum" };
            self.set_status(format!("Interval already at the allowed {limit}."), false);
            return;
        }
        if target.is_empty() {
            self.set_status("Client has no usable identifier.", false);
            return;
        }

        match hub.set_interval(&target, next).await {
            Ok(()) => self.set_status(format!("Requested {next} ms for {target}."), false),
            Err(error) => self.set_status(format!("Failed to send interval: {error}"), true),
        }
    }

    pub fn selected_key(&self) -> Option<String> {
        self.state.order().get(self.selected).cloned()
    }

    fn clamp_selection(&mut self) {
        if self.state.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.state.len() {
            self.selected = self.state.len() - 1;
        }
    }

    fn set_status(&mut self, text: impl Into<String>, error: bool) {
        self.status = Status {
            text: text.into(),
            error,
        };
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        ui::draw(f, self);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_clamps_to_bounds() {
        assert_eq!(step_interval(5000, INTERVAL_STEP_MS), 6000);
        assert_eq!(step_interval(5000, -INTERVAL_STEP_MS), 4000);
        assert_eq!(step_interval(1000, -INTERVAL_STEP_MS), MIN_INTERVAL_MS);
        assert_eq!(step_interval(MIN_INTERVAL_MS, -INTERVAL_STEP_MS), MIN_INTERVAL_MS);
        assert_eq!(step_interval(60_000, INTERVAL_STEP_MS), MAX_INTERVAL_MS);
    }

    #[test]
    fn stepping_from_unadvertised_uses_default() {
        assert_eq!(step_interval(0, INTERVAL_STEP_MS), 6000);
        assert_eq!(step_interval(0, -INTERVAL_STEP_MS), 4000);
    }
}
