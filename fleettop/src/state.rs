//! Observer-side view of the fleet: the latest summary per client plus the
//! bounded history feeding the detail charts.

use std::collections::HashMap;

use crate::history::StatsHistory;
use crate::types::ClientStateSummary;

/// Stable key for a client: handshake ID when present, remote address
/// otherwise (a client that never handshook cannot appear, but a summary
/// with an empty ID still needs a slot).
pub fn client_key(summary: &ClientStateSummary) -> String {
    summary.display_name().to_string()
}

#[derive(Default)]
pub struct FleetState {
    clients: HashMap<String, ClientStateSummary>,
    order: Vec<String>,
    history: HashMap<String, StatsHistory>,
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, key: &str) -> Option<&ClientStateSummary> {
        self.clients.get(key)
    }

    pub fn history(&self, key: &str) -> Option<&StatsHistory> {
        self.history.get(key)
    }

    /// Replaces the whole view with a `clients_state` snapshot. History for
    /// clients absent from the snapshot is pruned.
    pub fn apply_snapshot(&mut self, list: Vec<ClientStateSummary>) {
        let mut clients = HashMap::with_capacity(list.len());
        let mut order = Vec::with_capacity(list.len());
        for summary in list {
            let key = client_key(&summary);
            self.history.entry(key.clone()).or_default().record(&summary);
            order.push(key.clone());
            clients.insert(key, summary);
        }
        order.sort();
        order.dedup();
        self.history.retain(|key, _| clients.contains_key(key));
        self.clients = clients;
        self.order = order;
    }

    /// Applies one incremental `client_update`.
    pub fn apply_update(&mut self, summary: ClientStateSummary) {
        let key = client_key(&summary);
        if !self.clients.contains_key(&key) {
            self.order.push(key.clone());
            self.order.sort();
        }
        self.history.entry(key.clone()).or_default().record(&summary);
        self.clients.insert(key, summary);
    }

    /// Forgets a disconnected client.
    pub fn apply_removal(&mut self, client_id: &str) {
        if client_id.is_empty() {
            return;
        }
        self.clients.remove(client_id);
        self.order.retain(|key| key != client_id);
        self.history.remove(client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CpuUsageData, HandshakeData};
    use chrono::Utc;

    fn summary(id: &str, remote: &str, cpu: Option<f64>) -> ClientStateSummary {
        ClientStateSummary {
            remote_addr: remote.into(),
            handshake: if id.is_empty() {
                None
            } else {
                Some(HandshakeData {
                    client_id: id.into(),
                    version: "1.0.0".into(),
                    role: "client".into(),
                })
            },
            cpu: cpu.map(|usage| CpuUsageData {
                usage,
                cores_usage: vec![usage],
            }),
            memory: None,
            disk: None,
            general: None,
            processes: None,
            last_update: Utc::now(),
            stats_interval_ms: 5000,
        }
    }

    #[test]
    fn key_falls_back_to_remote_addr() {
        assert_eq!(client_key(&summary("a1", "1.2.3.4:5", None)), "a1");
        assert_eq!(client_key(&summary("", "1.2.3.4:5", None)), "1.2.3.4:5");
    }

    #[test]
    fn snapshot_replaces_and_prunes() {
        let mut state = FleetState::new();
        state.apply_update(summary("gone", "1.1.1.1:1", Some(10.0)));
        assert!(state.history("gone").is_some());

        state.apply_snapshot(vec![
            summary("b", "2.2.2.2:2", Some(20.0)),
            summary("a", "3.3.3.3:3", None),
        ]);
        assert_eq!(state.order(), ["a", "b"]);
        assert!(state.get("gone").is_none());
        assert!(state.history("gone").is_none());
        assert!(state.history("b").is_some());
    }

    #[test]
    fn update_inserts_in_sorted_position() {
        let mut state = FleetState::new();
        state.apply_update(summary("m", "1.1.1.1:1", None));
        state.apply_update(summary("a", "2.2.2.2:2", None));
        state.apply_update(summary("z", "3.3.3.3:3", None));
        assert_eq!(state.order(), ["a", "m", "z"]);

        // an update for a known client keeps the order stable
        state.apply_update(summary("m", "1.1.1.1:1", Some(50.0)));
        assert_eq!(state.order(), ["a", "m", "z"]);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn update_accumulates_history() {
        let mut state = FleetState::new();
        state.apply_update(summary("a", "1.1.1.1:1", Some(10.0)));
        state.apply_update(summary("a", "1.1.1.1:1", Some(20.0)));
        let hist = state.history("a").unwrap();
        assert_eq!(hist.cpu.iter().copied().collect::<Vec<_>>(), vec![10, 20]);
        assert!(hist.memory.is_empty());
    }

    #[test]
    fn removal_clears_everything() {
        let mut state = FleetState::new();
        state.apply_update(summary("a", "1.1.1.1:1", Some(10.0)));
        state.apply_removal("a");
        assert!(state.is_empty());
        assert!(state.get("a").is_none());
        assert!(state.history("a").is_none());

        // empty removals are ignored
        state.apply_update(summary("b", "2.2.2.2:2", None));
        state.apply_removal("");
        assert_eq!(state.len(), 1);
    }
}
