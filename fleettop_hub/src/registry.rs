//! Authoritative client registry: remote address to last-known agent state,
//! plus the `client_id` hint index used to address agents from observers.
//!
//! Both maps live under one mutex. Mutations run as closures with the lock
//! held; every read path hands out an owned, deep-copied
//! [`ClientStateSummary`], so no reference into the map outlives the lock and
//! nothing sent to a monitor shares backing storage with the registry.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::protocol::{
    ClientStateSummary, CpuUsageData, DiskUsageData, GeneralData, HandshakeData, MemoryUsageData,
    ProcessUsageData, ROLE_CLIENT,
};

/// Cadence advertised for a freshly handshaken agent.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_millis(5000);

/// Last-known snapshot for one connected agent.
#[derive(Debug, Clone)]
pub struct ClientState {
    pub remote_addr: SocketAddr,
    pub handshake: Option<HandshakeData>,
    pub cpu: Option<CpuUsageData>,
    pub memory: Option<MemoryUsageData>,
    pub disk: Option<DiskUsageData>,
    pub general: Option<GeneralData>,
    pub processes: Option<ProcessUsageData>,
    pub interval: Duration,
    pub last_update: DateTime<Utc>,
}

impl ClientState {
    fn new(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            handshake: None,
            cpu: None,
            memory: None,
            disk: None,
            general: None,
            processes: None,
            interval: Duration::ZERO,
            last_update: Utc::now(),
        }
    }

    /// True when the record carries a client-role handshake; only such
    /// records are visible to observers.
    pub fn is_client(&self) -> bool {
        self.handshake
            .as_ref()
            .map(|hs| hs.role == ROLE_CLIENT)
            .unwrap_or(false)
    }

    fn summarize(&self) -> ClientStateSummary {
        ClientStateSummary {
            remote_addr: self.remote_addr.to_string(),
            handshake: self.handshake.clone(),
            cpu: self.cpu.clone(),
            memory: self.memory.clone(),
            disk: self.disk.clone(),
            general: self.general.clone(),
            processes: self.processes.clone(),
            last_update: self.last_update,
            stats_interval_ms: self.interval.as_millis() as i64,
        }
    }
}

#[derive(Default)]
struct Inner {
    states: HashMap<SocketAddr, ClientState>,
    // Hint only: last writer wins, may lag the authoritative map.
    id_index: HashMap<String, SocketAddr>,
}

#[derive(Default)]
pub struct ClientRegistry {
    inner: Mutex<Inner>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the record if missing, applies the mutation, refreshes
    /// `last_update` and returns a defensive copy for broadcasting. The
    /// mutator runs with the lock held and must not block.
    pub fn update(
        &self,
        remote: SocketAddr,
        mutate: impl FnOnce(&mut ClientState),
    ) -> ClientStateSummary {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .states
            .entry(remote)
            .or_insert_with(|| ClientState::new(remote));
        mutate(state);
        state.last_update = Utc::now();
        state.summarize()
    }

    /// True once the record exists and its handshake has been committed.
    pub fn has_handshake(&self, remote: SocketAddr) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .states
            .get(&remote)
            .map(|st| st.handshake.is_some())
            .unwrap_or(false)
    }

    /// Associates a client ID with a remote so interval commands can find it.
    pub fn bind_id(&self, remote: SocketAddr, client_id: &str) {
        if client_id.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.id_index.insert(client_id.to_string(), remote);
    }

    /// Resolves the ID hint. Callers must tolerate a miss or a stale remote.
    pub fn resolve_id(&self, client_id: &str) -> Option<SocketAddr> {
        let inner = self.inner.lock().unwrap();
        inner.id_index.get(client_id).copied()
    }

    /// Removes the record and its ID index entry, returning the removed state
    /// so the caller can inspect the old handshake without further locking.
    /// The index entry is only dropped when it still points at this remote:
    /// a reconnect that rebound the same ID must not be clobbered by the old
    /// session's teardown.
    pub fn remove(&self, remote: SocketAddr) -> Option<ClientState> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner.states.remove(&remote)?;
        if let Some(hs) = &state.handshake {
            if inner.id_index.get(&hs.client_id) == Some(&remote) {
                inner.id_index.remove(&hs.client_id);
            }
        }
        Some(state)
    }

    /// Aggregated view of every client-role record, deep-copied.
    pub fn summarize_all(&self) -> Vec<ClientStateSummary> {
        let inner = self.inner.lock().unwrap();
        inner
            .states
            .values()
            .filter(|st| st.is_client())
            .map(|st| st.summarize())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    fn handshake(id: &str, role: &str) -> HandshakeData {
        HandshakeData {
            client_id: id.into(),
            version: "1.0.0".into(),
            role: role.into(),
        }
    }

    #[test]
    fn update_creates_lazily_and_refreshes_last_update() {
        let reg = ClientRegistry::new();
        let first = reg.update(addr(1000), |st| {
            st.handshake = Some(handshake("a1", ROLE_CLIENT));
            st.interval = DEFAULT_STATS_INTERVAL;
        });
        let second = reg.update(addr(1000), |st| {
            st.cpu = Some(CpuUsageData {
                usage: 42.0,
                cores_usage: vec![40.0, 44.0],
            })
        });
        assert_eq!(second.stats_interval_ms, 5000);
        assert!(second.last_update >= first.last_update);
        assert_eq!(second.cpu.unwrap().usage, 42.0);
    }

    #[test]
    fn summaries_do_not_alias_registry_storage() {
        let reg = ClientRegistry::new();
        reg.update(addr(1001), |st| {
            st.handshake = Some(handshake("a1", ROLE_CLIENT));
            st.cpu = Some(CpuUsageData {
                usage: 10.0,
                cores_usage: vec![10.0],
            });
        });
        let before = reg.summarize_all().remove(0);
        reg.update(addr(1001), |st| {
            if let Some(cpu) = st.cpu.as_mut() {
                cpu.cores_usage[0] = 99.0;
            }
        });
        // earlier copy is unaffected by the later mutation
        assert_eq!(before.cpu.unwrap().cores_usage, vec![10.0]);
    }

    #[test]
    fn summarize_all_filters_non_clients() {
        let reg = ClientRegistry::new();
        reg.update(addr(1002), |st| {
            st.handshake = Some(handshake("a1", ROLE_CLIENT))
        });
        // record without a handshake yet (pre-handshake race window)
        reg.update(addr(1003), |_| {});
        let all = reg.summarize_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].handshake.as_ref().unwrap().client_id, "a1");
    }

    #[test]
    fn remove_clears_both_indices() {
        let reg = ClientRegistry::new();
        reg.update(addr(1004), |st| {
            st.handshake = Some(handshake("a1", ROLE_CLIENT))
        });
        reg.bind_id(addr(1004), "a1");
        let removed = reg.remove(addr(1004)).unwrap();
        assert_eq!(removed.handshake.unwrap().client_id, "a1");
        assert!(reg.resolve_id("a1").is_none());
        assert!(reg.summarize_all().is_empty());
    }

    #[test]
    fn stale_teardown_keeps_rebound_id() {
        let reg = ClientRegistry::new();
        reg.update(addr(1005), |st| {
            st.handshake = Some(handshake("a1", ROLE_CLIENT))
        });
        reg.bind_id(addr(1005), "a1");
        // same ID rebinds to a newer connection
        reg.update(addr(1006), |st| {
            st.handshake = Some(handshake("a1", ROLE_CLIENT))
        });
        reg.bind_id(addr(1006), "a1");
        // old session tears down afterwards
        reg.remove(addr(1005));
        assert_eq!(reg.resolve_id("a1"), Some(addr(1006)));
    }

    #[test]
    fn handshake_replay_is_idempotent() {
        let reg = ClientRegistry::new();
        for _ in 0..2 {
            reg.update(addr(1007), |st| {
                st.handshake = Some(handshake("a1", ROLE_CLIENT));
                st.interval = DEFAULT_STATS_INTERVAL;
            });
            reg.bind_id(addr(1007), "a1");
        }
        let all = reg.summarize_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].stats_interval_ms, 5000);
    }
}
