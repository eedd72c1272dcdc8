//! Per-connection session: role gate, message dispatch and teardown.
//!
//! A session starts unauthenticated; the first valid handshake picks its
//! role and the choice is terminal. Malformed lines and out-of-state
//! messages are dropped with a diagnostic; only an I/O error on read ends
//! the session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::conn::ConnSender;
use crate::hub::Hub;
use crate::protocol::{
    CpuUsageData, DiskUsageData, GeneralData, HandshakeData, IntervalData, MemoryUsageData,
    Message, ProcessUsageData, ROLE_CLIENT, ROLE_MONITOR,
};
use crate::registry::DEFAULT_STATS_INTERVAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Unauthenticated,
    Client,
    Monitor,
}

fn allowed_for_role(kind: &str, role: Role) -> bool {
    match role {
        Role::Client => matches!(
            kind,
            "cpu_usage"
                | "memory_usage"
                | "disk_usage"
                | "general_data"
                | "process_usage"
                | "interval_update"
        ),
        Role::Monitor => matches!(kind, "clients_request" | "interval_set_request"),
        Role::Unauthenticated => false,
    }
}

pub async fn run_session(hub: Arc<Hub>, socket: TcpStream, remote: SocketAddr) {
    info!(%remote, "new connection");

    let (read_half, write_half) = socket.into_split();
    let sender = ConnSender::new(remote, write_half);
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();
    let mut role = Role::Unauthenticated;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!(%remote, "connection closed by peer");
                break;
            }
            Ok(_) => {}
            Err(error) => {
                info!(%remote, %error, "connection closed");
                break;
            }
        }

        // Bytes stay bytes until here: a line that is not valid UTF-8 is
        // just another malformed line, not a dead session.
        let line = String::from_utf8_lossy(&buf);
        let msg = match Message::decode(&line) {
            Ok(msg) => msg,
            Err(error) => {
                warn!(%remote, %error, "dropping malformed line");
                continue;
            }
        };

        if msg.kind != "handshake" {
            if role == Role::Unauthenticated {
                warn!(%remote, kind = %msg.kind, "dropping message: handshake not completed");
                continue;
            }
            if !allowed_for_role(&msg.kind, role) {
                warn!(%remote, kind = %msg.kind, ?role, "dropping message: not allowed for role");
                continue;
            }
            // Race window: the session is Client but the registry commit of
            // its handshake has not landed yet.
            if role == Role::Client && !hub.registry.has_handshake(remote) {
                warn!(%remote, kind = %msg.kind, "dropping message: client state unavailable");
                continue;
            }
        }

        dispatch(&hub, &sender, remote, &mut role, &msg).await;
    }

    teardown(&hub, remote, role).await;
}

async fn dispatch(
    hub: &Hub,
    sender: &ConnSender,
    remote: SocketAddr,
    role: &mut Role,
    msg: &Message,
) {
    match msg.kind.as_str() {
        "handshake" => {
            let Some(hs) = decode_payload::<HandshakeData>(msg, remote) else {
                return;
            };
            handle_handshake(hub, sender, remote, role, hs).await;
        }
        "cpu_usage" => {
            let Some(cpu) = decode_payload::<CpuUsageData>(msg, remote) else {
                return;
            };
            debug!(%remote, usage = cpu.usage, "cpu update");
            let summary = hub.registry.update(remote, |st| st.cpu = Some(cpu));
            hub.broadcast_client_update(&summary).await;
        }
        "memory_usage" => {
            let Some(mem) = decode_payload::<MemoryUsageData>(msg, remote) else {
                return;
            };
            debug!(%remote, used_percent = mem.used_percent, "memory update");
            let summary = hub.registry.update(remote, |st| st.memory = Some(mem));
            hub.broadcast_client_update(&summary).await;
        }
        "disk_usage" => {
            let Some(disk) = decode_payload::<DiskUsageData>(msg, remote) else {
                return;
            };
            debug!(%remote, used_percent = disk.used_percent, "disk update");
            let summary = hub.registry.update(remote, |st| st.disk = Some(disk));
            hub.broadcast_client_update(&summary).await;
        }
        "general_data" => {
            let Some(general) = decode_payload::<GeneralData>(msg, remote) else {
                return;
            };
            debug!(%remote, model = %general.model_name, cores = general.cores, "general data");
            let summary = hub.registry.update(remote, |st| st.general = Some(general));
            hub.broadcast_client_update(&summary).await;
        }
        "process_usage" => {
            let Some(procs) = decode_payload::<ProcessUsageData>(msg, remote) else {
                return;
            };
            debug!(%remote, entries = procs.processes.len(), "process update");
            let summary = hub.registry.update(remote, |st| st.processes = Some(procs));
            hub.broadcast_client_update(&summary).await;
        }
        "interval_update" => {
            let Some(upd) = decode_payload::<IntervalData>(msg, remote) else {
                return;
            };
            if upd.interval_ms <= 0 {
                warn!(%remote, interval_ms = upd.interval_ms, "dropping invalid interval update");
                return;
            }
            debug!(%remote, interval_ms = upd.interval_ms, "interval update");
            let summary = hub.registry.update(remote, |st| {
                st.interval = Duration::from_millis(upd.interval_ms as u64)
            });
            hub.broadcast_client_update(&summary).await;
        }
        "interval_set_request" => {
            let Some(req) = decode_payload::<IntervalData>(msg, remote) else {
                return;
            };
            if req.client_id.is_empty() || req.interval_ms <= 0 {
                warn!(
                    %remote,
                    client_id = %req.client_id,
                    interval_ms = req.interval_ms,
                    "dropping invalid interval request"
                );
                return;
            }
            if let Err(error) = hub.send_interval_set(&req.client_id, req.interval_ms).await {
                warn!(%remote, %error, "interval command failed");
            }
        }
        "clients_request" => {
            if let Err(error) = hub.send_clients_state(sender).await {
                warn!(%remote, %error, "failed to send clients state");
            }
        }
        other => {
            warn!(%remote, kind = %other, "unknown message type");
        }
    }
}

async fn handle_handshake(
    hub: &Hub,
    sender: &ConnSender,
    remote: SocketAddr,
    role: &mut Role,
    hs: HandshakeData,
) {
    match *role {
        Role::Unauthenticated => match hs.role.as_str() {
            ROLE_CLIENT => {
                *role = Role::Client;
                commit_client_handshake(hub, sender, remote, hs).await;
            }
            ROLE_MONITOR => {
                *role = Role::Monitor;
                hub.monitors.register(sender.clone());
                info!(%remote, client_id = %hs.client_id, version = %hs.version, "monitor handshake");
            }
            other => {
                warn!(%remote, role = %other, "dropping handshake with unknown role");
            }
        },
        // Role is terminal for the session: a repeated handshake only updates
        // identifying fields, whatever role it claims.
        Role::Client => commit_client_handshake(hub, sender, remote, hs).await,
        Role::Monitor => {
            debug!(%remote, client_id = %hs.client_id, "monitor re-handshake ignored");
        }
    }
}

async fn commit_client_handshake(
    hub: &Hub,
    sender: &ConnSender,
    remote: SocketAddr,
    mut hs: HandshakeData,
) {
    hs.role = ROLE_CLIENT.to_string();
    let client_id = hs.client_id.clone();
    let version = hs.version.clone();
    let summary = hub.registry.update(remote, |st| {
        st.handshake = Some(hs);
        st.interval = DEFAULT_STATS_INTERVAL;
    });
    hub.registry.bind_id(remote, &client_id);
    hub.agents.register(sender.clone(), &client_id);
    info!(%remote, %client_id, %version, "client handshake");
    hub.broadcast_client_update(&summary).await;
}

/// Ordering is load-bearing: the registry entry and both ID indices are gone
/// before `client_removed` goes out, so an observer that queries on receipt
/// sees a consistent view.
async fn teardown(hub: &Hub, remote: SocketAddr, role: Role) {
    match role {
        Role::Monitor => hub.monitors.unregister(remote),
        Role::Client | Role::Unauthenticated => {
            let removed = hub.registry.remove(remote);
            hub.agents.unregister(remote);
            if let Some(state) = removed {
                if let Some(hs) = state.handshake {
                    if hs.role == ROLE_CLIENT && !hs.client_id.is_empty() {
                        hub.broadcast_client_removed(&hs.client_id).await;
                    }
                }
            }
        }
    }
}

fn decode_payload<T: DeserializeOwned>(msg: &Message, remote: SocketAddr) -> Option<T> {
    match msg.parse_data() {
        Ok(data) => Some(data),
        Err(error) => {
            warn!(%remote, kind = %msg.kind, %error, "failed to parse payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_gate_tables() {
        for kind in [
            "cpu_usage",
            "memory_usage",
            "disk_usage",
            "general_data",
            "process_usage",
            "interval_update",
        ] {
            assert!(allowed_for_role(kind, Role::Client), "{kind}");
            assert!(!allowed_for_role(kind, Role::Monitor), "{kind}");
        }
        for kind in ["clients_request", "interval_set_request"] {
            assert!(allowed_for_role(kind, Role::Monitor), "{kind}");
            assert!(!allowed_for_role(kind, Role::Client), "{kind}");
        }
        assert!(!allowed_for_role("cpu_usage", Role::Unauthenticated));
        assert!(!allowed_for_role("anything_else", Role::Client));
    }
}
