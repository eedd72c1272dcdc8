//! Per-connection send capability and the agent connection table.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

use crate::protocol::Message;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Write side of one connection. Clones share the underlying socket and its
/// lock, so concurrent senders (a session reply and an injected command, or
/// two broadcasts) stay serialized and correctly framed.
#[derive(Clone)]
pub struct ConnSender {
    remote: SocketAddr,
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
}

impl ConnSender {
    pub fn new(remote: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self {
            remote,
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
        }
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Encodes and writes one framed line, holding the connection lock for
    /// the duration of encode + write.
    pub async fn send(&self, msg: &Message) -> Result<(), SendError> {
        let line = msg.encode()?;
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

struct AgentEntry {
    sender: ConnSender,
    client_id: String,
}

#[derive(Default)]
struct AgentTable {
    by_remote: HashMap<SocketAddr, AgentEntry>,
    by_id: HashMap<String, SocketAddr>,
}

/// Live agent connections, addressable by remote and by client ID. Both maps
/// are updated together under one lock at handshake commit, so the ID lookup
/// used by the control path agrees with the registry's hint index.
#[derive(Default)]
pub struct AgentConns {
    inner: Mutex<AgentTable>,
}

impl AgentConns {
    /// Inserts or replaces the entry for a remote. A previous ID bound by the
    /// same remote is unlinked first so re-handshakes do not leak index
    /// entries; an ID already bound by another remote is overwritten
    /// (last writer wins).
    pub fn register(&self, sender: ConnSender, client_id: &str) {
        let remote = sender.remote();
        let mut table = self.inner.lock().unwrap();
        let stale = table
            .by_remote
            .get(&remote)
            .filter(|old| !old.client_id.is_empty() && old.client_id != client_id)
            .map(|old| old.client_id.clone());
        if let Some(stale) = stale {
            if table.by_id.get(&stale) == Some(&remote) {
                table.by_id.remove(&stale);
            }
        }
        table.by_remote.insert(
            remote,
            AgentEntry {
                sender,
                client_id: client_id.to_string(),
            },
        );
        if !client_id.is_empty() {
            table.by_id.insert(client_id.to_string(), remote);
        }
    }

    /// Forgets a closed connection. The ID entry is dropped only when it
    /// still points at this remote, so a reconnect that already rebound the
    /// same ID keeps its mapping.
    pub fn unregister(&self, remote: SocketAddr) {
        let mut table = self.inner.lock().unwrap();
        let Some(entry) = table.by_remote.remove(&remote) else {
            return;
        };
        if !entry.client_id.is_empty() && table.by_id.get(&entry.client_id) == Some(&remote) {
            table.by_id.remove(&entry.client_id);
        }
    }

    /// Resolves a live send capability by client ID.
    pub fn sender_by_id(&self, client_id: &str) -> Option<ConnSender> {
        let table = self.inner.lock().unwrap();
        let remote = table.by_id.get(client_id)?;
        table.by_remote.get(remote).map(|e| e.sender.clone())
    }
}
