//! Shared hub state: the registry, the monitor set and the agent connection
//! table, constructed once at startup and handed to every session.

use chrono::Utc;
use thiserror::Error;

use crate::conn::{AgentConns, ConnSender, SendError};
use crate::monitor::Monitors;
use crate::protocol::{
    ClientRemovedData, ClientStateSummary, ClientUpdateData, ClientsStateData, IntervalData,
    Message,
};
use crate::registry::ClientRegistry;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("client {0} not connected")]
    NotConnected(String),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Default)]
pub struct Hub {
    pub registry: ClientRegistry,
    pub agents: AgentConns,
    pub monitors: Monitors,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers one `clients_request` with the instantaneous registry view.
    pub async fn send_clients_state(&self, monitor: &ConnSender) -> Result<(), ControlError> {
        let data = ClientsStateData {
            clients: self.registry.summarize_all(),
            generated_at: Utc::now(),
        };
        let msg = Message::new("clients_state", &data)?;
        monitor.send(&msg).await?;
        Ok(())
    }

    /// Publishes a fresh snapshot of one agent as soon as a mutation lands.
    /// Records without a client-role handshake are not observer-visible.
    pub async fn broadcast_client_update(&self, summary: &ClientStateSummary) {
        let is_client = summary
            .handshake
            .as_ref()
            .map(|hs| hs.role == crate::protocol::ROLE_CLIENT)
            .unwrap_or(false);
        if !is_client {
            return;
        }
        match Message::new(
            "client_update",
            &ClientUpdateData {
                client: summary.clone(),
            },
        ) {
            Ok(msg) => self.monitors.broadcast(&msg).await,
            Err(error) => tracing::error!(%error, "failed to encode client_update"),
        }
    }

    /// Tells observers that an agent disconnected. Emitted only after the
    /// registry no longer lists the agent.
    pub async fn broadcast_client_removed(&self, client_id: &str) {
        if client_id.is_empty() {
            return;
        }
        match Message::new(
            "client_removed",
            &ClientRemovedData {
                client_id: client_id.to_string(),
            },
        ) {
            Ok(msg) => self.monitors.broadcast(&msg).await,
            Err(error) => tracing::error!(%error, "failed to encode client_removed"),
        }
    }

    /// Forwards an observer's interval command to the targeted agent.
    pub async fn send_interval_set(
        &self,
        client_id: &str,
        interval_ms: i64,
    ) -> Result<(), ControlError> {
        let Some(agent) = self.agents.sender_by_id(client_id) else {
            return Err(ControlError::NotConnected(client_id.to_string()));
        };
        let msg = Message::new(
            "set_interval",
            &IntervalData {
                client_id: String::new(),
                interval_ms,
            },
        )?;
        agent.send(&msg).await?;
        Ok(())
    }
}
