//! Hub connection: bootstrap handshake, push-stream reader and the command
//! sender used by the interval keys.

use std::io;
use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::types::{
    ClientRemovedData, ClientStateSummary, ClientUpdateData, ClientsStateData, Message,
    PROTOCOL_VERSION,
};

/// Everything the app loop needs to know about, already decoded.
pub enum HubEvent {
    Snapshot(Vec<ClientStateSummary>),
    Update(ClientStateSummary),
    Removed(String),
    /// Terminal: the read loop exited. Carries a printable reason.
    Disconnected(String),
}

/// Write side of the hub connection; cheap to clone into key handlers.
#[derive(Clone)]
pub struct HubHandle {
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
}

impl HubHandle {
    async fn send(&self, kind: &str, data: serde_json::Value) -> io::Result<()> {
        let mut line = json!({"type": kind, "data": data}).to_string();
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await
    }

    /// Asks the hub for a full snapshot; the reply arrives as a
    /// [`HubEvent::Snapshot`] on the event stream.
    pub async fn request_snapshot(&self) -> io::Result<()> {
        self.send("clients_request", json!({})).await
    }

    pub async fn set_interval(&self, client_id: &str, interval_ms: i64) -> io::Result<()> {
        self.send(
            "interval_set_request",
            json!({"client_id": client_id, "interval_ms": interval_ms}),
        )
        .await
    }
}

/// Dials the hub, performs the monitor bootstrap and spawns the read loop.
/// Dial or handshake failure is returned to the caller (fatal for the
/// process); later read failures surface as [`HubEvent::Disconnected`].
pub async fn connect(host: &str, port: u16) -> io::Result<(HubHandle, mpsc::Receiver<HubEvent>)> {
    let stream = TcpStream::connect((host, port)).await?;
    let (read_half, write_half) = stream.into_split();
    let handle = HubHandle {
        writer: Arc::new(tokio::sync::Mutex::new(write_half)),
    };

    handle
        .send(
            "handshake",
            json!({"client_id": "monitor", "version": PROTOCOL_VERSION, "role": "monitor"}),
        )
        .await?;
    handle.request_snapshot().await?;

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(read_loop(read_half, tx));
    Ok((handle, rx))
}

async fn read_loop(read_half: OwnedReadHalf, tx: mpsc::Sender<HubEvent>) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                let _ = tx.send(HubEvent::Disconnected("hub closed the connection".into())).await;
                return;
            }
            Err(error) => {
                let _ = tx.send(HubEvent::Disconnected(error.to_string())).await;
                return;
            }
        };

        // malformed or unknown lines never end the stream
        let Ok(msg) = Message::decode(&line) else {
            continue;
        };
        let event = match msg.kind.as_str() {
            "clients_state" => match msg.parse_data::<ClientsStateData>() {
                Ok(data) => HubEvent::Snapshot(data.clients),
                Err(_) => continue,
            },
            "client_update" => match msg.parse_data::<ClientUpdateData>() {
                Ok(data) => HubEvent::Update(data.client),
                Err(_) => continue,
            },
            "client_removed" => match msg.parse_data::<ClientRemovedData>() {
                Ok(data) => HubEvent::Removed(data.client_id),
                Err(_) => continue,
            },
            _ => continue,
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }
}
