//! fleettop agent: samples host metrics and reports them to the hub over a
//! persistent TCP connection, accepting cadence commands back.

pub mod control;
pub mod metrics;
pub mod sampler;
pub mod wire;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::metrics::Collector;
use crate::wire::{HandshakeData, HubWriter, IntervalData, PROTOCOL_VERSION, ROLE_CLIENT};

/// Runs the bootstrap sequence on an established connection and spawns the
/// sampler and control tasks. Returns the cadence handle so the caller (the
/// interactive input loop, or a test) can adjust the interval locally.
pub async fn start(stream: TcpStream, client_id: &str) -> io::Result<AgentHandle> {
    let (read_half, write_half) = stream.into_split();
    let writer = HubWriter::new(write_half);

    writer
        .send(
            "handshake",
            &HandshakeData {
                client_id: client_id.to_string(),
                version: PROTOCOL_VERSION.to_string(),
                role: ROLE_CLIENT.to_string(),
            },
        )
        .await?;

    let mut collector = Collector::new();
    writer.send("general_data", &collector.general()).await?;
    writer
        .send(
            "interval_update",
            &IntervalData {
                interval_ms: sampler::DEFAULT_INTERVAL.as_millis() as i64,
            },
        )
        .await?;

    let (cadence_tx, cadence_rx) = watch::channel(sampler::DEFAULT_INTERVAL);
    let cadence = Arc::new(cadence_tx);

    tokio::spawn(control::run(read_half, writer.clone(), Arc::clone(&cadence)));
    tokio::spawn(sampler::run(writer.clone(), collector, cadence_rx));

    Ok(AgentHandle { writer, cadence })
}

/// Handle kept by the input loop: local cadence changes go through the same
/// channel the hub's commands use, and are advertised back to the hub.
pub struct AgentHandle {
    writer: HubWriter,
    cadence: Arc<watch::Sender<Duration>>,
}

impl AgentHandle {
    pub async fn set_interval(&self, interval: Duration) -> io::Result<()> {
        if self.cadence.send(interval).is_err() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "sampler stopped",
            ));
        }
        self.writer
            .send(
                "interval_update",
                &IntervalData {
                    interval_ms: interval.as_millis() as i64,
                },
            )
            .await
    }
}
