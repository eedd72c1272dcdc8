//! Inbound command reader: watches the hub connection for `set_interval`
//! and feeds the sampler's cadence channel, echoing `interval_update` so
//! observers see the change land through the broadcast path.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::wire::{HubWriter, IntervalData, Message};

pub async fn run(
    read_half: OwnedReadHalf,
    writer: HubWriter,
    cadence: Arc<watch::Sender<Duration>>,
) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("hub closed the connection");
                return;
            }
            Err(error) => {
                info!(%error, "hub connection lost");
                return;
            }
        };

        let msg = match Message::decode(&line) {
            Ok(msg) => msg,
            Err(error) => {
                warn!(%error, "dropping malformed line from hub");
                continue;
            }
        };

        match msg.kind.as_str() {
            "set_interval" => {
                let upd: IntervalData = match msg.parse_data() {
                    Ok(upd) => upd,
                    Err(error) => {
                        warn!(%error, "failed to parse set_interval");
                        continue;
                    }
                };
                if upd.interval_ms <= 0 {
                    warn!(interval_ms = upd.interval_ms, "ignoring invalid interval from hub");
                    continue;
                }
                let next = Duration::from_millis(upd.interval_ms as u64);
                if cadence.send(next).is_err() {
                    return;
                }
                info!(interval_ms = upd.interval_ms, "cadence set by hub");
                if let Err(error) = writer
                    .send("interval_update", &IntervalData { interval_ms: upd.interval_ms })
                    .await
                {
                    warn!(%error, "failed to acknowledge interval change");
                }
            }
            // nothing else is addressed to agents
            _ => {}
        }
    }
}
