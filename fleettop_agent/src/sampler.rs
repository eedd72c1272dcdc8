//! Periodic sampler: one timer task that reports all metric families each
//! tick. Cadence changes arrive through a watch channel, which is the
//! single-slot, drop-older-coalesce semantics the control path wants; the
//! timer is rebuilt on receipt so the next tick uses the new period.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::metrics::Collector;
use crate::wire::HubWriter;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

fn timer(period: Duration, immediate: bool) -> Interval {
    let mut ticker = if immediate {
        interval(period)
    } else {
        interval_at(Instant::now() + period, period)
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

pub async fn run(writer: HubWriter, mut collector: Collector, mut cadence: watch::Receiver<Duration>) {
    let mut period = *cadence.borrow();
    // first report goes out immediately, like the initial bootstrap tick
    let mut ticker = timer(period, true);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(error) = report_all(&writer, &mut collector).await {
                    warn!(%error, "failed to report metrics");
                }
            }
            changed = cadence.changed() => {
                if changed.is_err() {
                    return;
                }
                let next = *cadence.borrow_and_update();
                if next > Duration::ZERO && next != period {
                    debug!(interval_ms = next.as_millis() as u64, "sampler cadence changed");
                    period = next;
                    ticker = timer(period, false);
                }
            }
        }
    }
}

/// One tick: the four periodic families, in a fixed order. A failed send
/// does not stop the remaining families; the first error is returned once
/// all of them were attempted.
async fn report_all(writer: &HubWriter, collector: &mut Collector) -> std::io::Result<()> {
    let mut failed: Option<std::io::Error> = None;
    if let Err(error) = writer.send("cpu_usage", &collector.cpu()).await {
        failed.get_or_insert(error);
    }
    if let Err(error) = writer.send("memory_usage", &collector.memory()).await {
        failed.get_or_insert(error);
    }
    if let Err(error) = writer.send("disk_usage", &collector.disk()).await {
        failed.get_or_insert(error);
    }
    if let Err(error) = writer.send("process_usage", &collector.processes()).await {
        failed.get_or_insert(error);
    }
    match failed {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
