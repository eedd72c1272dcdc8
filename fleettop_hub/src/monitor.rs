//! Monitor table and the observer-bound fan-out.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use tracing::warn;

use crate::conn::ConnSender;
use crate::protocol::Message;

/// Connected observers. Broadcasts snapshot the table under its lock and
/// send outside it, so a slow recipient never stalls registration.
#[derive(Default)]
pub struct Monitors {
    inner: Mutex<HashMap<SocketAddr, ConnSender>>,
}

impl Monitors {
    pub fn register(&self, sender: ConnSender) {
        let mut monitors = self.inner.lock().unwrap();
        monitors.insert(sender.remote(), sender);
    }

    pub fn unregister(&self, remote: SocketAddr) {
        let mut monitors = self.inner.lock().unwrap();
        monitors.remove(&remote);
    }

    fn snapshot(&self) -> Vec<ConnSender> {
        let monitors = self.inner.lock().unwrap();
        monitors.values().cloned().collect()
    }

    /// Fans one message out to every monitor. Per-recipient failures are
    /// logged and skipped; the broken peer's own read loop will notice the
    /// dead socket and tear the session down.
    pub async fn broadcast(&self, msg: &Message) {
        for monitor in self.snapshot() {
            if let Err(error) = monitor.send(msg).await {
                warn!(remote = %monitor.remote(), %error, "failed to send to monitor");
            }
        }
    }
}
