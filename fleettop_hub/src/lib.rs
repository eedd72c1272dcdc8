//! fleettop hub: accepts agent and monitor connections over TCP, keeps the
//! canonical view of every live agent and fans change events out to
//! subscribed monitors.

pub mod conn;
pub mod hub;
pub mod monitor;
pub mod protocol;
pub mod registry;
pub mod session;

use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::error;

use crate::hub::Hub;

/// Runs the accept loop on an already-bound listener, spawning one session
/// task per connection. Never returns under normal operation; shutdown is
/// cooperative (drop the listener's task).
pub async fn serve(listener: TcpListener) -> io::Result<()> {
    let hub = Arc::new(Hub::new());
    loop {
        let (socket, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                error!(%error, "failed to accept connection");
                continue;
            }
        };
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            session::run_session(hub, socket, remote).await;
        });
    }
}
