// Server loop module
// Accepts connections until shutdown is signalled, then drains open connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the accept loop on `listener` until `shutdown` is notified.
pub async fn run(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    drain(&active_connections, grace).await;
}

/// Wait for open connections to finish, giving up after `grace`
async fn drain(active_connections: &AtomicUsize, grace: Duration) {
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));

    let deadline = tokio::time::Instant::now() + grace;
    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown grace period of {}s elapsed with {} connection(s) open",
                grace.as_secs(),
                active_connections.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
    logger::log_info("All connections closed");
}
