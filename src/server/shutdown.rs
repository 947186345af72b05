// Graceful shutdown module
// Waits for in-flight connections after the listener has been closed

use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::AppState;
use crate::logger;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until no connection is active or the grace period has elapsed.
///
/// Connections still open at the deadline are left to be dropped with the runtime.
pub async fn drain_connections(state: &AppState) {
    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    let deadline = Instant::now() + grace;

    loop {
        let remaining = state.active_connections.load(Ordering::SeqCst);
        if remaining == 0 || Instant::now() >= deadline {
            logger::log_shutdown_complete(remaining);
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
