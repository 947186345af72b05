// Application state module
// Shared, read-only after startup apart from the connection counter

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::{watch, Notify};

use super::types::Config;
use crate::routing::RouteTable;

/// Application state
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,
    /// Fired once when the process is asked to stop
    pub shutdown: Arc<Notify>,
    /// Flipped to `true` once the listener is closed; open connections watch it
    pub closing: watch::Sender<bool>,
    pub active_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: Config, routes: RouteTable) -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            config,
            routes,
            shutdown: Arc::new(Notify::new()),
            closing,
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}
