use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;
use crate::ws::PING_INTERVAL;

/// Shared state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub broadcaster: Broadcaster,
    /// Server-wide shutdown token; connections derive child tokens from it.
    pub shutdown: CancellationToken,
    pub ping_interval: Duration,
}

impl AppState {
    pub fn new(broadcaster: Broadcaster, shutdown: CancellationToken) -> Self {
        Self {
            broadcaster,
            shutdown,
            ping_interval: PING_INTERVAL,
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }
}
