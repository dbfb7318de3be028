use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::WebSocketConfig;
use crate::metrics::HEARTBEAT_ROUNDS;
use crate::registry::ConnectionRegistry;
use crate::ws::ServerMessage;

/// Background task broadcasting a periodic status update to all connections
pub struct HeartbeatTask {
    config: WebSocketConfig,
    registry: Arc<ConnectionRegistry>,
    shutdown: broadcast::Receiver<()>,
}

impl HeartbeatTask {
    pub fn new(
        config: WebSocketConfig,
        registry: Arc<ConnectionRegistry>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            registry,
            shutdown,
        }
    }

    /// Run the heartbeat loop until shutdown
    pub async fn run(mut self) {
        let mut heartbeat_timer =
            tokio::time::interval(Duration::from_secs(self.config.heartbeat_interval));

        // Skip immediate first tick
        heartbeat_timer.tick().await;

        tracing::info!(
            heartbeat_interval_secs = self.config.heartbeat_interval,
            "Heartbeat task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = heartbeat_timer.tick() => {
                    self.send_heartbeat().await;
                }
            }
        }

        tracing::info!("Heartbeat task stopped");
    }

    /// Broadcast one periodic update; silent when nobody is connected
    async fn send_heartbeat(&self) {
        let count = self.registry.count().await;
        if count == 0 {
            return;
        }

        let outcome = self.registry.broadcast(ServerMessage::periodic(count)).await;
        HEARTBEAT_ROUNDS.inc();

        tracing::debug!(
            attempted = outcome.attempted,
            delivered = outcome.delivered,
            pruned = outcome.pruned,
            "Heartbeat round completed"
        );
    }
}
