use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use cloud_demo_services::config::Settings;
use cloud_demo_services::server::{create_ws_app, WsState};
use cloud_demo_services::shutdown::shutdown_signal_handler;
use cloud_demo_services::tasks::HeartbeatTask;
use cloud_demo_services::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    let state = WsState::new(settings.clone());

    let (shutdown_tx, _) = broadcast::channel(1);

    let heartbeat_task = HeartbeatTask::new(
        settings.websocket.clone(),
        state.registry.clone(),
        shutdown_tx.subscribe(),
    );
    let heartbeat_handle = tokio::spawn(async move {
        heartbeat_task.run().await;
    });

    let app = create_ws_app(state);

    let addr = settings.ws_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "WebSocket demo service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = heartbeat_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}
