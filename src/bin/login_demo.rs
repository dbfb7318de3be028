use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use cloud_demo_services::config::Settings;
use cloud_demo_services::server::{create_login_app, LoginState};
use cloud_demo_services::shutdown::shutdown_signal_handler;
use cloud_demo_services::telemetry::init_tracing;

/// How often expired sessions and stale login states are purged
const PURGE_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    let state = LoginState::new(settings.clone());

    let (shutdown_tx, _) = broadcast::channel(1);

    let purge_handle = tokio::spawn(purge_loop(state.sessions.clone(), shutdown_tx.subscribe()));

    let app = create_login_app(state);

    let addr = settings.login_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Login demo service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = purge_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn purge_loop(
    sessions: std::sync::Arc<cloud_demo_services::login::SessionStore>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut timer = tokio::time::interval(Duration::from_secs(PURGE_INTERVAL_SECS));
    timer.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = timer.tick() => {
                let purged = sessions.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Dropped expired sessions");
                }
            }
        }
    }
}
