use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use cloud_demo_services::config::Settings;
use cloud_demo_services::server::{create_echo_app, EchoState};
use cloud_demo_services::shutdown::shutdown_signal_handler;
use cloud_demo_services::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    let state = EchoState::new();
    tracing::info!(hostname = %state.hostname, local_ip = %state.local_ip(), "Echo API state initialized");

    let (shutdown_tx, _) = broadcast::channel(1);

    let app = create_echo_app(state);

    let addr = settings.echo_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Echo API listening");

    // ConnectInfo gives the handlers the peer address for /getip and /all
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
