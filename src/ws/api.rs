//! HTTP endpoints of the WebSocket demo service.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;

use crate::metrics;
use crate::server::WsState;

/// Demo page with connect/ping/echo/broadcast controls
const DEMO_HTML: &str = include_str!("../web/ws_demo.html");

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub active_connections: usize,
    pub timestamp: String,
}

/// GET / - embedded demo client
pub async fn demo_page() -> Html<&'static str> {
    Html(DEMO_HTML)
}

/// GET /status - server state and live connection count
pub async fn status(State(state): State<WsState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".to_string(),
        active_connections: state.registry.count().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<WsState>) -> impl IntoResponse {
    metrics::CONNECTIONS_ACTIVE.set(state.registry.count().await as i64);

    match metrics::encode_metrics() {
        Ok(output) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
