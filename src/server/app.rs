use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{echo, login, ws};

use super::{EchoState, LoginState, WsState};

/// Upper bound on echoed request bodies
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router of the WebSocket demo service
pub fn create_ws_app(state: WsState) -> Router {
    Router::new()
        .route("/", get(ws::api::demo_page))
        .route("/ws", get(ws::ws_handler))
        .route("/status", get(ws::api::status))
        .route("/metrics", get(ws::api::prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

/// Router of the header-echo diagnostic API
pub fn create_echo_app(state: EchoState) -> Router {
    Router::new()
        .route("/health", get(echo::handlers::health))
        .route("/headers", get(echo::handlers::headers))
        .route("/test-params", get(echo::handlers::test_params))
        .route("/getip", get(echo::handlers::get_ip))
        .route("/body", post(echo::handlers::body))
        .route("/all", post(echo::handlers::all))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

/// Router of the OAuth2/OIDC login demo
pub fn create_login_app(state: LoginState) -> Router {
    Router::new()
        .route("/", get(login::handlers::index))
        .route("/login", get(login::handlers::login))
        .route("/auth/callback", get(login::handlers::callback))
        .route("/profile", get(login::handlers::profile))
        .route("/tokens", get(login::handlers::tokens))
        .route("/logout", get(login::handlers::logout))
        .route("/health", get(login::handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}
