//! Integration tests for the WebSocket demo service.
//!
//! Uses `axum_test::TestServer` with a real HTTP transport so the upgrade
//! handshake and message loop run end to end.

use axum_test::TestServer;
use serde_json::{json, Value};

use cloud_demo_services::config::Settings;
use cloud_demo_services::server::{create_ws_app, WsState};

fn test_server() -> TestServer {
    let state = WsState::new(Settings::default());
    TestServer::builder()
        .http_transport()
        .build(create_ws_app(state))
        .expect("failed to create test server")
}

#[tokio::test]
async fn status_reports_zero_connections_initially() {
    let server = test_server();

    let resp = server.get("/status").await;
    resp.assert_status_ok();

    let body: Value = resp.json();
    assert_eq!(body["status"], "running");
    assert_eq!(body["active_connections"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn demo_page_serves_html() {
    let server = test_server();

    let resp = server.get("/").await;
    resp.assert_status_ok();
    assert!(resp.text().contains("<!DOCTYPE"));
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let server = test_server();

    let resp = server.get("/metrics").await;
    resp.assert_status_ok();
    assert!(resp.text().contains("wsdemo_connections_active"));
}

#[tokio::test]
async fn connect_receives_welcome_and_bumps_status_count() {
    let server = test_server();

    let mut ws = server.get_websocket("/ws").await.into_websocket().await;

    let welcome: Value = ws.receive_json().await;
    assert_eq!(welcome["type"], "connection");
    assert!(welcome["connection_id"].is_u64());

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["active_connections"], 1);

    ws.close().await;
}

#[tokio::test]
async fn ping_echo_and_fallback_replies() {
    let server = test_server();

    let mut ws = server.get_websocket("/ws").await.into_websocket().await;
    let _welcome: Value = ws.receive_json().await;

    ws.send_json(&json!({"type": "ping", "message": "hello"})).await;
    let pong: Value = ws.receive_json().await;
    assert_eq!(pong["type"], "pong");
    assert_eq!(pong["original_message"], "hello");

    ws.send_json(&json!({"type": "echo", "message": "x"})).await;
    let echo: Value = ws.receive_json().await;
    assert_eq!(echo["type"], "echo");
    assert_eq!(echo["message"], "Echo: x");

    ws.send_json(&json!({"kind": "unknown"})).await;
    let ack: Value = ws.receive_json().await;
    assert_eq!(ack["type"], "message");
    assert_eq!(ack["message"], r#"Received: {"kind":"unknown"}"#);

    ws.send_text("not json at all").await;
    let text_ack: Value = ws.receive_json().await;
    assert_eq!(text_ack["type"], "text");
    assert_eq!(text_ack["message"], "Received text: not json at all");

    ws.close().await;
}

#[tokio::test]
async fn broadcast_reaches_sender_and_other_clients() {
    let server = test_server();

    let mut first = server.get_websocket("/ws").await.into_websocket().await;
    let first_welcome: Value = first.receive_json().await;
    let first_id = first_welcome["connection_id"].as_u64().unwrap();

    let mut second = server.get_websocket("/ws").await.into_websocket().await;
    let _second_welcome: Value = second.receive_json().await;

    first.send_json(&json!({"type": "broadcast", "message": "hi all"})).await;

    let to_sender: Value = first.receive_json().await;
    assert_eq!(to_sender["type"], "broadcast");
    assert_eq!(to_sender["message"], "Broadcast: hi all");
    assert_eq!(to_sender["sender"], format!("client-{first_id}"));

    let to_other: Value = second.receive_json().await;
    assert_eq!(to_other["message"], "Broadcast: hi all");

    first.close().await;
    second.close().await;
}
