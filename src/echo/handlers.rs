//! Request-reflection endpoints for load-balancer and proxy debugging.
//!
//! Every response is stamped with `date` (RFC 3339) and `api_version` so
//! captures from different probes can be correlated.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, OriginalUri, Query, State},
    http::{header, HeaderMap, Uri},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::server::EchoState;

pub const API_VERSION: &str = "v1";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub hostname: String,
    pub uptime_check: String,
}

#[derive(Debug, Serialize)]
pub struct HeadersResponse {
    pub headers: BTreeMap<String, String>,
    pub date: String,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct UrlInfo {
    pub full_url: String,
    pub path: String,
    pub raw_query_string: String,
}

#[derive(Debug, Serialize)]
pub struct TestParamsResponse {
    pub message: String,
    pub query_params: BTreeMap<String, String>,
    pub param_count: usize,
    pub url_info: UrlInfo,
    pub headers: BTreeMap<String, String>,
    pub date: String,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct AddressInfo {
    pub hostname: String,
    pub local_ip: String,
    pub remote_ip: String,
    pub real_ip: String,
    pub xff: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IpResponse {
    #[serde(flatten)]
    pub address: AddressInfo,
    pub date: String,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct BodyResponse {
    pub body: Value,
    pub date: String,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct AllResponse {
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub address: AddressInfo,
    pub date: String,
    pub api_version: String,
}

/// GET /health - load balancer health check
pub async fn health(State(state): State<EchoState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "echo-api".to_string(),
        version: API_VERSION.to_string(),
        timestamp: stamp(),
        hostname: state.hostname.clone(),
        uptime_check: "ok".to_string(),
    })
}

/// GET /headers - echo all request headers
pub async fn headers(headers: HeaderMap) -> Json<HeadersResponse> {
    Json(HeadersResponse {
        headers: header_map(&headers),
        date: stamp(),
        api_version: API_VERSION.to_string(),
    })
}

/// GET /test-params - echo query-string parameters and URL breakdown
pub async fn test_params(
    OriginalUri(uri): OriginalUri,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Json<TestParamsResponse> {
    Json(TestParamsResponse {
        message: "Query string parameters received successfully".to_string(),
        param_count: params.len(),
        query_params: params,
        url_info: UrlInfo {
            full_url: full_url(&headers, &uri),
            path: uri.path().to_string(),
            raw_query_string: uri.query().unwrap_or("").to_string(),
        },
        headers: header_map(&headers),
        date: stamp(),
        api_version: API_VERSION.to_string(),
    })
}

/// GET /getip - addressing info as seen by the service
pub async fn get_ip(
    State(state): State<EchoState>,
    remote: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
) -> Json<IpResponse> {
    Json(IpResponse {
        address: address_info(&state, &headers, remote.map(|Extension(ConnectInfo(addr))| addr)),
        date: stamp(),
        api_version: API_VERSION.to_string(),
    })
}

/// POST /body - echo a JSON request body
pub async fn body(Json(body): Json<Value>) -> Json<BodyResponse> {
    Json(BodyResponse {
        body,
        date: stamp(),
        api_version: API_VERSION.to_string(),
    })
}

/// POST /all - headers, body and addressing info combined
pub async fn all(
    State(state): State<EchoState>,
    remote: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<AllResponse> {
    Json(AllResponse {
        address: address_info(&state, &headers, remote.map(|Extension(ConnectInfo(addr))| addr)),
        headers: header_map(&headers),
        body,
        date: stamp(),
        api_version: API_VERSION.to_string(),
    })
}

fn stamp() -> String {
    Utc::now().to_rfc3339()
}

/// Flatten request headers to a sorted map; duplicate names keep the last
/// value, non-UTF-8 values are lossily converted
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Reconstruct the URL the client requested, trusting the proxy scheme header
fn full_url(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{scheme}://{host}{path_and_query}")
}

fn address_info(state: &EchoState, headers: &HeaderMap, remote: Option<SocketAddr>) -> AddressInfo {
    let remote_ip = remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| remote_ip.clone());

    let mut xff = forwarded_chain(headers);
    if let Some(addr) = remote {
        xff.push(addr.ip().to_string());
    }

    AddressInfo {
        hostname: state.hostname.clone(),
        local_ip: state.local_ip(),
        remote_ip,
        real_ip,
        xff,
    }
}

/// Parse the comma-separated X-Forwarded-For chain
fn forwarded_chain(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
