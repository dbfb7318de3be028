//! Integration tests for the login demo service.
//!
//! The identity provider is never contacted: these cover the configuration
//! fallback, the redirect plumbing and session-backed pages.

use axum::http::StatusCode;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use cloud_demo_services::config::{OAuthConfig, Settings};
use cloud_demo_services::login::{TokenSet, UserProfile, SESSION_COOKIE};
use cloud_demo_services::server::{create_login_app, LoginState};

const AUTHORITY: &str = "https://login.microsoftonline.com/test-tenant";

fn configured_settings() -> Settings {
    Settings {
        oauth: OAuthConfig {
            tenant_id: Some("test-tenant".into()),
            client_id: Some("test-client".into()),
            client_secret: Some("test-secret".into()),
            authority: Some(AUTHORITY.into()),
            ..OAuthConfig::default()
        },
        ..Settings::default()
    }
}

fn test_server(state: LoginState) -> TestServer {
    TestServer::new(create_login_app(state)).expect("failed to create test server")
}

fn profile() -> UserProfile {
    UserProfile {
        display_name: Some("Jamie Doe".into()),
        user_principal_name: Some("jamie@example.com".into()),
        mail: Some("jamie@example.com".into()),
    }
}

fn location(resp: &axum_test::TestResponse) -> String {
    resp.header("location").to_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_ok_even_without_oauth_config() {
    let server = test_server(LoginState::new(Settings::default()));

    let resp = server.get("/health").await;
    resp.assert_status_ok();

    let body: Value = resp.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn index_without_config_lists_missing_settings() {
    let server = test_server(LoginState::new(Settings::default()));

    let resp = server.get("/").await;
    resp.assert_status_ok();

    let body = resp.text();
    assert!(body.contains("oauth.tenant_id"));
    assert!(body.contains("oauth.client_secret"));
}

#[tokio::test]
async fn index_without_session_offers_sign_in() {
    let server = test_server(LoginState::new(configured_settings()));

    let resp = server.get("/").await;
    resp.assert_status_ok();
    assert!(resp.text().contains("href=\"/login\""));
}

#[tokio::test]
async fn login_redirects_to_authorization_endpoint() {
    let server = test_server(LoginState::new(configured_settings()));

    let resp = server.get("/login").await;
    resp.assert_status(StatusCode::SEE_OTHER);

    let target = location(&resp);
    assert!(target.starts_with(&format!("{AUTHORITY}/oauth2/v2.0/authorize?")));
    assert!(target.contains("client_id=test-client"));
    assert!(target.contains("state="));
    assert!(target.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fcallback"));
}

#[tokio::test]
async fn callback_with_provider_error_renders_error_page() {
    let server = test_server(LoginState::new(configured_settings()));

    let resp = server
        .get("/auth/callback")
        .add_query_param("error", "access_denied")
        .add_query_param("error_description", "User declined consent")
        .await;
    resp.assert_status_ok();

    let body = resp.text();
    assert!(body.contains("OAuth error"));
    assert!(body.contains("User declined consent"));
}

#[tokio::test]
async fn callback_with_unknown_state_is_rejected() {
    let server = test_server(LoginState::new(configured_settings()));

    let resp = server
        .get("/auth/callback")
        .add_query_param("code", "auth-code")
        .add_query_param("state", "never-issued")
        .await;
    resp.assert_status_ok();
    assert!(resp.text().contains("invalid or expired"));
}

#[tokio::test]
async fn callback_without_code_redirects_home() {
    let server = test_server(LoginState::new(configured_settings()));

    let resp = server.get("/auth/callback").await;
    resp.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
}

#[tokio::test]
async fn profile_without_session_redirects_to_login() {
    let server = test_server(LoginState::new(configured_settings()));

    let resp = server.get("/profile").await;
    resp.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn index_with_session_shows_user() {
    let state = LoginState::new(configured_settings());
    let session_id = state.sessions.create(profile(), None);
    let server = test_server(state);

    let resp = server
        .get("/")
        .add_header("cookie", format!("{SESSION_COOKIE}={session_id}"))
        .await;
    resp.assert_status_ok();
    assert!(resp.text().contains("Jamie Doe"));
}

#[tokio::test]
async fn tokens_page_decodes_cached_claims() {
    let state = LoginState::new(configured_settings());

    let claims = json!({"name": "Jamie Doe", "preferred_username": "jamie@example.com"});
    let id_token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test")).unwrap();
    let access_token =
        encode(&Header::default(), &json!({"scp": "User.Read"}), &EncodingKey::from_secret(b"test"))
            .unwrap();

    let tokens = TokenSet {
        access_token,
        id_token: Some(id_token),
        refresh_token: None,
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    };
    let session_id = state.sessions.create(profile(), Some(tokens));
    let server = test_server(state);

    let resp = server
        .get("/tokens")
        .add_header("cookie", format!("{SESSION_COOKIE}={session_id}"))
        .await;
    resp.assert_status_ok();

    let body = resp.text();
    assert!(body.contains("jamie@example.com"));
    assert!(body.contains("User.Read"));
}

#[tokio::test]
async fn tokens_page_without_cached_tokens_explains() {
    let state = LoginState::new(configured_settings());
    let session_id = state.sessions.create(profile(), None);
    let server = test_server(state);

    let resp = server
        .get("/tokens")
        .add_header("cookie", format!("{SESSION_COOKIE}={session_id}"))
        .await;
    resp.assert_status_ok();
    assert!(resp.text().contains("No tokens are cached"));
}

#[tokio::test]
async fn logout_clears_session_and_redirects_to_authority() {
    let state = LoginState::new(configured_settings());
    let session_id = state.sessions.create(profile(), None);
    assert_eq!(state.sessions.len(), 1);

    let server = test_server(state.clone());
    let resp = server
        .get("/logout")
        .add_header("cookie", format!("{SESSION_COOKIE}={session_id}"))
        .await;
    resp.assert_status(StatusCode::SEE_OTHER);

    assert!(location(&resp).starts_with(&format!("{AUTHORITY}/oauth2/v2.0/logout?")));
    assert_eq!(state.sessions.len(), 0);
}
