//! Route handlers of the login demo service.
//!
//! Page handlers return `Result<_, ErrorPage>` so upstream failures render
//! the embedded error template instead of a JSON error body.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::config::Settings;
use crate::server::LoginState;

use super::claims::decode_unverified;
use super::pages::{self, escape, ErrorPage};
use super::{IdTokenClaims, OidcClient, Session, TokenSet, UserProfile, SESSION_COOKIE};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// GET / - landing page with the signed-in profile or a sign-in link
pub async fn index(State(state): State<LoginState>, jar: CookieJar) -> Response {
    if state.oidc.is_none() {
        return ErrorPage::missing_config(&state.settings.oauth.missing_fields()).into_response();
    }

    let content = match current_session(&state, &jar) {
        Some((_, session)) => format!(
            "<p>Signed in as <strong>{}</strong></p>\
             <p>\
               <a class=\"button\" href=\"/profile\">Profile</a>\
               <a class=\"button\" href=\"/tokens\">Tokens</a>\
               <a class=\"button secondary\" href=\"/logout\">Sign out</a>\
             </p>",
            escape(session.user.label())
        ),
        None => "<p>You are not signed in.</p>\
                 <p><a class=\"button\" href=\"/login\">Sign in</a></p>"
            .to_string(),
    };

    pages::index(&[("content_html", &content)]).into_response()
}

/// GET /login - start the authorization-code flow
pub async fn login(
    State(state): State<LoginState>,
    headers: HeaderMap,
) -> Result<Redirect, ErrorPage> {
    let oidc = require_oidc(&state)?;

    let login_state = state.sessions.issue_state();
    let url = oidc.authorize_url(&callback_uri(&state.settings, &headers), &login_state)?;

    tracing::info!("Redirecting to authorization endpoint");
    Ok(Redirect::to(&url))
}

/// GET /auth/callback - provider redirect target
pub async fn callback(
    State(state): State<LoginState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<Response, ErrorPage> {
    let oidc = require_oidc(&state)?;

    if let Some(error) = &params.error {
        let detail = params.error_description.as_deref().unwrap_or(error.as_str());
        tracing::warn!(error = %error, "Authorization failed at the provider");
        return Err(ErrorPage::new(format!("OAuth error: {}", escape(detail))));
    }

    let Some(code) = &params.code else {
        // Neither code nor error: nothing to do
        return Ok(Redirect::to("/").into_response());
    };

    let valid_state = params
        .state
        .as_deref()
        .is_some_and(|value| state.sessions.consume_state(value));
    if !valid_state {
        tracing::warn!("Callback carried a missing or unknown state value");
        return Err(ErrorPage::new(
            "Login state is invalid or expired. Start again from the sign-in page.",
        ));
    }

    let token = oidc
        .exchange_code(code, &callback_uri(&state.settings, &headers))
        .await
        .map_err(|e| ErrorPage::new(format!("Token acquisition failed: {}", escape(&e.to_string()))))?;

    // Demo-grade validation: confirm the authority publishes a discovery
    // document and log the issuer it advertises
    match oidc.discovery().await {
        Ok(doc) => tracing::info!(expected_issuer = %doc.issuer, "Token issuer check"),
        Err(e) => {
            tracing::warn!(error = %e, "Discovery document fetch failed");
            return Err(ErrorPage::new("Token validation failed"));
        }
    }

    let user = resolve_user(oidc, &token).await?;
    tracing::info!(user = %user.label(), "User signed in");

    let tokens = TokenSet {
        access_token: token.access_token,
        id_token: token.id_token,
        refresh_token: token.refresh_token,
        expires_at: Utc::now() + Duration::seconds(token.expires_in as i64),
    };
    let session_id = state.sessions.create(user, Some(tokens));

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::to("/")).into_response())
}

/// GET /profile - detailed profile, fetched fresh from the profile service
pub async fn profile(
    State(state): State<LoginState>,
    jar: CookieJar,
) -> Result<Response, ErrorPage> {
    let oidc = require_oidc(&state)?;

    let Some((session_id, session)) = current_session(&state, &jar) else {
        return Ok(Redirect::to("/login").into_response());
    };

    match fresh_profile(&state, oidc, &session_id, session.tokens.clone()).await {
        Some(detailed) => Ok(pages::profile(&[
            ("source", "Fresh profile from the profile service."),
            ("display_name", field(&detailed.display_name)),
            ("user_principal_name", field(&detailed.user_principal_name)),
            ("mail", field(&detailed.mail)),
            ("job_title", field(&detailed.job_title)),
            ("department", field(&detailed.department)),
            ("office_location", field(&detailed.office_location)),
        ])
        .into_response()),
        None => Ok(pages::profile(&[
            ("source", "Cached session profile; the profile service was unavailable."),
            ("display_name", field(&session.user.display_name)),
            ("user_principal_name", field(&session.user.user_principal_name)),
            ("mail", field(&session.user.mail)),
            ("job_title", "-"),
            ("department", "-"),
            ("office_location", "-"),
        ])
        .into_response()),
    }
}

/// GET /tokens - display cached tokens and their decoded claims
pub async fn tokens(State(state): State<LoginState>, jar: CookieJar) -> Result<Response, ErrorPage> {
    require_oidc(&state)?;

    let Some((_, session)) = current_session(&state, &jar) else {
        return Ok(Redirect::to("/login").into_response());
    };

    let Some(tokens) = &session.tokens else {
        return Err(ErrorPage::new(
            "No tokens are cached for this session. Sign out and sign in again.",
        ));
    };

    let id_token_claims = tokens
        .id_token
        .as_deref()
        .map(|t| decode_claims_pretty(t))
        .unwrap_or_else(|| "No ID token in the cached token set".to_string());
    let access_token_claims = decode_claims_pretty(&tokens.access_token);

    Ok(pages::tokens(&[
        ("id_token_claims", id_token_claims.as_str()),
        ("access_token_claims", access_token_claims.as_str()),
        ("id_token", tokens.id_token.as_deref().unwrap_or("-")),
        ("access_token", tokens.access_token.as_str()),
    ])
    .into_response())
}

/// GET /logout - drop the session and sign out at the authority
pub async fn logout(
    State(state): State<LoginState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());

    let target = state
        .oidc
        .as_ref()
        .and_then(|oidc| oidc.logout_url(&base_url(&state.settings, &headers)).ok())
        .unwrap_or_else(|| "/".to_string());

    (jar, Redirect::to(&target)).into_response()
}

/// GET /health - always 200, even with incomplete OAuth configuration
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn require_oidc(state: &LoginState) -> Result<&Arc<OidcClient>, ErrorPage> {
    state
        .oidc
        .as_ref()
        .ok_or_else(|| ErrorPage::missing_config(&state.settings.oauth.missing_fields()))
}

fn current_session(state: &LoginState, jar: &CookieJar) -> Option<(String, Session)> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let session = state.sessions.get(cookie.value())?;
    Some((cookie.value().to_string(), session))
}

/// ID-token claims are authoritative; the profile service is consulted only
/// when they yield no usable field at all
async fn resolve_user(oidc: &OidcClient, token: &super::TokenResponse) -> Result<UserProfile, ErrorPage> {
    let claims = token
        .id_token
        .as_deref()
        .and_then(|t| decode_unverified::<IdTokenClaims>(t).ok());

    if let Some(user) = claims.as_ref().and_then(IdTokenClaims::to_profile) {
        return Ok(user);
    }

    tracing::info!("ID token claims empty, falling back to the profile service");
    match oidc.fetch_profile(&token.access_token).await {
        Ok(profile) => Ok(profile.minimal()),
        Err(e) => {
            tracing::warn!(error = %e, "Profile-service fallback failed");
            Err(ErrorPage::new(
                "Failed to extract user information from the provider",
            ))
        }
    }
}

/// Fetch the detailed profile, refreshing an expired access token first.
/// Any upstream failure degrades to the cached session profile.
async fn fresh_profile(
    state: &LoginState,
    oidc: &OidcClient,
    session_id: &str,
    tokens: Option<TokenSet>,
) -> Option<super::ProviderProfile> {
    let mut tokens = tokens?;

    if tokens.is_expired() {
        let refresh_token = tokens.refresh_token.clone()?;
        match oidc.refresh(&refresh_token).await {
            Ok(fresh) => {
                tokens = TokenSet {
                    access_token: fresh.access_token,
                    id_token: fresh.id_token.or(tokens.id_token),
                    refresh_token: fresh.refresh_token.or(Some(refresh_token)),
                    expires_at: Utc::now() + Duration::seconds(fresh.expires_in as i64),
                };
                state.sessions.update_tokens(session_id, tokens.clone());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                return None;
            }
        }
    }

    match oidc.fetch_profile(&tokens.access_token).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!(error = %e, "Profile fetch failed, using cached session profile");
            None
        }
    }
}

fn decode_claims_pretty(token: &str) -> String {
    match decode_unverified::<serde_json::Value>(token) {
        Ok(claims) => serde_json::to_string_pretty(&claims)
            .unwrap_or_else(|_| "Failed to render claims".to_string()),
        Err(e) => format!("Failed to decode token: {e}"),
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

/// Redirect URI registered with the provider: localhost in dev, the
/// configured FQDN elsewhere; scheme follows the proxy header
fn callback_uri(settings: &Settings, headers: &HeaderMap) -> String {
    format!("{}/auth/callback", base_url(settings, headers))
}

fn base_url(settings: &Settings, headers: &HeaderMap) -> String {
    let https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
    let scheme = if https { "https" } else { "http" };

    let host = if settings.login.is_dev() {
        format!("localhost:{}", settings.login.port)
    } else {
        settings.login.custom_fqdn.clone()
    };

    format!("{scheme}://{host}")
}
