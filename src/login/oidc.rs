//! Thin client for an OAuth2/OIDC authority and its profile service.
//!
//! Endpoint layout follows the Microsoft identity platform v2.0
//! (`{authority}/oauth2/v2.0/...`); the protocol itself is plain
//! authorization-code OAuth2.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::OAuthConfig;
use crate::error::{AppError, Result};

use super::claims::UserProfile;

/// Scopes every authorization request carries besides the configured ones
const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

const HTTP_TIMEOUT_SECS: u64 = 10;

pub struct OidcClient {
    http: reqwest::Client,
    authority: String,
    client_id: String,
    client_secret: String,
    /// Precomputed `scope` parameter
    scopes: String,
    profile_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// Error body the authority returns on failed token requests
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Detailed profile returned by the provider's `/me` style endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub office_location: Option<String>,
}

impl ProviderProfile {
    /// Reduce to the minimal profile kept in the session
    pub fn minimal(&self) -> UserProfile {
        UserProfile {
            display_name: self.display_name.clone(),
            user_principal_name: self.user_principal_name.clone(),
            mail: self.mail.clone(),
        }
    }
}

impl OidcClient {
    pub fn new(config: &OAuthConfig) -> Result<Self> {
        let (Some(client_id), Some(client_secret), Some(authority)) = (
            config.client_id.clone(),
            config.client_secret.clone(),
            config.authority.clone(),
        ) else {
            return Err(AppError::Internal(format!(
                "OAuth settings incomplete: {}",
                config.missing_fields().join(", ")
            )));
        };

        let authority = authority.trim_end_matches('/').to_string();
        Url::parse(&authority).map_err(|e| {
            AppError::Internal(format!("invalid oauth.authority `{authority}`: {e}"))
        })?;

        // Reserved scopes first, configured resource scopes after
        let mut scope_parts: Vec<&str> = RESERVED_SCOPES.to_vec();
        for scope in config.scope_list() {
            if !scope_parts.contains(&scope) {
                scope_parts.push(scope);
            }
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            authority,
            client_id,
            client_secret,
            scopes: scope_parts.join(" "),
            profile_url: config.profile_url.clone(),
        })
    }

    /// URL of the authority's authorization endpoint with all parameters
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/oauth2/v2.0/authorize", self.authority),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("response_mode", "query"),
                ("scope", self.scopes.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Internal(format!("failed to build authorize URL: {e}")))?;

        Ok(url.into())
    }

    /// URL of the authority's logout endpoint
    pub fn logout_url(&self, post_logout_redirect: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/oauth2/v2.0/logout", self.authority),
            &[("post_logout_redirect_uri", post_logout_redirect)],
        )
        .map_err(|e| AppError::Internal(format!("failed to build logout URL: {e}")))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let resp = self
            .http
            .post(self.token_endpoint())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("scope", self.scopes.as_str()),
            ])
            .send()
            .await?;

        read_token_response(resp).await
    }

    /// Trade a refresh token for a fresh token set; single attempt, the
    /// caller decides what a failure means
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let resp = self
            .http
            .post(self.token_endpoint())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", self.scopes.as_str()),
            ])
            .send()
            .await?;

        read_token_response(resp).await
    }

    /// Fetch the authority's OIDC discovery document
    pub async fn discovery(&self) -> Result<DiscoveryDocument> {
        let url = format!("{}/v2.0/.well-known/openid-configuration", self.authority);
        let resp = self.http.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(AppError::Discovery(format!("status {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| AppError::Discovery(format!("malformed discovery document: {e}")))
    }

    /// Fetch the signed-in user's detailed profile
    pub async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile> {
        let resp = self
            .http
            .get(&self.profile_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Profile(format!("status {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| AppError::Profile(format!("malformed profile response: {e}")))
    }

    fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }
}

async fn read_token_response(resp: reqwest::Response) -> Result<TokenResponse> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ProviderErrorBody>(&text)
            .ok()
            .map(|body| body.error_description.unwrap_or(body.error))
            .filter(|detail| !detail.is_empty())
            .unwrap_or_else(|| format!("status {status}"));
        return Err(AppError::TokenExchange(detail));
    }

    serde_json::from_str(&text)
        .map_err(|e| AppError::TokenExchange(format!("malformed token response: {e}")))
}
