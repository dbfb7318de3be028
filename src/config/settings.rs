use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub echo: EchoConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_ws_port")]
    pub port: u16,
    /// Heartbeat interval in seconds (server broadcasts a periodic update)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EchoConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_echo_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_login_port")]
    pub port: u16,
    /// "dev" builds redirect URIs against localhost; anything else uses
    /// `custom_fqdn`.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_custom_fqdn")]
    pub custom_fqdn: String,
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Base authority URL, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: Option<String>,
    /// Space-separated resource scopes requested on top of the OpenID set.
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
}

impl LoginConfig {
    pub fn is_dev(&self) -> bool {
        self.environment == "dev"
    }
}

impl OAuthConfig {
    /// Names of the settings that must be present before the sign-in flow
    /// can work. The services still start without them; the login pages
    /// report the gap instead.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.tenant_id.is_none() {
            missing.push("oauth.tenant_id");
        }
        if self.client_id.is_none() {
            missing.push("oauth.client_id");
        }
        if self.client_secret.is_none() {
            missing.push("oauth.client_secret");
        }
        if self.authority.is_none() {
            missing.push("oauth.authority");
        }
        missing
    }

    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn scope_list(&self) -> Vec<&str> {
        self.scopes.split_whitespace().collect()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_ws_port() -> u16 {
    8000
}

fn default_echo_port() -> u16 {
    8080
}

fn default_login_port() -> u16 {
    5000
}

fn default_heartbeat_interval() -> u64 {
    30 // 30 seconds
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_custom_fqdn() -> String {
    "localhost".to_string()
}

fn default_session_timeout() -> u64 {
    5 // minutes
}

fn default_scopes() -> String {
    "User.Read".to_string()
}

fn default_profile_url() -> String {
    "https://graph.microsoft.com/v1.0/me".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("websocket.host", "0.0.0.0")?
            .set_default("websocket.port", 8000)?
            .set_default("websocket.heartbeat_interval", 30)?
            .set_default("echo.host", "0.0.0.0")?
            .set_default("echo.port", 8080)?
            .set_default("login.host", "0.0.0.0")?
            .set_default("login.port", 5000)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // WEBSOCKET__PORT, OAUTH__CLIENT_ID, LOGIN__SESSION_TIMEOUT_MINUTES, etc.
            // (double underscore so keys like client_id survive the split)
            .add_source(Environment::default().separator("__").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.websocket.host, self.websocket.port)
    }

    pub fn echo_addr(&self) -> String {
        format!("{}:{}", self.echo.host, self.echo.port)
    }

    pub fn login_addr(&self) -> String {
        format!("{}:{}", self.login.host, self.login.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            websocket: WebSocketConfig::default(),
            echo: EchoConfig::default(),
            login: LoginConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_ws_port(),
            heartbeat_interval: default_heartbeat_interval(),
        }
    }
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_echo_port(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority: None,
            scopes: default_scopes(),
            profile_url: default_profile_url(),
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_login_port(),
            environment: default_environment(),
            custom_fqdn: default_custom_fqdn(),
            session_timeout_minutes: default_session_timeout(),
        }
    }
}
