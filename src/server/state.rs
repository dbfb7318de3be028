use std::net::{IpAddr, UdpSocket};
use std::sync::Arc;

use crate::config::Settings;
use crate::login::{OidcClient, SessionStore};
use crate::registry::ConnectionRegistry;

/// Shared state of the WebSocket demo service
#[derive(Clone)]
pub struct WsState {
    pub settings: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
}

impl WsState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }
}

/// Shared state of the header-echo service.
///
/// Hostname and local address are resolved once at startup; both are
/// diagnostic output only.
#[derive(Clone)]
pub struct EchoState {
    pub hostname: String,
    local_ip: Option<IpAddr>,
}

impl EchoState {
    pub fn new() -> Self {
        Self {
            hostname: detect_hostname(),
            local_ip: detect_local_ip(),
        }
    }

    pub fn local_ip(&self) -> String {
        self.local_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl Default for EchoState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state of the login demo service.
///
/// `oidc` is `None` when the OAuth settings are incomplete; the service
/// still serves `/health` and renders a configuration-error page elsewhere.
#[derive(Clone)]
pub struct LoginState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionStore>,
    pub oidc: Option<Arc<OidcClient>>,
}

impl LoginState {
    pub fn new(settings: Settings) -> Self {
        let oidc = if settings.oauth.is_configured() {
            match OidcClient::new(&settings.oauth) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!(error = %e, "OAuth client initialization failed, sign-in disabled");
                    None
                }
            }
        } else {
            tracing::warn!(
                missing = ?settings.oauth.missing_fields(),
                "OAuth settings incomplete, sign-in disabled"
            );
            None
        };

        let sessions = Arc::new(SessionStore::new(settings.login.session_timeout_minutes));

        Self {
            settings: Arc::new(settings),
            sessions,
            oidc,
        }
    }
}

fn detect_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/proc/sys/kernel/hostname")
                .ok()
                .map(|h| h.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Local address a default route would use; no packets are sent
fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_state_has_hostname() {
        let state = EchoState::new();
        assert!(!state.hostname.is_empty());
        assert!(!state.local_ip().is_empty());
    }

    #[test]
    fn test_login_state_without_oauth_config() {
        let state = LoginState::new(Settings::default());
        assert!(state.oidc.is_none());
        assert!(state.sessions.is_empty());
    }
}
