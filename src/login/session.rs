use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::claims::UserProfile;

/// Cookie carrying the opaque session id; everything else stays server-side
pub const SESSION_COOKIE: &str = "session_id";

/// Pending login states older than this are rejected
const STATE_TTL_MINUTES: i64 = 10;

/// Tokens returned by the provider, cached for the profile/tokens pages
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserProfile,
    pub tokens: Option<TokenSet>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory session store with sliding expiry.
///
/// Also tracks the pending `state` values handed out to the authorization
/// endpoint; each is single use.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    pending_states: DashMap<String, DateTime<Utc>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(timeout_minutes: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            pending_states: DashMap::new(),
            ttl: Duration::minutes(timeout_minutes as i64),
        }
    }

    /// Create a session and return its id
    pub fn create(&self, user: UserProfile, tokens: Option<TokenSet>) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.sessions.insert(
            id.clone(),
            Session {
                user,
                tokens,
                created_at: now,
                expires_at: now + self.ttl,
            },
        );

        tracing::info!(total_sessions = self.sessions.len(), "Session created");
        id
    }

    /// Look up a session, refreshing its expiry; expired sessions are
    /// dropped on access
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();

        let session = {
            let mut entry = self.sessions.get_mut(id)?;
            if now >= entry.expires_at {
                None
            } else {
                entry.expires_at = now + self.ttl;
                Some(entry.clone())
            }
        };

        if session.is_none() {
            self.sessions.remove(id);
            tracing::debug!("Session expired on access");
        }
        session
    }

    /// Replace the cached token set after a refresh
    pub fn update_tokens(&self, id: &str, tokens: TokenSet) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.tokens = Some(tokens);
                true
            }
            None => false,
        }
    }

    /// Remove a session; does nothing if it is already gone
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(total_sessions = self.sessions.len(), "Session removed");
        }
        removed
    }

    /// Drop expired sessions and stale pending states
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();

        self.sessions.retain(|_, session| session.expires_at > now);
        self.pending_states
            .retain(|_, issued_at| now - *issued_at <= Duration::minutes(STATE_TTL_MINUTES));

        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Issue a random `state` for the next authorization redirect
    pub fn issue_state(&self) -> String {
        let state = Uuid::new_v4().to_string();
        self.pending_states.insert(state.clone(), Utc::now());
        state
    }

    /// Validate and consume a returned `state`; each value works once
    pub fn consume_state(&self, state: &str) -> bool {
        match self.pending_states.remove(state) {
            Some((_, issued_at)) => Utc::now() - issued_at <= Duration::minutes(STATE_TTL_MINUTES),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            display_name: Some("Jamie Doe".into()),
            user_principal_name: Some("jamie@example.com".into()),
            mail: None,
        }
    }

    #[test]
    fn test_create_and_get_roundtrip() {
        let store = SessionStore::new(5);
        let id = store.create(profile(), None);

        let session = store.get(&id).expect("session should exist");
        assert_eq!(session.user, profile());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expired_session_dropped_on_access() {
        let store = SessionStore::new(0);
        let id = store.create(profile(), None);

        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = SessionStore::new(5);
        let id = store.create(profile(), None);

        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_update_tokens() {
        let store = SessionStore::new(5);
        let id = store.create(profile(), None);

        let tokens = TokenSet {
            access_token: "at".into(),
            id_token: None,
            refresh_token: Some("rt".into()),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(store.update_tokens(&id, tokens));
        assert!(store.get(&id).unwrap().tokens.is_some());

        assert!(!store.update_tokens("missing", TokenSet {
            access_token: "at".into(),
            id_token: None,
            refresh_token: None,
            expires_at: Utc::now(),
        }));
    }

    #[test]
    fn test_purge_expired() {
        let store = SessionStore::new(0);
        store.create(profile(), None);
        store.create(profile(), None);

        assert_eq!(store.purge_expired(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_state_is_single_use() {
        let store = SessionStore::new(5);
        let state = store.issue_state();

        assert!(store.consume_state(&state));
        assert!(!store.consume_state(&state));
        assert!(!store.consume_state("never-issued"));
    }

    #[test]
    fn test_token_set_expiry() {
        let fresh = TokenSet {
            access_token: "at".into(),
            id_token: None,
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!fresh.is_expired());

        let stale = TokenSet {
            expires_at: Utc::now() - Duration::seconds(1),
            ..fresh
        };
        assert!(stale.is_expired());
    }
}
