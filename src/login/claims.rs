use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use jsonwebtoken::{DecodingKey, Validation};

use crate::error::Result;

/// Profile-bearing claims of an OIDC ID token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Login identifier (v2.0 tokens)
    #[serde(default)]
    pub preferred_username: Option<String>,
    /// Login identifier (v1.0 tokens)
    #[serde(default)]
    pub upn: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    /// Everything else the provider put in the token
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The minimal profile kept in the server-side session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.user_principal_name.is_none() && self.mail.is_none()
    }

    /// Best human-readable label for log lines and page headers
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.user_principal_name.as_deref())
            .or(self.mail.as_deref())
            .unwrap_or("unknown user")
    }
}

impl IdTokenClaims {
    /// Collapse the claims into the session profile.
    ///
    /// `None` when no usable field is present at all; the caller then falls
    /// back to the profile service.
    pub fn to_profile(&self) -> Option<UserProfile> {
        let profile = UserProfile {
            display_name: self.name.clone(),
            user_principal_name: self
                .preferred_username
                .clone()
                .or_else(|| self.upn.clone()),
            mail: self.email.clone().or_else(|| self.mail.clone()),
        };

        if profile.is_empty() {
            None
        } else {
            Some(profile)
        }
    }
}

/// Decode a JWT payload without verifying its signature.
///
/// This is display/demo plumbing only: the tokens come straight from the
/// provider over TLS and are never used to authorize anything locally.
pub fn decode_unverified<T: serde::de::DeserializeOwned>(token: &str) -> Result<T> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(claims: &serde_json::Value) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(b"test")).unwrap()
    }

    #[test]
    fn test_decode_unverified_reads_payload() {
        let token = token_for(&serde_json::json!({
            "name": "Jamie Doe",
            "preferred_username": "jamie@example.com",
            "tid": "tenant-1"
        }));

        let claims: IdTokenClaims = decode_unverified(&token).unwrap();
        assert_eq!(claims.name.as_deref(), Some("Jamie Doe"));
        assert_eq!(claims.preferred_username.as_deref(), Some("jamie@example.com"));
        assert_eq!(claims.extra["tid"], "tenant-1");
    }

    #[test]
    fn test_decode_unverified_rejects_garbage() {
        assert!(decode_unverified::<IdTokenClaims>("not-a-token").is_err());
    }

    #[test]
    fn test_profile_prefers_v2_fields() {
        let claims = IdTokenClaims {
            name: Some("Jamie Doe".into()),
            preferred_username: Some("jamie@example.com".into()),
            upn: Some("legacy@example.com".into()),
            email: Some("jamie@example.com".into()),
            mail: None,
            extra: HashMap::new(),
        };

        let profile = claims.to_profile().unwrap();
        assert_eq!(profile.user_principal_name.as_deref(), Some("jamie@example.com"));
        assert_eq!(profile.mail.as_deref(), Some("jamie@example.com"));
    }

    #[test]
    fn test_profile_falls_back_to_v1_fields() {
        let claims = IdTokenClaims {
            name: None,
            preferred_username: None,
            upn: Some("legacy@example.com".into()),
            email: None,
            mail: Some("legacy@example.com".into()),
            extra: HashMap::new(),
        };

        let profile = claims.to_profile().unwrap();
        assert_eq!(profile.user_principal_name.as_deref(), Some("legacy@example.com"));
        assert_eq!(profile.mail.as_deref(), Some("legacy@example.com"));
    }

    #[test]
    fn test_profile_absent_when_no_fields() {
        let claims = IdTokenClaims {
            name: None,
            preferred_username: None,
            upn: None,
            email: None,
            mail: None,
            extra: HashMap::new(),
        };
        assert!(claims.to_profile().is_none());
    }

    #[test]
    fn test_label() {
        let profile = UserProfile {
            display_name: None,
            user_principal_name: Some("jamie@example.com".into()),
            mail: None,
        };
        assert_eq!(profile.label(), "jamie@example.com");

        let empty = UserProfile {
            display_name: None,
            user_principal_name: None,
            mail: None,
        };
        assert_eq!(empty.label(), "unknown user");
    }
}
