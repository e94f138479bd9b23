//! # Token Pair
//!
//! Access/refresh token pair issued by login, registration and refresh.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Token Lifecycle                                  │
//! │                                                                         │
//! │   login / register ──► TokenPair ──► persisted (key-value store)        │
//! │                            │                                            │
//! │                            │  401 TOKEN_EXPIRED                         │
//! │                            ▼                                            │
//! │                  refresh (single refresher) ──► new TokenPair           │
//! │                            │                    (both tokens replaced)  │
//! │                            │  refresh failed                            │
//! │                            ▼                                            │
//! │                  cleared (memory + storage) ──► SESSION_EXPIRED         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiry timestamps are advisory. The server decides when a token is
//! expired; the client only uses them for logging and for callers that want
//! to refresh proactively.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Access and refresh token, replaced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_expires_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    /// Creates a pair, reading expiries from the tokens' `exp` claims when
    /// they are JWTs.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        let access_token = access_token.into();
        let refresh_token = refresh_token.into();
        TokenPair {
            access_expires_at: jwt_expiry(&access_token),
            refresh_expires_at: jwt_expiry(&refresh_token),
            access_token,
            refresh_token,
        }
    }

    /// Overrides expiries with explicit lifetimes (seconds from now), as
    /// reported by the auth server.
    pub fn with_expiry(mut self, access_secs: Option<i64>, refresh_secs: Option<i64>) -> Self {
        let now = Utc::now();
        if let Some(secs) = access_secs {
            self.access_expires_at = Some(now + Duration::seconds(secs));
        }
        if let Some(secs) = refresh_secs {
            self.refresh_expires_at = Some(now + Duration::seconds(secs));
        }
        self
    }

    /// True once the access token's known expiry has passed.
    pub fn is_access_expired(&self) -> bool {
        self.access_expires_at
            .map(|at| Utc::now() >= at)
            .unwrap_or(false)
    }

    /// True if the access token expires within `margin`.
    pub fn needs_refresh(&self, margin: Duration) -> bool {
        self.access_expires_at
            .map(|at| Utc::now() + margin >= at)
            .unwrap_or(false)
    }

    /// True once the refresh token's known expiry has passed.
    pub fn is_refresh_expired(&self) -> bool {
        self.refresh_expires_at
            .map(|at| Utc::now() >= at)
            .unwrap_or(false)
    }

    /// Seconds until the access token expires (0 if expired, None if unknown).
    pub fn remaining_secs(&self) -> Option<i64> {
        self.access_expires_at
            .map(|at| (at - Utc::now()).num_seconds().max(0))
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Reads the `exp` claim of a JWT without verifying its signature.
///
/// Returns None for opaque (non-JWT) tokens.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    Utc.timestamp_opt(data.claims.exp?, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn jwt_with_exp(exp: i64) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": "user-1", "exp": exp }),
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_reads_exp_claim() {
        let exp = Utc::now().timestamp() + 900;
        let pair = TokenPair::new(jwt_with_exp(exp), jwt_with_exp(exp + 86_400));

        assert_eq!(pair.access_expires_at.unwrap().timestamp(), exp);
        assert_eq!(pair.refresh_expires_at.unwrap().timestamp(), exp + 86_400);
        assert!(!pair.is_access_expired());
        assert!(pair.needs_refresh(Duration::minutes(20)));
        assert!(!pair.needs_refresh(Duration::minutes(5)));
    }

    #[test]
    fn test_expired_jwt_still_decodes() {
        let exp = Utc::now().timestamp() - 60;
        let pair = TokenPair::new(jwt_with_exp(exp), "opaque-refresh");

        assert!(pair.is_access_expired());
        assert_eq!(pair.remaining_secs(), Some(0));
        assert!(pair.refresh_expires_at.is_none());
    }

    #[test]
    fn test_opaque_tokens_have_no_expiry() {
        let pair = TokenPair::new("access", "refresh");
        assert!(pair.access_expires_at.is_none());
        assert!(!pair.is_access_expired());
        assert_eq!(pair.remaining_secs(), None);
    }

    #[test]
    fn test_explicit_expiry_wins() {
        let pair = TokenPair::new("access", "refresh").with_expiry(Some(60), Some(3600));
        let remaining = pair.remaining_secs().unwrap();
        assert!(remaining > 50 && remaining <= 60);
        assert!(!pair.is_refresh_expired());
    }

    #[test]
    fn test_serde_camel_case() {
        let value = serde_json::to_value(TokenPair::new("a", "r")).unwrap();
        assert_eq!(value, json!({"accessToken": "a", "refreshToken": "r"}));
    }
}
