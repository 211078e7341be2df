//! Unverified token payload decoding
//!
//! Access tokens are opaque to the front end. The payload is only read to
//! schedule expiry warnings; nothing here is ever used for a trust decision.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Keys used in the persistent key-value store
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const IS_ADMIN: &str = "is_admin";
    pub const AUTH_USER: &str = "auth_user";
}

/// Best-effort view of a JWT payload
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sub: Option<Value>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Decode the payload segment of a JWT without verifying its signature
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry claim of a token, or `None` when the token cannot be decoded
pub fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token)?.expires_at()
}

/// Helpers for building unsigned tokens in tests
#[cfg(any(test, feature = "tests"))]
pub mod testing {
    use super::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};

    /// Encode `payload` as a JWT with a dummy signature
    pub fn encode_unsigned(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    /// Access token expiring at `expires_at`
    pub fn access_token_expiring_at(expires_at: DateTime<Utc>) -> String {
        encode_unsigned(&json!({
            "sub": { "role": "admin" },
            "type": "access",
            "iat": expires_at.timestamp() - 900,
            "exp": expires_at.timestamp(),
        }))
    }
}
