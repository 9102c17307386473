/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. The `typ` claim keeps
/// one kind from being accepted where the other is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access or refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived, authorizes individual API calls
    Access,
    /// Long-lived, only mints new access tokens
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Unique token identifier, the revocation key
    pub jti: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn new(
        subject: &str,
        token_type: TokenType,
        issued_at: i64,
        ttl_seconds: i64,
        issuer: &str,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
            iat: issued_at,
            exp: issued_at + ttl_seconds,
            iss: issuer.to_string(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// A token is live on `[iat, exp)`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    pub fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(self.exp, 0).unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }
}
