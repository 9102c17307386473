/// JWT Token Generation
///
/// Mints HS256-signed access and refresh tokens. Issuing never touches
/// storage; a token only leaves a trace if it is later revoked.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::auth::claims::{Claims, TokenType};
use crate::configuration::JwtSettings;
use crate::error::TokenError;

/// A freshly signed token plus the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: Option<EncodingKey>,
    access_ttl: i64,
    refresh_ttl: i64,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(config: &JwtSettings) -> Self {
        let encoding_key = if config.secret.is_empty() {
            None
        } else {
            Some(EncodingKey::from_secret(config.secret.as_bytes()))
        };

        Self {
            encoding_key,
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
            issuer: config.issuer.clone(),
        }
    }

    pub fn ttl(&self, token_type: TokenType) -> i64 {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Sign a new token for an already-verified subject.
    ///
    /// # Errors
    /// `SigningError` if no signing key is configured or encoding fails
    pub fn issue(&self, subject: &str, token_type: TokenType) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, token_type, Utc::now().timestamp())
    }

    /// Same as `issue` with an explicit issue time (Unix seconds).
    pub fn issue_at(
        &self,
        subject: &str,
        token_type: TokenType,
        issued_at: i64,
    ) -> Result<IssuedToken, TokenError> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| TokenError::SigningError("signing key unavailable".to_string()))?;

        let claims = Claims::new(
            subject,
            token_type,
            issued_at,
            self.ttl(token_type),
            &self.issuer,
        );

        let token = encode(&Header::default(), &claims, key)
            .map_err(|e| TokenError::SigningError(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }
}
