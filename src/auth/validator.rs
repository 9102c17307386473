/// Token Validation
///
/// Checks run in a fixed order: signature, expiry, type, revocation.
/// Nothing inside a token (its jti included) is looked at until the
/// signature has been verified.

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::auth::claims::{Claims, TokenType};
use crate::auth::revocation::RevocationRegistry;
use crate::configuration::JwtSettings;
use crate::error::{AppError, TokenError};

#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    registry: RevocationRegistry,
}

impl TokenValidator {
    pub fn new(config: &JwtSettings, registry: RevocationRegistry) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand after the signature so the two failures
        // stay distinguishable.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[&config.issuer]);

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            registry,
        }
    }

    pub fn registry(&self) -> &RevocationRegistry {
        &self.registry
    }

    /// Accept `raw` only if it is a live token of `expected` type.
    ///
    /// # Errors
    /// - `InvalidSignature` for tampered, malformed or foreign-issuer tokens
    /// - `Expired`
    /// - `WrongTokenType`
    /// - `Revoked`
    /// - a database error if the registry cannot be reached
    pub async fn validate(&self, raw: &str, expected: TokenType) -> Result<Claims, AppError> {
        self.validate_at(raw, expected, Utc::now().timestamp()).await
    }

    /// Same as `validate` against an explicit clock reading (Unix seconds).
    pub async fn validate_at(
        &self,
        raw: &str,
        expected: TokenType,
        now: i64,
    ) -> Result<Claims, AppError> {
        let claims = self.verify_signature(raw)?;

        if claims.is_expired_at(now) {
            tracing::debug!(jti = %claims.jti, "Token expired");
            return Err(TokenError::Expired.into());
        }

        if claims.token_type != expected {
            tracing::warn!(
                jti = %claims.jti,
                expected = %expected,
                actual = %claims.token_type,
                "Token used as the wrong type"
            );
            return Err(TokenError::WrongTokenType.into());
        }

        if self.registry.is_revoked(&claims.jti).await? {
            tracing::warn!(jti = %claims.jti, sub = %claims.sub, "Revoked token presented");
            return Err(TokenError::Revoked.into());
        }

        Ok(claims)
    }

    fn verify_signature(&self, raw: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(raw, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT validation error: {}", e);
                TokenError::InvalidSignature
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenIssuer;
    use crate::store::InMemoryRevocationStore;
    use std::sync::Arc;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    fn setup() -> (TokenIssuer, TokenValidator) {
        let config = get_test_config();
        let registry = RevocationRegistry::new(Arc::new(InMemoryRevocationStore::new()));
        (TokenIssuer::new(&config), TokenValidator::new(&config, registry))
    }

    fn token_error(result: Result<Claims, AppError>) -> TokenError {
        match result {
            Err(AppError::Token(e)) => e,
            other => panic!("expected token error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fresh_token_validates_to_subject() {
        let (issuer, validator) = setup();
        let issued = issuer.issue("alice", TokenType::Access).unwrap();

        let claims = validator.validate(&issued.token, TokenType::Access).await.unwrap();
        assert_eq!(claims.subject(), "alice");
        assert_eq!(claims.jti, issued.claims.jti);
    }

    #[tokio::test]
    async fn test_garbage_is_invalid_signature() {
        let (_, validator) = setup();
        let result = validator.validate("invalid.token.here", TokenType::Access).await;
        assert_eq!(token_error(result), TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn test_tampered_token() {
        let (issuer, validator) = setup();
        let issued = issuer.issue("alice", TokenType::Access).unwrap();

        let tampered = format!("{}X", issued.token);
        let result = validator.validate(&tampered, TokenType::Access).await;
        assert_eq!(token_error(result), TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn test_foreign_secret_rejected() {
        let (_, validator) = setup();
        let mut other = get_test_config();
        other.secret = "some-other-secret-also-32-characters-long".to_string();
        let issued = TokenIssuer::new(&other).issue("alice", TokenType::Access).unwrap();

        let result = validator.validate(&issued.token, TokenType::Access).await;
        assert_eq!(token_error(result), TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn test_wrong_issuer() {
        let (_, validator) = setup();
        let mut other = get_test_config();
        other.issuer = "wrong-issuer".to_string();
        let issued = TokenIssuer::new(&other).issue("alice", TokenType::Access).unwrap();

        let result = validator.validate(&issued.token, TokenType::Access).await;
        assert_eq!(token_error(result), TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn test_expired_after_ttl() {
        let (issuer, validator) = setup();
        let now = Utc::now().timestamp();

        for token_type in [TokenType::Access, TokenType::Refresh] {
            let issued_at = now - issuer.ttl(token_type);
            let issued = issuer.issue_at("alice", token_type, issued_at).unwrap();

            let result = validator.validate_at(&issued.token, token_type, now).await;
            assert_eq!(token_error(result), TokenError::Expired);
        }
    }

    #[tokio::test]
    async fn test_tampered_expired_token_reports_signature() {
        let (issuer, validator) = setup();
        let issued = issuer.issue_at("alice", TokenType::Access, 0).unwrap();

        let tampered = format!("{}X", issued.token);
        let result = validator.validate(&tampered, TokenType::Access).await;
        assert_eq!(token_error(result), TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn test_types_are_not_interchangeable() {
        let (issuer, validator) = setup();
        let access = issuer.issue("alice", TokenType::Access).unwrap();
        let refresh = issuer.issue("alice", TokenType::Refresh).unwrap();

        let result = validator.validate(&refresh.token, TokenType::Access).await;
        assert_eq!(token_error(result), TokenError::WrongTokenType);

        let result = validator.validate(&access.token, TokenType::Refresh).await;
        assert_eq!(token_error(result), TokenError::WrongTokenType);
    }

    #[tokio::test]
    async fn test_revoked_jti_rejected() {
        let (issuer, validator) = setup();
        let access = issuer.issue("alice", TokenType::Access).unwrap();
        let refresh = issuer.issue("alice", TokenType::Refresh).unwrap();

        validator
            .registry()
            .revoke(access.jti(), access.claims.expires_at())
            .await
            .unwrap();

        let result = validator.validate(&access.token, TokenType::Access).await;
        assert_eq!(token_error(result), TokenError::Revoked);

        // The other half of the pair is untouched.
        assert!(validator.validate(&refresh.token, TokenType::Refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_racing_validation_is_seen_once_complete() {
        let (issuer, validator) = setup();
        let issued = issuer.issue("alice", TokenType::Access).unwrap();

        let revoker = {
            let validator = validator.clone();
            let issued = issued.clone();
            tokio::spawn(async move {
                validator
                    .registry()
                    .revoke(issued.jti(), issued.claims.expires_at())
                    .await
            })
        };
        revoker.await.unwrap().unwrap();

        let checks: Vec<_> = (0..16)
            .map(|_| {
                let validator = validator.clone();
                let token = issued.token.clone();
                tokio::spawn(async move { validator.validate(&token, TokenType::Access).await })
            })
            .collect();

        for check in checks {
            assert_eq!(token_error(check.await.unwrap()), TokenError::Revoked);
        }
    }
}
