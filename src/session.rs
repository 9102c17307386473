/// Session Controller
///
/// Drives registration, login, logout and refresh on top of the credential
/// store, the token issuer and the validator. A session is just the pair
/// of tokens handed out at login; the server keeps no per-session state
/// beyond revoked jtis.

use std::sync::Arc;

use crate::auth::{Claims, IssuedToken, PasswordHasher, RevocationRegistry, TokenIssuer, TokenType, TokenValidator};
use crate::configuration::Settings;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::store::{CredentialStore, NewUser, RevocationStore, User};
use crate::validators::{is_valid_name, is_valid_password, is_valid_role, is_valid_username};

/// Registration input as received from a client
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Access and refresh token minted for one login event
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

pub struct SessionController {
    credentials: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    hasher: PasswordHasher,
}

impl SessionController {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
        validator: TokenValidator,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            credentials,
            issuer,
            validator,
            hasher,
        }
    }

    /// Wire a controller from settings and the two stores.
    pub fn build(
        settings: &Settings,
        credentials: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        let registry = RevocationRegistry::new(revocations);
        Self::new(
            credentials,
            TokenIssuer::new(&settings.jwt),
            TokenValidator::new(&settings.jwt, registry),
            PasswordHasher::new(settings.application.hash_cost),
        )
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Create a user and log them straight in.
    ///
    /// # Errors
    /// - `ValidationError` for blank or malformed fields
    /// - `UserExists` if the username is taken (exact match)
    pub async fn register(&self, registration: Registration) -> Result<Session, AppError> {
        let username = is_valid_username(&registration.username)?;
        let password = is_valid_password(&registration.password)?;
        let role = is_valid_role(registration.role.as_deref())?;
        let first_name = is_valid_name("firstName", registration.first_name.as_deref())?;
        let last_name = is_valid_name("lastName", registration.last_name.as_deref())?;

        let password_hash = self.hasher.hash(password).await?;

        let user = self
            .credentials
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
                first_name,
                last_name,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    AppError::Auth(AuthError::UserExists(username.to_string()))
                }
                other => AppError::Database(other),
            })?;

        let tokens = self.issue_pair(&user.username)?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(Session { user, tokens })
    }

    /// Verify credentials and hand out a fresh, independent token pair.
    ///
    /// # Errors
    /// `NoSuchUser` or `BadCredentials`
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let username = is_valid_username(username)?;
        let password = is_valid_password(password)?;

        let user = match self.credentials.find_by_username(username).await? {
            Some(user) => user,
            None => {
                self.hasher.verify_absent(password).await?;
                return Err(AuthError::NoSuchUser.into());
            }
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            return Err(AuthError::BadCredentials.into());
        }

        let tokens = self.issue_pair(&user.username)?;
        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(Session { user, tokens })
    }

    /// Revoke a still-valid access token.
    pub async fn logout_access(&self, access_token: &str) -> Result<Claims, AppError> {
        self.logout(access_token, TokenType::Access).await
    }

    /// Revoke a still-valid refresh token.
    pub async fn logout_refresh(&self, refresh_token: &str) -> Result<Claims, AppError> {
        self.logout(refresh_token, TokenType::Refresh).await
    }

    async fn logout(&self, raw: &str, token_type: TokenType) -> Result<Claims, AppError> {
        let claims = self.validator.validate(raw, token_type).await?;
        self.revoke(&claims).await?;
        Ok(claims)
    }

    /// Revoke the token behind already-validated claims.
    pub async fn revoke(&self, claims: &Claims) -> Result<(), AppError> {
        self.validator
            .registry()
            .revoke(&claims.jti, claims.expires_at())
            .await?;

        tracing::info!(
            username = %claims.sub,
            token_type = %claims.token_type,
            "Session token logged out"
        );
        Ok(())
    }

    /// Mint a new access token from a live refresh token. The refresh
    /// token itself stays valid.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedToken, AppError> {
        let claims = self.validator.validate(refresh_token, TokenType::Refresh).await?;
        self.reissue_access(&claims)
    }

    /// Mint a new access token for the subject of validated refresh claims.
    pub fn reissue_access(&self, refresh_claims: &Claims) -> Result<IssuedToken, AppError> {
        let access = self.issuer.issue(&refresh_claims.sub, TokenType::Access)?;
        tracing::info!(
            username = %refresh_claims.sub,
            refresh_jti = %refresh_claims.jti,
            "Access token refreshed"
        );
        Ok(access)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.credentials.list_users().await?)
    }

    /// Remove every user. Outstanding tokens stay valid until they expire
    /// or are revoked.
    pub async fn delete_users(&self) -> Result<u64, AppError> {
        let removed = self.credentials.delete_all_users().await?;
        tracing::warn!(removed = removed, "All users deleted");
        Ok(removed)
    }

    fn issue_pair(&self, subject: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.issuer.issue(subject, TokenType::Access)?,
            refresh: self.issuer.issue(subject, TokenType::Refresh)?,
        })
    }
}
