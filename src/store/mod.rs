/// Storage seams
///
/// Users and revoked token ids live behind two traits so the session
/// controller does not care whether they sit in Postgres or in memory.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;

pub use memory::{InMemoryCredentialStore, InMemoryRevocationStore};
pub use postgres::{migrate, PgCredentialStore, PgRevocationStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at registration; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl NewUser {
    pub(crate) fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            username: self.username,
            password_hash: self.password_hash,
            role: self.role,
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedToken {
    pub jti: String,
    pub revoked_at: DateTime<Utc>,
    /// Natural expiry of the revoked token
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. A taken username must come back as
    /// `DatabaseError::UniqueConstraintViolation`, decided atomically by
    /// the store itself.
    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    /// Exact, case-sensitive lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    /// Remove every user, returning how many rows went away.
    async fn delete_all_users(&self) -> Result<u64, DatabaseError>;
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record a revoked jti. Inserting an existing jti is not an error and
    /// leaves the original record untouched.
    async fn insert_revoked(&self, token: RevokedToken) -> Result<(), DatabaseError>;

    async fn contains(&self, jti: &str) -> Result<bool, DatabaseError>;
}
