/// Process-local stores.
///
/// Used for local runs and the integration tests. Each map sits behind
/// a single lock, so uniqueness checks and inserts happen in one critical
/// section and a finished revoke is visible to every later read.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{CredentialStore, NewUser, RevocationStore, RevokedToken, User};
use crate::error::DatabaseError;

fn poisoned<T>(_: PoisonError<T>) -> DatabaseError {
    DatabaseError::UnexpectedError("in-memory store lock poisoned".to_string())
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.contains_key(&user.username) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "users_username_key".to_string(),
            ));
        }
        let user = user.into_user();
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = self.users.read().map_err(poisoned)?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.username.cmp(&b.username)));
        Ok(all)
    }

    async fn delete_all_users(&self) -> Result<u64, DatabaseError> {
        let mut users = self.users.write().map_err(poisoned)?;
        let removed = users.len() as u64;
        users.clear();
        Ok(removed)
    }
}

#[derive(Default)]
pub struct InMemoryRevocationStore {
    revoked: RwLock<HashMap<String, RevokedToken>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.revoked.read().expect("revocation lock poisoned").len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn insert_revoked(&self, token: RevokedToken) -> Result<(), DatabaseError> {
        let mut revoked = self.revoked.write().map_err(poisoned)?;
        revoked.entry(token.jti.clone()).or_insert(token);
        Ok(())
    }

    async fn contains(&self, jti: &str) -> Result<bool, DatabaseError> {
        let revoked = self.revoked.read().map_err(poisoned)?;
        Ok(revoked.contains_key(jti))
    }
}
