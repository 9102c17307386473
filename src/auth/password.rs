/// Password Hashing and Verification
///
/// bcrypt is CPU-bound, so both directions run on the blocking pool
/// instead of stalling an actix worker.

use std::sync::{Arc, OnceLock};

use bcrypt::{hash, verify};

use crate::error::AppError;

/// Stand-in secret for the hash that unknown usernames are checked against
const ABSENT_USER_PASSWORD: &str = "tokenkeeper-absent-user";

#[derive(Clone, Debug)]
pub struct PasswordHasher {
    cost: u32,
    // Hashed at `cost` on first use so a miss pays the same verify as a hit.
    absent_hash: Arc<OnceLock<String>>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            absent_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Hash a plain-text password.
    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let cost = self.cost;
        let password = password.to_owned();
        run_blocking(move || {
            hash(password, cost)
                .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
        })
        .await
    }

    /// Check a plain-text password against a stored hash.
    pub async fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        run_blocking(move || {
            verify(password, &password_hash)
                .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
        })
        .await
    }

    /// Burn one verification for a user that does not exist, so a lookup
    /// miss takes as long as a wrong password. Always `false`.
    pub async fn verify_absent(&self, password: &str) -> Result<bool, AppError> {
        let cost = self.cost;
        let password = password.to_owned();
        let absent_hash = self.absent_hash.clone();
        run_blocking(move || {
            let stored = match absent_hash.get() {
                Some(stored) => stored,
                None => {
                    let fresh = hash(ABSENT_USER_PASSWORD, cost).map_err(|e| {
                        AppError::Internal(format!("Password hashing failed: {}", e))
                    })?;
                    absent_hash.get_or_init(|| fresh)
                }
            };
            let _ = verify(password, stored);
            Ok(false)
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Password task failed: {}", e)))?
}
