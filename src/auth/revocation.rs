/// Revocation Registry
///
/// The single answer to "is this token dead". Every call goes straight to
/// the backing store; nothing is cached in-process, since a stale "not
/// revoked" would let a logged-out token back in.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::DatabaseError;
use crate::store::{RevocationStore, RevokedToken};

#[derive(Clone)]
pub struct RevocationRegistry {
    store: Arc<dyn RevocationStore>,
}

impl RevocationRegistry {
    pub fn new(store: Arc<dyn RevocationStore>) -> Self {
        Self { store }
    }

    /// Mark a jti as revoked. Revoking an already-revoked jti succeeds
    /// without changing anything.
    ///
    /// `expires_at` is the token's own expiry, kept so old rows can be
    /// pruned once the token could no longer validate anyway.
    pub async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.store
            .insert_revoked(RevokedToken {
                jti: jti.to_string(),
                revoked_at: Utc::now(),
                expires_at,
            })
            .await?;

        tracing::info!(jti = %jti, expires_at = %expires_at, "Token revoked");
        Ok(())
    }

    pub async fn is_revoked(&self, jti: &str) -> Result<bool, DatabaseError> {
        self.store.contains(jti).await
    }
}
