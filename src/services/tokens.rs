//! Bearer token issuance and validation.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::debug;

use crate::crypto;
use crate::db::{Store, TokenRecord, User};

/// Authenticated caller attached to a request by the gate.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub token: TokenRecord,
}

/// A freshly issued token. `plaintext` is the only copy.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub plaintext: String,
    pub record: TokenRecord,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token not found")]
    NotFound,

    #[error("Token expired at {expires_at}")]
    Expired { expires_at: DateTime<Utc> },

    #[error("Token store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<sea_orm::DbErr> for TokenError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Store(err.into())
    }
}

#[derive(Clone)]
pub struct TokenService {
    store: Store,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub const fn new(store: Store, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn issue(&self, user: &User, label: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("Token expiry out of range for ttl {}", self.ttl))?;
        let plaintext = crypto::generate_token();
        let digest = crypto::token_digest(&plaintext);

        let record = self
            .store
            .insert_token(user.id, label, &digest, now, Some(expires_at))
            .await?;
        debug!(
            user_id = user.id,
            token_id = record.id,
            token = %crypto::redact_token(&plaintext),
            "Issued token"
        );

        Ok(IssuedToken { plaintext, record })
    }

    pub async fn validate(&self, plaintext: &str, now: DateTime<Utc>) -> Result<AuthContext, TokenError> {
        let digest = crypto::token_digest(plaintext);

        let Some(token) = self.store.find_token_by_hash(&digest).await? else {
            return Err(TokenError::NotFound);
        };

        if let Some(expires_at) = token.expires_at.filter(|_| token.is_expired_at(now)) {
            return Err(TokenError::Expired { expires_at });
        }

        let Some(user) = self.store.get_user_by_id(token.user_id).await? else {
            return Err(TokenError::NotFound);
        };

        self.store.touch_token(token.id, now).await?;
        let token = TokenRecord {
            last_used_at: Some(now),
            ..token
        };

        Ok(AuthContext { user, token })
    }

    /// Returns whether the token still existed.
    pub async fn revoke(&self, token: &TokenRecord) -> Result<bool> {
        self.store.delete_token(token.id).await
    }

    pub async fn revoke_all(&self, user_id: i32) -> Result<u64> {
        self.store.delete_tokens_for_user(user_id).await
    }

    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.store.delete_expired_tokens(now).await
    }
}
