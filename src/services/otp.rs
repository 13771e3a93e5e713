//! One-time password reset codes.
//!
//! Only Argon2 hashes reach the database. Issuing a code supersedes every
//! earlier code for the same email; verification tries each live record and
//! accepts the first match.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::SecurityConfig;
use crate::crypto;
use crate::db::{OtpRecord, Store};

#[derive(Clone)]
pub struct OtpService {
    store: Store,
    security: SecurityConfig,
    ttl: Duration,
}

impl OtpService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig, ttl: Duration) -> Self {
        Self {
            store,
            security,
            ttl,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the plaintext code and its expiry. The plaintext is not kept.
    pub async fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>)> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("Reset code expiry out of range for ttl {}", self.ttl))?;
        let otp = crypto::generate_otp();
        let otp_hash = crypto::hash_secret_blocking(&otp, &self.security).await?;

        let record = self
            .store
            .replace_otp(email, &otp_hash, now, expires_at)
            .await?;
        debug!(otp_id = record.id, %expires_at, "Issued password reset code");

        Ok((otp, expires_at))
    }

    pub async fn find_valid(&self, email: &str, now: DateTime<Utc>) -> Result<Vec<OtpRecord>> {
        let records = self.store.list_otps_for_email(email).await?;
        Ok(records
            .into_iter()
            .filter(|record| record.is_valid_at(now))
            .collect())
    }

    pub async fn verify(&self, email: &str, candidate: &str, now: DateTime<Utc>) -> Result<bool> {
        for record in self.find_valid(email, now).await? {
            if crypto::verify_secret_blocking(&record.otp_hash, candidate).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn consume(&self, email: &str) -> Result<u64> {
        self.store.delete_otps_for_email(email).await
    }

    /// Removes this email's records whose expiry has passed.
    pub async fn sweep_expired(&self, email: &str, now: DateTime<Utc>) -> Result<u64> {
        let expired: Vec<i32> = self
            .store
            .list_otps_for_email(email)
            .await?
            .into_iter()
            .filter(|record| !record.is_valid_at(now))
            .map(|record| record.id)
            .collect();

        self.store.delete_otps(expired).await
    }

    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.store.delete_expired_otps(now).await
    }
}
