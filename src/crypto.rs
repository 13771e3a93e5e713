//! Hashing and random secret generation shared by the stores.
//!
//! Passwords and OTP codes are stored as Argon2id PHC strings. Bearer tokens
//! are long random values, so a plain SHA-256 digest is enough for the lookup
//! column and lets the validator find a token with a single indexed query.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::task;

use crate::config::SecurityConfig;
use crate::constants::auth::{OTP_LENGTH, TOKEN_BYTES, TOKEN_LOG_PREFIX};

/// Hash a secret using Argon2id with the configured params.
pub fn hash_secret(secret: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    Ok(hash.to_string())
}

/// Constant-time check of `candidate` against a PHC hash string.
/// The params are read back from the hash itself.
pub fn verify_secret(hash: &str, candidate: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Argon2 on a blocking thread; it is CPU-bound and would stall the runtime.
pub async fn hash_secret_blocking(secret: &str, config: &SecurityConfig) -> Result<String> {
    let secret = secret.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_secret(&secret, &config))
        .await
        .context("Hashing task panicked")?
}

pub async fn verify_secret_blocking(hash: &str, candidate: &str) -> Result<bool> {
    let hash = hash.to_string();
    let candidate = candidate.to_string();
    task::spawn_blocking(move || verify_secret(&hash, &candidate))
        .await
        .context("Verification task panicked")?
}

/// Generate a random bearer token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rng.random();
    hex::encode(bytes)
}

/// Lookup representation of a bearer token.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Uniform six digit code, zero padded.
#[must_use]
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:0width$}", width = OTP_LENGTH)
}

/// Token prefix safe to put in a log line.
#[must_use]
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_LOG_PREFIX).collect();
    format!("{prefix}...")
}
