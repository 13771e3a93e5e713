//! Domain service for registration, login, password reset and profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{User, UserStoreError};
use crate::services::tokens::{AuthContext, TokenError};
use crate::services::validation::FieldErrors;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authorization header missing")]
    MissingCredentials,

    #[error("Authorization header malformed")]
    MalformedCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired at {expires_at}")]
    ExpiredToken { expires_at: DateTime<Utc> },

    #[error("Reset code expired or missing")]
    OtpExpiredOrMissing,

    #[error("Invalid reset code")]
    InvalidOtp,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<UserStoreError> for AuthError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotFound => Self::InvalidToken,
            TokenError::Expired { expires_at } => Self::ExpiredToken { expires_at },
            TokenError::Store(e) => Self::Internal(format!("{e:#}")),
        }
    }
}

/// User info DTO for responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Signup/login result: the user plus the only copy of the new token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: UserInfo,
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupInput {
    #[serde(alias = "first_name")]
    pub first_name: String,
    #[serde(alias = "last_name")]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// Label for the issued token.
    #[serde(alias = "device_name")]
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordInput {
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordInput {
    pub email: String,
    pub otp: String,
    pub password: String,
    #[serde(alias = "password_confirmation")]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[serde(alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(alias = "last_name")]
    pub last_name: Option<String>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a user and issues their first token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for bad input and
    /// [`AuthError::DuplicateEmail`] when the email is taken.
    async fn signup(&self, input: SignupInput) -> Result<AuthSession, AuthError>;

    /// Verifies credentials and issues a new token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email and for
    /// a wrong password alike.
    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError>;

    /// Issues a reset code and mails it if the email belongs to a user. The
    /// outcome is the same either way.
    async fn forgot_password(&self, input: ForgotPasswordInput) -> Result<(), AuthError>;

    /// Sets a new password using a reset code and revokes every token of the
    /// user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OtpExpiredOrMissing`] when no live code exists and
    /// [`AuthError::InvalidOtp`] when none matches.
    async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError>;

    /// Resolves a bearer token to its owner.
    async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError>;

    async fn get_profile(&self, ctx: &AuthContext) -> Result<UserInfo, AuthError>;

    async fn update_profile(
        &self,
        ctx: &AuthContext,
        input: UpdateProfileInput,
    ) -> Result<UserInfo, AuthError>;

    /// Revokes the token the request was made with.
    async fn logout(&self, ctx: &AuthContext) -> Result<(), AuthError>;
}
