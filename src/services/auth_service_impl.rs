//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::auth::TOKEN_TYPE;
use crate::crypto;
use crate::db::{NewUser, ProfileChanges, Store, User};
use crate::services::auth_service::{
    AuthError, AuthService, AuthSession, ForgotPasswordInput, LoginInput, ResetPasswordInput,
    SignupInput, UpdateProfileInput, UserInfo,
};
use crate::services::mailer::{EmailSender, PasswordResetEmail};
use crate::services::otp::OtpService;
use crate::services::tokens::{AuthContext, TokenService};
use crate::services::validation::{self, FieldErrors};

const DUMMY_PASSWORD: &str = "authgate-timing-equalizer";

fn record_event(event: &'static str) {
    metrics::counter!("auth_events_total", "event" => event).increment(1);
}

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<Config>,
    tokens: TokenService,
    otps: OtpService,
    mailer: Arc<dyn EmailSender>,
    /// Hash checked on the unknown-email login path.
    dummy_hash: String,
}

impl SeaOrmAuthService {
    /// Hashes the timing equalizer up front so the first unknown-email
    /// login costs the same as every later one.
    pub async fn new(
        store: Store,
        config: Arc<Config>,
        tokens: TokenService,
        otps: OtpService,
        mailer: Arc<dyn EmailSender>,
    ) -> anyhow::Result<Self> {
        let dummy_hash = crypto::hash_secret_blocking(DUMMY_PASSWORD, &config.security).await?;

        Ok(Self {
            store,
            config,
            tokens,
            otps,
            mailer,
            dummy_hash,
        })
    }

    async fn start_session(&self, user: User, label: &str) -> Result<AuthSession, AuthError> {
        let issued = self.tokens.issue(&user, label, Utc::now()).await?;

        Ok(AuthSession {
            user: UserInfo::from(user),
            token: issued.plaintext,
            token_type: TOKEN_TYPE,
            expires_at: issued.record.expires_at,
        })
    }

    async fn equalize_timing(&self, password: &str) -> Result<(), AuthError> {
        crypto::verify_secret_blocking(&self.dummy_hash, password).await?;
        Ok(())
    }

    fn validate_email(errors: &mut FieldErrors, email: &str) {
        if validation::required(errors, "email", email).is_some() {
            validation::check_email(errors, "email", email);
        }
    }

    fn validate_name(errors: &mut FieldErrors, field: &str, value: &str) -> Option<String> {
        let trimmed = validation::required(errors, field, value)?;
        validation::check_name(errors, field, trimmed);
        Some(trimmed.to_string())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, input: SignupInput) -> Result<AuthSession, AuthError> {
        let email = validation::normalize_email(&input.email);
        let mut errors = FieldErrors::new();

        let first_name = Self::validate_name(&mut errors, "firstName", &input.first_name);
        let last_name = Self::validate_name(&mut errors, "lastName", &input.last_name);
        Self::validate_email(&mut errors, &email);
        validation::check_password(
            &mut errors,
            "password",
            &input.password,
            self.config.auth.password_min(),
        );
        errors.into_result().map_err(AuthError::Validation)?;

        let (Some(first_name), Some(last_name)) = (first_name, last_name) else {
            return Err(AuthError::Internal("name validation passed without a value".into()));
        };

        let user = match self
            .store
            .create_user(
                NewUser {
                    first_name: &first_name,
                    last_name: &last_name,
                    email: &email,
                    password: &input.password,
                },
                &self.config.security,
            )
            .await
        {
            Ok(user) => user,
            Err(err) => {
                let err = AuthError::from(err);
                if matches!(err, AuthError::DuplicateEmail) {
                    record_event("signup_duplicate");
                    info!("Signup rejected: email already registered");
                }
                return Err(err);
            }
        };

        let session = self
            .start_session(user, &self.config.auth.default_token_name)
            .await?;

        record_event("signup");
        info!(user_id = session.user.id, "User registered");
        Ok(session)
    }

    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let email = validation::normalize_email(&input.email);
        let mut errors = FieldErrors::new();

        validation::required(&mut errors, "email", &email);
        validation::required(&mut errors, "password", &input.password);
        let label = match input.device_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                validation::check_name(&mut errors, "deviceName", name);
                name.to_string()
            }
            _ => self.config.auth.default_token_name.clone(),
        };
        errors.into_result().map_err(AuthError::Validation)?;

        let Some(user) = self.store.get_user_by_email(&email).await? else {
            self.equalize_timing(&input.password).await?;
            record_event("login_failed");
            warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .store
            .verify_user_password(user.id, &input.password)
            .await?
        {
            record_event("login_failed");
            warn!(user_id = user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.start_session(user, &label).await?;

        record_event("login");
        info!(user_id = session.user.id, device = %label, "User logged in");
        Ok(session)
    }

    async fn forgot_password(&self, input: ForgotPasswordInput) -> Result<(), AuthError> {
        let email = validation::normalize_email(&input.email);
        let mut errors = FieldErrors::new();
        Self::validate_email(&mut errors, &email);
        errors.into_result().map_err(AuthError::Validation)?;

        let Some(user) = self.store.get_user_by_email(&email).await? else {
            record_event("forgot_password_unknown");
            info!("Password reset requested for unregistered email");
            return Ok(());
        };

        let (otp, expires_at) = self.otps.issue(&email, Utc::now()).await?;
        record_event("otp_issued");

        let message = PasswordResetEmail::render(
            &self.config.mail,
            &email,
            &user.first_name,
            &otp,
            self.otps.ttl().num_minutes(),
        );
        let timeout = Duration::from_secs(self.config.auth.email_delivery_timeout_seconds);

        match tokio::time::timeout(timeout, self.mailer.send(&message)).await {
            Ok(Ok(())) => {
                info!(user_id = user.id, %expires_at, "Password reset code sent");
            }
            Ok(Err(e)) => {
                record_event("otp_delivery_failed");
                warn!(user_id = user.id, error = %e, "Password reset email delivery failed");
            }
            Err(_) => {
                record_event("otp_delivery_failed");
                warn!(
                    user_id = user.id,
                    timeout_seconds = timeout.as_secs(),
                    "Password reset email delivery timed out"
                );
            }
        }

        Ok(())
    }

    async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError> {
        let email = validation::normalize_email(&input.email);
        let mut errors = FieldErrors::new();

        Self::validate_email(&mut errors, &email);
        let otp = validation::required(&mut errors, "otp", &input.otp);
        if let Some(otp) = otp {
            validation::check_otp(&mut errors, "otp", otp);
        }
        validation::check_password(
            &mut errors,
            "password",
            &input.password,
            self.config.auth.password_min(),
        );
        if !input.password.is_empty() {
            validation::check_confirmation(
                &mut errors,
                "password",
                &input.password,
                &input.password_confirmation,
            );
        }
        errors.into_result().map_err(AuthError::Validation)?;
        let otp = otp.unwrap_or_default();

        let now = Utc::now();
        let swept = self.otps.sweep_expired(&email, now).await?;
        if swept > 0 {
            debug!(swept, "Removed expired reset codes");
        }

        if self.otps.find_valid(&email, now).await?.is_empty() {
            record_event("reset_otp_missing");
            info!("Password reset rejected: no live code");
            return Err(AuthError::OtpExpiredOrMissing);
        }

        if !self.otps.verify(&email, otp, now).await? {
            record_event("reset_otp_invalid");
            warn!("Password reset rejected: code mismatch");
            return Err(AuthError::InvalidOtp);
        }

        let Some(user) = self.store.get_user_by_email(&email).await? else {
            self.otps.consume(&email).await?;
            return Err(AuthError::OtpExpiredOrMissing);
        };

        self.store
            .set_user_password(user.id, &input.password, &self.config.security)
            .await?;
        let revoked = self.tokens.revoke_all(user.id).await?;
        self.otps.consume(&email).await?;

        record_event("password_reset");
        info!(user_id = user.id, revoked_tokens = revoked, "Password reset");
        Ok(())
    }

    async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        Ok(self.tokens.validate(token, Utc::now()).await?)
    }

    async fn get_profile(&self, ctx: &AuthContext) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user_by_id(ctx.user.id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(UserInfo::from(user))
    }

    async fn update_profile(
        &self,
        ctx: &AuthContext,
        input: UpdateProfileInput,
    ) -> Result<UserInfo, AuthError> {
        let mut errors = FieldErrors::new();
        let changes = ProfileChanges {
            first_name: input
                .first_name
                .as_deref()
                .and_then(|v| Self::validate_name(&mut errors, "firstName", v)),
            last_name: input
                .last_name
                .as_deref()
                .and_then(|v| Self::validate_name(&mut errors, "lastName", v)),
        };
        errors.into_result().map_err(AuthError::Validation)?;

        let user = self
            .store
            .update_user_profile(ctx.user.id, changes)
            .await?;

        record_event("profile_updated");
        info!(user_id = user.id, "Profile updated");
        Ok(UserInfo::from(user))
    }

    async fn logout(&self, ctx: &AuthContext) -> Result<(), AuthError> {
        let removed = self.tokens.revoke(&ctx.token).await?;
        if !removed {
            debug!(token_id = ctx.token.id, "Token already gone at logout");
        }

        record_event("logout");
        info!(user_id = ctx.user.id, token_id = ctx.token.id, "User logged out");
        Ok(())
    }
}
