//! Integration tests for `SeaOrmAuthService`.
//!
//! Drives the service directly with a recording mail sender so reset codes
//! can be read back, and with zero TTLs where expiry matters.

use async_trait::async_trait;
use authgate::config::{Config, SecurityConfig};
use authgate::services::{
    AuthError, AuthService, EmailSender, ForgotPasswordInput, LoginInput, PasswordResetEmail,
    ResetPasswordInput, SignupInput, UpdateProfileInput,
};
use authgate::state::SharedState;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<PasswordResetEmail>>,
}

impl RecordingSender {
    fn last_otp(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|m| m.otp.clone())
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, message: &PasswordResetEmail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct FailingSender;

#[async_trait]
impl EmailSender for FailingSender {
    async fn send(&self, _message: &PasswordResetEmail) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay refused connection")
    }
}

struct StalledSender;

#[async_trait]
impl EmailSender for StalledSender {
    async fn send(&self, _message: &PasswordResetEmail) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("authgate-service-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 64,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
    };
    config
}

async fn build(config: Config, mailer: Arc<dyn EmailSender>) -> SharedState {
    SharedState::with_mailer(config, mailer)
        .await
        .expect("Failed to create shared state")
}

async fn recording_state(config: Config) -> (SharedState, Arc<RecordingSender>) {
    let sender = Arc::new(RecordingSender::default());
    let state = build(config, sender.clone() as Arc<dyn EmailSender>).await;
    (state, sender)
}

fn signup_input(email: &str, password: &str) -> SignupInput {
    SignupInput {
        first_name: "Ann".to_string(),
        last_name: "Lee".to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn login_input(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.to_string(),
        password: password.to_string(),
        device_name: None,
    }
}

fn reset_input(email: &str, otp: &str, password: &str) -> ResetPasswordInput {
    ResetPasswordInput {
        email: email.to_string(),
        otp: otp.to_string(),
        password: password.to_string(),
        password_confirmation: password.to_string(),
    }
}

async fn forgot(auth: &Arc<dyn AuthService>, email: &str) {
    auth.forgot_password(ForgotPasswordInput {
        email: email.to_string(),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_signup_normalizes_email_and_issues_token() {
    let (state, _) = recording_state(test_config()).await;
    let session = state
        .auth_service
        .signup(signup_input("  Ann@X.com ", "password123"))
        .await
        .unwrap();

    assert_eq!(session.user.email, "ann@x.com");
    assert_eq!(session.user.name, "Ann Lee");
    assert_eq!(session.token.len(), 64);
    assert_eq!(session.token_type, "Bearer");
    assert!(session.expires_at.is_some());

    let ctx = state.auth_service.authenticate(&session.token).await.unwrap();
    assert_eq!(ctx.user.id, session.user.id);
    assert_eq!(ctx.token.name, "auth_token");
    assert!(ctx.token.last_used_at.is_some());
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let (state, _) = recording_state(test_config()).await;
    let err = state
        .auth_service
        .signup(SignupInput {
            first_name: "   ".to_string(),
            last_name: "x".repeat(256),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        })
        .await
        .unwrap_err();

    let AuthError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(errors.has("firstName"));
    assert!(errors.has("lastName"));
    assert!(errors.has("email"));
    assert!(errors.has("password"));
}

#[tokio::test]
async fn test_duplicate_signup_leaves_one_user() {
    let (state, _) = recording_state(test_config()).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let err = state
        .auth_service
        .signup(signup_input("ANN@x.com", "password456"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::DuplicateEmail));
    assert_eq!(state.store.count_users_with_email("ann@x.com").await.unwrap(), 1);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (state, _) = recording_state(test_config()).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let unknown = state
        .auth_service
        .login(login_input("ghost@x.com", "password123"))
        .await
        .unwrap_err();
    let wrong = state
        .auth_service
        .login(login_input("ann@x.com", "password999"))
        .await
        .unwrap_err();

    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn test_login_uses_device_name_as_label() {
    let (state, _) = recording_state(test_config()).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let session = state
        .auth_service
        .login(LoginInput {
            email: "Ann@x.com".to_string(),
            password: "password123".to_string(),
            device_name: Some("work laptop".to_string()),
        })
        .await
        .unwrap();

    let ctx = state.auth_service.authenticate(&session.token).await.unwrap();
    assert_eq!(ctx.token.name, "work laptop");
}

#[tokio::test]
async fn test_forgot_password_stores_only_hash() {
    let (state, sender) = recording_state(test_config()).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    forgot(&state.auth_service, "ann@x.com").await;

    let otp = sender.last_otp().expect("reset code was not sent");
    assert_eq!(otp.len(), 6);
    assert!(otp.chars().all(|c| c.is_ascii_digit()));

    let records = state.store.list_otps_for_email("ann@x.com").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_ne!(records[0].otp_hash, otp);
    assert!(records[0].otp_hash.starts_with("$argon2id$"));

    let message = sender.sent.lock().unwrap().last().cloned().unwrap();
    assert_eq!(message.to_email, "ann@x.com");
    assert_eq!(message.first_name, "Ann");
    assert_eq!(message.ttl_minutes, 10);
}

#[tokio::test]
async fn test_forgot_password_unknown_email_is_silent() {
    let (state, sender) = recording_state(test_config()).await;

    forgot(&state.auth_service, "ghost@x.com").await;

    assert_eq!(sender.count(), 0);
    assert!(state.store.list_otps_for_email("ghost@x.com").await.unwrap().is_empty());

    let err = state
        .auth_service
        .forgot_password(ForgotPasswordInput {
            email: "nope".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

#[tokio::test]
async fn test_reissue_invalidates_earlier_code() {
    let (state, sender) = recording_state(test_config()).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    forgot(&state.auth_service, "ann@x.com").await;
    let first = sender.last_otp().unwrap();
    forgot(&state.auth_service, "ann@x.com").await;
    let second = sender.last_otp().unwrap();

    assert_eq!(state.store.list_otps_for_email("ann@x.com").await.unwrap().len(), 1);

    if first != second {
        let err = state
            .auth_service
            .reset_password(reset_input("ann@x.com", &first, "brandnew456"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOtp));
    }

    state
        .auth_service
        .reset_password(reset_input("ann@x.com", &second, "brandnew456"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reset_password_revokes_all_tokens() {
    let (state, sender) = recording_state(test_config()).await;
    let signup = state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();
    let login = state
        .auth_service
        .login(login_input("ann@x.com", "password123"))
        .await
        .unwrap();

    forgot(&state.auth_service, "ann@x.com").await;
    let otp = sender.last_otp().unwrap();
    state
        .auth_service
        .reset_password(reset_input("ann@x.com", &otp, "brandnew456"))
        .await
        .unwrap();

    for token in [&signup.token, &login.token] {
        let err = state.auth_service.authenticate(token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    assert!(state.store.list_otps_for_email("ann@x.com").await.unwrap().is_empty());

    let old = state
        .auth_service
        .login(login_input("ann@x.com", "password123"))
        .await;
    assert!(matches!(old, Err(AuthError::InvalidCredentials)));
    state
        .auth_service
        .login(login_input("ann@x.com", "brandnew456"))
        .await
        .unwrap();

    // A consumed code cannot be replayed
    let replay = state
        .auth_service
        .reset_password(reset_input("ann@x.com", &otp, "another789x"))
        .await
        .unwrap_err();
    assert!(matches!(replay, AuthError::OtpExpiredOrMissing));
}

#[tokio::test]
async fn test_reset_password_validation() {
    let (state, _) = recording_state(test_config()).await;
    let err = state
        .auth_service
        .reset_password(ResetPasswordInput {
            email: "ann@x.com".to_string(),
            otp: "12345".to_string(),
            password: "brandnew456".to_string(),
            password_confirmation: "brandnew457".to_string(),
        })
        .await
        .unwrap_err();

    let AuthError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(errors.has("otp"));
    assert_eq!(
        errors.get("password").unwrap(),
        ["The password confirmation does not match.".to_string()]
    );
}

#[tokio::test]
async fn test_reset_without_code_is_expired_or_missing() {
    let (state, _) = recording_state(test_config()).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let err = state
        .auth_service
        .reset_password(reset_input("ann@x.com", "123456", "brandnew456"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::OtpExpiredOrMissing));
}

#[tokio::test]
async fn test_expired_code_is_swept() {
    let mut config = test_config();
    config.auth.otp_ttl_minutes = 0;
    let (state, sender) = recording_state(config).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    forgot(&state.auth_service, "ann@x.com").await;
    let otp = sender.last_otp().unwrap();

    let err = state
        .auth_service
        .reset_password(reset_input("ann@x.com", &otp, "brandnew456"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::OtpExpiredOrMissing));
    assert!(state.store.list_otps_for_email("ann@x.com").await.unwrap().is_empty());
    state
        .auth_service
        .login(login_input("ann@x.com", "password123"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delivery_failure_does_not_change_outcome() {
    let state = build(test_config(), Arc::new(FailingSender)).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    forgot(&state.auth_service, "ann@x.com").await;
    assert_eq!(state.store.list_otps_for_email("ann@x.com").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delivery_timeout_does_not_change_outcome() {
    let mut config = test_config();
    config.auth.email_delivery_timeout_seconds = 1;
    let state = build(config, Arc::new(StalledSender)).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    forgot(&state.auth_service, "ann@x.com").await;
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_expired_token_is_rejected_with_expiry() {
    let mut config = test_config();
    config.auth.token_ttl_minutes = 0;
    let (state, _) = recording_state(config).await;
    let session = state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let err = state
        .auth_service
        .authenticate(&session.token)
        .await
        .unwrap_err();
    let AuthError::ExpiredToken { expires_at } = err else {
        panic!("expected expired token, got {err:?}");
    };
    assert_eq!(Some(expires_at), session.expires_at);
}

#[tokio::test]
async fn test_logout_revokes_only_current_token() {
    let (state, _) = recording_state(test_config()).await;
    let first = state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();
    let second = state
        .auth_service
        .login(login_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let ctx = state.auth_service.authenticate(&first.token).await.unwrap();
    state.auth_service.logout(&ctx).await.unwrap();

    assert!(matches!(
        state.auth_service.authenticate(&first.token).await,
        Err(AuthError::InvalidToken)
    ));
    assert!(state.auth_service.authenticate(&second.token).await.is_ok());
}

#[tokio::test]
async fn test_update_profile_only_touches_supplied_fields() {
    let (state, _) = recording_state(test_config()).await;
    let session = state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();
    let ctx = state.auth_service.authenticate(&session.token).await.unwrap();

    let user = state
        .auth_service
        .update_profile(
            &ctx,
            UpdateProfileInput {
                first_name: Some(" Anna ".to_string()),
                last_name: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(user.first_name, "Anna");
    assert_eq!(user.last_name, "Lee");
    assert_eq!(user.name, "Anna Lee");

    let err = state
        .auth_service
        .update_profile(
            &ctx,
            UpdateProfileInput {
                first_name: None,
                last_name: Some(String::new()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let profile = state.auth_service.get_profile(&ctx).await.unwrap();
    assert_eq!(profile.name, "Anna Lee");
}

#[tokio::test]
async fn test_prune_removes_expired_tokens() {
    let mut config = test_config();
    config.auth.token_ttl_minutes = 0;
    let (state, _) = recording_state(config).await;
    state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap();

    let pruned = state.tokens.prune_expired(chrono::Utc::now()).await.unwrap();
    assert_eq!(pruned, 1);
}

#[tokio::test]
async fn test_unrepresentable_token_expiry_is_an_error() {
    let mut config = test_config();
    config.auth.token_ttl_minutes = 10_000_000_000_000;
    let (state, _) = recording_state(config).await;

    let err = state
        .auth_service
        .signup(signup_input("ann@x.com", "password123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Internal(_)));

    let err = state
        .auth_service
        .login(login_input("ann@x.com", "password123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Internal(_)));
}

#[tokio::test]
async fn test_state_hashes_timing_equalizer_at_startup() {
    let mut config = test_config();
    config.security.argon2_memory_cost_kib = 1;

    let result =
        SharedState::with_mailer(config, Arc::new(RecordingSender::default()) as Arc<dyn EmailSender>)
            .await;
    assert!(result.is_err());
}
