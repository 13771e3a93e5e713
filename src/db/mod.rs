use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::otp::OtpRecord;
pub use repositories::token::TokenRecord;
pub use repositories::user::{NewUser, ProfileChanges, User, UserStoreError};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    fn otp_repo(&self) -> repositories::otp::OtpRepository {
        repositories::otp::OtpRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(
        &self,
        new_user: NewUser<'_>,
        security: &SecurityConfig,
    ) -> Result<User, UserStoreError> {
        self.user_repo().create(new_user, security).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbErr> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>, DbErr> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_password(&self, user_id: i32, password: &str) -> Result<bool> {
        self.user_repo().verify_password(user_id, password).await
    }

    pub async fn update_user_profile(&self, user_id: i32, changes: ProfileChanges) -> Result<User> {
        self.user_repo().update_profile(user_id, changes).await
    }

    pub async fn set_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .set_password(user_id, new_password, security)
            .await
    }

    pub async fn get_user_password_hash(&self, user_id: i32) -> Result<Option<String>, DbErr> {
        self.user_repo().password_hash(user_id).await
    }

    pub async fn count_users_with_email(&self, email: &str) -> Result<u64, DbErr> {
        self.user_repo().count_by_email(email).await
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    pub async fn insert_token(
        &self,
        user_id: i32,
        name: &str,
        token_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<TokenRecord> {
        self.token_repo()
            .insert(user_id, name, token_hash, created_at, expires_at)
            .await
    }

    pub async fn find_token_by_hash(&self, token_hash: &str) -> Result<Option<TokenRecord>> {
        self.token_repo().find_by_hash(token_hash).await
    }

    pub async fn list_tokens_for_user(&self, user_id: i32) -> Result<Vec<TokenRecord>> {
        self.token_repo().list_for_user(user_id).await
    }

    pub async fn touch_token(&self, id: i32, used_at: DateTime<Utc>) -> Result<()> {
        self.token_repo().touch(id, used_at).await
    }

    pub async fn delete_token(&self, id: i32) -> Result<bool> {
        self.token_repo().delete(id).await
    }

    pub async fn delete_tokens_for_user(&self, user_id: i32) -> Result<u64> {
        self.token_repo().delete_for_user(user_id).await
    }

    pub async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        self.token_repo().delete_expired(now).await
    }

    // ========================================================================
    // Password reset OTPs
    // ========================================================================

    pub async fn replace_otp(
        &self,
        email: &str,
        otp_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord> {
        self.otp_repo()
            .replace_for_email(email, otp_hash, created_at, expires_at)
            .await
    }

    pub async fn insert_otp(
        &self,
        email: &str,
        otp_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord> {
        self.otp_repo()
            .insert(email, otp_hash, created_at, expires_at)
            .await
    }

    pub async fn list_otps_for_email(&self, email: &str) -> Result<Vec<OtpRecord>> {
        self.otp_repo().list_for_email(email).await
    }

    pub async fn delete_otps_for_email(&self, email: &str) -> Result<u64> {
        self.otp_repo().delete_for_email(email).await
    }

    pub async fn delete_otps(&self, ids: Vec<i32>) -> Result<u64> {
        self.otp_repo().delete_ids(ids).await
    }

    pub async fn delete_expired_otps(&self, now: DateTime<Utc>) -> Result<u64> {
        self.otp_repo().delete_expired(now).await
    }
}
