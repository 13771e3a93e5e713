use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::crypto;
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] anyhow::Error),
}

pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Only the fields a profile update may touch.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }
}

#[must_use]
pub fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}").trim().to_string()
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a user. A racing insert for the same email loses on the unique
    /// index and comes back as [`UserStoreError::DuplicateEmail`].
    pub async fn create(
        &self,
        new_user: NewUser<'_>,
        security: &SecurityConfig,
    ) -> Result<User, UserStoreError> {
        if self.get_by_email(new_user.email).await?.is_some() {
            return Err(UserStoreError::DuplicateEmail);
        }

        let password_hash = crypto::hash_secret_blocking(new_user.password, security).await?;
        let now = Utc::now();

        let active = users::ActiveModel {
            first_name: Set(new_user.first_name.to_string()),
            last_name: Set(new_user.last_name.to_string()),
            name: Set(display_name(new_user.first_name, new_user.last_name)),
            email: Set(new_user.email.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(User::from(model)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(UserStoreError::DuplicateEmail)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Get user by (already normalized) email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbErr> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await?;

        Ok(user.map(User::from))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>, DbErr> {
        let user = users::Entity::find_by_id(id).one(&self.conn).await?;

        Ok(user.map(User::from))
    }

    /// Verify password for a user
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, user_id: i32, password: &str) -> Result<bool> {
        let Some(user) = users::Entity::find_by_id(user_id).one(&self.conn).await? else {
            return Ok(false);
        };

        crypto::verify_secret_blocking(&user.password_hash, password).await
    }

    /// Apply first/last name changes and recompute the display name
    pub async fn update_profile(&self, user_id: i32, changes: ProfileChanges) -> Result<User> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        if changes.is_empty() {
            return Ok(User::from(user));
        }

        let first_name = changes.first_name.unwrap_or_else(|| user.first_name.clone());
        let last_name = changes.last_name.unwrap_or_else(|| user.last_name.clone());
        let name = display_name(&first_name, &last_name);

        let mut active: users::ActiveModel = user.into();
        active.first_name = Set(first_name);
        active.last_name = Set(last_name);
        active.name = Set(name);
        active.updated_at = Set(Utc::now());
        let model = active.update(&self.conn).await?;

        Ok(User::from(model))
    }

    /// Replace the password hash. Existing tokens are left alone.
    pub async fn set_password(
        &self,
        user_id: i32,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let new_hash = crypto::hash_secret_blocking(new_password, security).await?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Raw stored hash, for tests and diagnostics only.
    pub async fn password_hash(&self, user_id: i32) -> Result<Option<String>, DbErr> {
        let user = users::Entity::find_by_id(user_id).one(&self.conn).await?;
        Ok(user.map(|u| u.password_hash))
    }

    pub async fn count_by_email(&self, email: &str) -> Result<u64, DbErr> {
        use sea_orm::PaginatorTrait;

        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Ann", "Lee"), "Ann Lee");
        assert_eq!(display_name("Ann", ""), "Ann");
    }

    #[test]
    fn test_profile_changes_is_empty() {
        assert!(ProfileChanges::default().is_empty());
        assert!(
            !ProfileChanges {
                first_name: Some("A".to_string()),
                last_name: None,
            }
            .is_empty()
        );
    }
}
