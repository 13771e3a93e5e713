use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::auth_tokens;

/// Stored token metadata. The plaintext never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl From<auth_tokens::Model> for TokenRecord {
    fn from(model: auth_tokens::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
            expires_at: model.expires_at,
        }
    }
}

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        user_id: i32,
        name: &str,
        token_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<TokenRecord> {
        let active = auth_tokens::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.to_string()),
            token_hash: Set(token_hash.to_string()),
            created_at: Set(created_at),
            last_used_at: Set(None),
            expires_at: Set(expires_at),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(TokenRecord::from(model))
    }

    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<TokenRecord>> {
        let token = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::TokenHash.eq(token_hash))
            .one(&self.conn)
            .await?;

        Ok(token.map(TokenRecord::from))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<TokenRecord>> {
        let tokens = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await?;

        Ok(tokens.into_iter().map(TokenRecord::from).collect())
    }

    /// No-op if the token was revoked in the meantime.
    pub async fn touch(&self, id: i32, used_at: DateTime<Utc>) -> Result<()> {
        auth_tokens::Entity::update_many()
            .col_expr(auth_tokens::Column::LastUsedAt, Expr::value(used_at))
            .filter(auth_tokens::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = auth_tokens::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn delete_for_user(&self, user_id: i32) -> Result<u64> {
        let result = auth_tokens::Entity::delete_many()
            .filter(auth_tokens::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = auth_tokens::Entity::delete_many()
            .filter(auth_tokens::Column::ExpiresAt.is_not_null())
            .filter(auth_tokens::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
