use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::password_reset_otps;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub id: i32,
    pub email: String,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl From<password_reset_otps::Model> for OtpRecord {
    fn from(model: password_reset_otps::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            otp_hash: model.otp_hash,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }
}

pub struct OtpRepository {
    conn: DatabaseConnection,
}

async fn insert_on<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    otp_hash: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<OtpRecord> {
    let active = password_reset_otps::ActiveModel {
        email: Set(email.to_string()),
        otp_hash: Set(otp_hash.to_string()),
        expires_at: Set(expires_at),
        created_at: Set(created_at),
        ..Default::default()
    };
    let model = active.insert(conn).await?;
    Ok(OtpRecord::from(model))
}

impl OtpRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Adds a record without touching existing ones for the same email.
    pub async fn insert(
        &self,
        email: &str,
        otp_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord> {
        insert_on(&self.conn, email, otp_hash, created_at, expires_at).await
    }

    /// Delete every record for `email` and insert the new one in a single
    /// transaction. Two racing calls resolve last-writer-wins.
    pub async fn replace_for_email(
        &self,
        email: &str,
        otp_hash: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord> {
        let txn = self.conn.begin().await?;

        password_reset_otps::Entity::delete_many()
            .filter(password_reset_otps::Column::Email.eq(email))
            .exec(&txn)
            .await?;

        let record = insert_on(&txn, email, otp_hash, created_at, expires_at).await?;

        txn.commit().await?;

        Ok(record)
    }

    /// Newest first
    pub async fn list_for_email(&self, email: &str) -> Result<Vec<OtpRecord>> {
        let rows = password_reset_otps::Entity::find()
            .filter(password_reset_otps::Column::Email.eq(email))
            .order_by_desc(password_reset_otps::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(OtpRecord::from).collect())
    }

    pub async fn delete_for_email(&self, email: &str) -> Result<u64> {
        let result = password_reset_otps::Entity::delete_many()
            .filter(password_reset_otps::Column::Email.eq(email))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_ids(&self, ids: Vec<i32>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = password_reset_otps::Entity::delete_many()
            .filter(password_reset_otps::Column::Id.is_in(ids))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = password_reset_otps::Entity::delete_many()
            .filter(password_reset_otps::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
