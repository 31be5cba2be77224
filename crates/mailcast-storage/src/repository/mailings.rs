//! Mailing repository

use crate::db::{map_db_error, DatabasePool};
use crate::models::{CreateMailing, Mailing, MailingStatus, Recipient, UpdateMailing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailcast_common::types::{MailingId, RecipientId, UserId};
use mailcast_common::{Error, Result};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Mailing repository trait
#[async_trait]
pub trait MailingRepository: Send + Sync {
    /// Create a mailing in `created` status together with its recipient set
    async fn create(&self, input: CreateMailing) -> Result<Mailing>;
    async fn get(&self, id: MailingId) -> Result<Option<Mailing>>;
    /// List mailings ordered by first_sending; `None` lists every owner's rows
    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Mailing>>;
    /// Update editable fields; a given recipient list replaces the current set
    async fn update(&self, id: MailingId, input: UpdateMailing) -> Result<Option<Mailing>>;
    async fn delete(&self, id: MailingId) -> Result<bool>;
    async fn recipients(&self, id: MailingId) -> Result<Vec<Recipient>>;

    /// `created -> launched`, stamping first_sending. Returns `None` when the
    /// mailing is missing or no longer in `created`.
    async fn mark_launched(&self, id: MailingId, at: DateTime<Utc>) -> Result<Option<Mailing>>;
    /// `launched -> completed`, stamping end_sending. Returns `None` when the
    /// mailing is missing or was moved out of `launched` in the meantime.
    async fn mark_completed(&self, id: MailingId, at: DateTime<Utc>) -> Result<Option<Mailing>>;
    /// Unconditional status write, used by stop
    async fn set_status(&self, id: MailingId, status: MailingStatus) -> Result<Option<Mailing>>;
    async fn count(&self, status: Option<MailingStatus>) -> Result<i64>;
}

/// Database mailing repository
pub struct DbMailingRepository {
    pool: DatabasePool,
}

impl DbMailingRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn replace_recipients(
        tx: &mut Transaction<'_, Postgres>,
        id: MailingId,
        recipient_ids: &[RecipientId],
    ) -> Result<()> {
        sqlx::query("DELETE FROM mailing_recipients WHERE mailing_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        if !recipient_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO mailing_recipients (mailing_id, recipient_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(recipient_ids)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_db_error(e, "Mailing recipient"))?;
        }

        Ok(())
    }
}

#[async_trait]
impl MailingRepository for DbMailingRepository {
    async fn create(&self, input: CreateMailing) -> Result<Mailing> {
        let id = Uuid::now_v7();

        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let mailing = sqlx::query_as::<_, Mailing>(
            r#"
            INSERT INTO mailings (id, status, message_id, is_active, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(MailingStatus::Created.to_string())
        .bind(input.message_id)
        .bind(input.is_active.unwrap_or(true))
        .bind(input.owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error(e, "Mailing"))?;

        Self::replace_recipients(&mut tx, id, &input.recipient_ids).await?;

        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;
        Ok(mailing)
    }

    async fn get(&self, id: MailingId) -> Result<Option<Mailing>> {
        sqlx::query_as::<_, Mailing>("SELECT * FROM mailings WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Mailing>> {
        sqlx::query_as::<_, Mailing>(
            r#"
            SELECT * FROM mailings
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY first_sending ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update(&self, id: MailingId, input: UpdateMailing) -> Result<Option<Mailing>> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let mailing = sqlx::query_as::<_, Mailing>(
            r#"
            UPDATE mailings SET
                message_id = COALESCE($2, message_id),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.message_id)
        .bind(input.is_active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_db_error(e, "Mailing"))?;

        let Some(mailing) = mailing else {
            return Ok(None);
        };

        if let Some(recipient_ids) = &input.recipient_ids {
            Self::replace_recipients(&mut tx, id, recipient_ids).await?;
        }

        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;
        Ok(Some(mailing))
    }

    async fn delete(&self, id: MailingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mailings WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn recipients(&self, id: MailingId) -> Result<Vec<Recipient>> {
        sqlx::query_as::<_, Recipient>(
            r#"
            SELECT r.* FROM recipients r
            JOIN mailing_recipients mr ON mr.recipient_id = r.id
            WHERE mr.mailing_id = $1
            ORDER BY r.name ASC, r.id ASC
            "#,
        )
        .bind(id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn mark_launched(&self, id: MailingId, at: DateTime<Utc>) -> Result<Option<Mailing>> {
        sqlx::query_as::<_, Mailing>(
            r#"
            UPDATE mailings SET status = 'launched', first_sending = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'created'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn mark_completed(&self, id: MailingId, at: DateTime<Utc>) -> Result<Option<Mailing>> {
        sqlx::query_as::<_, Mailing>(
            r#"
            UPDATE mailings SET status = 'completed', end_sending = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'launched'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn set_status(&self, id: MailingId, status: MailingStatus) -> Result<Option<Mailing>> {
        sqlx::query_as::<_, Mailing>(
            "UPDATE mailings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn count(&self, status: Option<MailingStatus>) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM mailings WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.to_string()))
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.0)
    }
}
