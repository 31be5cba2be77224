//! Mailing attempt repository (append-only)

use crate::db::{map_db_error, DatabasePool};
use crate::models::{CreateAttempt, MailingAttempt};
use async_trait::async_trait;
use mailcast_common::types::{MailingId, UserId};
use mailcast_common::{Error, Result};
use uuid::Uuid;

/// Attempt repository trait. There is no update or delete.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn record(&self, input: CreateAttempt) -> Result<MailingAttempt>;
    /// List attempts ordered by (attempted_at, status); `None` lists every owner's rows
    async fn list(&self, owner: Option<UserId>) -> Result<Vec<MailingAttempt>>;
    async fn list_for_mailing(&self, mailing_id: MailingId) -> Result<Vec<MailingAttempt>>;
}

/// Database attempt repository
pub struct DbAttemptRepository {
    pool: DatabasePool,
}

impl DbAttemptRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptRepository for DbAttemptRepository {
    async fn record(&self, input: CreateAttempt) -> Result<MailingAttempt> {
        let id = Uuid::now_v7();

        sqlx::query_as::<_, MailingAttempt>(
            r#"
            INSERT INTO mailing_attempts (id, status, server_response, mailing_id, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.status.to_string())
        .bind(&input.server_response)
        .bind(input.mailing_id)
        .bind(input.owner_id)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "Attempt"))
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<MailingAttempt>> {
        sqlx::query_as::<_, MailingAttempt>(
            r#"
            SELECT * FROM mailing_attempts
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY attempted_at ASC, status ASC
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_for_mailing(&self, mailing_id: MailingId) -> Result<Vec<MailingAttempt>> {
        sqlx::query_as::<_, MailingAttempt>(
            "SELECT * FROM mailing_attempts WHERE mailing_id = $1 ORDER BY attempted_at ASC, status ASC",
        )
        .bind(mailing_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
