//! Message repository

use crate::db::{map_db_error, DatabasePool};
use crate::models::{CreateMessage, Message, UpdateMessage};
use async_trait::async_trait;
use mailcast_common::types::{MessageId, UserId};
use mailcast_common::{Error, Result};
use uuid::Uuid;

/// Message repository trait
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, input: CreateMessage) -> Result<Message>;
    async fn get(&self, id: MessageId) -> Result<Option<Message>>;
    /// List messages ordered by subject; `None` lists every owner's rows
    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Message>>;
    async fn update(&self, id: MessageId, input: UpdateMessage) -> Result<Option<Message>>;
    /// Delete a message together with the mailings that send it
    async fn delete(&self, id: MessageId) -> Result<bool>;
}

/// Database message repository
pub struct DbMessageRepository {
    pool: DatabasePool,
}

impl DbMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for DbMessageRepository {
    async fn create(&self, input: CreateMessage) -> Result<Message> {
        let id = Uuid::now_v7();

        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, subject, body, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.subject)
        .bind(&input.body)
        .bind(input.owner_id)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "Message"))
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY subject ASC, id ASC
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update(&self, id: MessageId, input: UpdateMessage) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages SET
                subject = COALESCE($2, subject),
                body = COALESCE($3, body),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.subject)
        .bind(&input.body)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete(&self, id: MessageId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
