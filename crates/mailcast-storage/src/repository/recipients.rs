//! Recipient repository

use crate::db::{map_db_error, DatabasePool};
use crate::models::{CreateRecipient, Recipient, UpdateRecipient};
use async_trait::async_trait;
use mailcast_common::types::{RecipientId, UserId};
use mailcast_common::{Error, Result};
use uuid::Uuid;

/// Recipient repository trait
#[async_trait]
pub trait RecipientRepository: Send + Sync {
    async fn create(&self, input: CreateRecipient) -> Result<Recipient>;
    async fn get(&self, id: RecipientId) -> Result<Option<Recipient>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<Recipient>>;
    async fn get_many(&self, ids: &[RecipientId]) -> Result<Vec<Recipient>>;
    /// List recipients ordered by name; `None` lists every owner's rows
    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Recipient>>;
    async fn update(&self, id: RecipientId, input: UpdateRecipient) -> Result<Option<Recipient>>;
    async fn delete(&self, id: RecipientId) -> Result<bool>;
    async fn count_distinct_emails(&self) -> Result<i64>;
}

/// Database recipient repository
pub struct DbRecipientRepository {
    pool: DatabasePool,
}

impl DbRecipientRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientRepository for DbRecipientRepository {
    async fn create(&self, input: CreateRecipient) -> Result<Recipient> {
        let id = Uuid::now_v7();

        sqlx::query_as::<_, Recipient>(
            r#"
            INSERT INTO recipients (id, email, name, comment, photo, is_active, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.comment)
        .bind(&input.photo)
        .bind(input.is_active.unwrap_or(true))
        .bind(input.owner_id)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "Recipient with this email"))
    }

    async fn get(&self, id: RecipientId) -> Result<Option<Recipient>> {
        sqlx::query_as::<_, Recipient>("SELECT * FROM recipients WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Recipient>> {
        sqlx::query_as::<_, Recipient>("SELECT * FROM recipients WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get_many(&self, ids: &[RecipientId]) -> Result<Vec<Recipient>> {
        sqlx::query_as::<_, Recipient>(
            "SELECT * FROM recipients WHERE id = ANY($1) ORDER BY name ASC",
        )
        .bind(ids)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Recipient>> {
        sqlx::query_as::<_, Recipient>(
            r#"
            SELECT * FROM recipients
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update(&self, id: RecipientId, input: UpdateRecipient) -> Result<Option<Recipient>> {
        sqlx::query_as::<_, Recipient>(
            r#"
            UPDATE recipients SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                comment = COALESCE($4, comment),
                photo = COALESCE($5, photo),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.comment)
        .bind(&input.photo)
        .bind(input.is_active)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "Recipient with this email"))
    }

    async fn delete(&self, id: RecipientId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipients WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_distinct_emails(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT email) FROM recipients")
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.0)
    }
}
