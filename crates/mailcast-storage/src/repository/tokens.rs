//! Account token repository

use crate::db::{map_db_error, DatabasePool};
use crate::models::{AccountToken, CreateToken, TokenKind};
use async_trait::async_trait;
use mailcast_common::types::UserId;
use mailcast_common::{Error, Result};
use uuid::Uuid;

/// Token repository trait
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn create(&self, input: CreateToken) -> Result<AccountToken>;
    /// Look up a token by its hash; expiry is checked by the caller
    async fn find(&self, token_hash: &str, kind: TokenKind) -> Result<Option<AccountToken>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn delete_for_user(&self, user_id: UserId, kind: TokenKind) -> Result<u64>;
}

/// Database token repository
pub struct DbTokenRepository {
    pool: DatabasePool,
}

impl DbTokenRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for DbTokenRepository {
    async fn create(&self, input: CreateToken) -> Result<AccountToken> {
        let id = Uuid::now_v7();

        sqlx::query_as::<_, AccountToken>(
            r#"
            INSERT INTO account_tokens (id, user_id, kind, token_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.user_id)
        .bind(input.kind.to_string())
        .bind(&input.token_hash)
        .bind(input.expires_at)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "Token"))
    }

    async fn find(&self, token_hash: &str, kind: TokenKind) -> Result<Option<AccountToken>> {
        sqlx::query_as::<_, AccountToken>(
            "SELECT * FROM account_tokens WHERE token_hash = $1 AND kind = $2",
        )
        .bind(token_hash)
        .bind(kind.to_string())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM account_tokens WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: UserId, kind: TokenKind) -> Result<u64> {
        let result = sqlx::query("DELETE FROM account_tokens WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind.to_string())
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
