//! User repository

use crate::db::{map_db_error, DatabasePool};
use crate::models::{CreateUser, UpdateUser, User, UserRoles};
use async_trait::async_trait;
use mailcast_common::types::{Page, UserId};
use mailcast_common::{Error, Result};
use uuid::Uuid;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, input: CreateUser, password_hash: String) -> Result<User>;
    async fn get(&self, id: UserId) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self, page: Page) -> Result<Vec<User>>;
    async fn update(&self, id: UserId, input: UpdateUser) -> Result<Option<User>>;
    async fn update_password(&self, id: UserId, password_hash: String) -> Result<()>;
    async fn set_active(&self, id: UserId, active: bool) -> Result<bool>;
    /// Activate the account and mark its email as confirmed
    async fn confirm_email(&self, id: UserId) -> Result<()>;
    async fn roles(&self, id: UserId) -> Result<UserRoles>;
    /// Replace the user's groups and permissions
    async fn set_roles(&self, id: UserId, roles: &UserRoles) -> Result<()>;
    async fn add_group(&self, id: UserId, group: &str) -> Result<()>;
}

/// Database user repository
pub struct DbUserRepository {
    pool: DatabasePool,
}

impl DbUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn create(&self, input: CreateUser, password_hash: String) -> Result<User> {
        let id = Uuid::now_v7();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone_number,
                               country, is_active, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone_number)
        .bind(input.country.unwrap_or_default())
        .bind(input.is_active)
        .bind(input.is_superuser)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "User with this email"))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self, page: Page) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY email ASC LIMIT $1 OFFSET $2")
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update(&self, id: UserId, input: UpdateUser) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                phone_number = COALESCE($5, phone_number),
                country = COALESCE($6, country),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone_number)
        .bind(&input.country)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "User with this email"))
    }

    async fn update_password(&self, id: UserId, password_hash: String) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn confirm_email(&self, id: UserId) -> Result<()> {
        sqlx::query(
            "UPDATE users SET is_active = true, email_confirmed = true, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn roles(&self, id: UserId) -> Result<UserRoles> {
        let groups: Vec<(String,)> =
            sqlx::query_as("SELECT group_name FROM user_groups WHERE user_id = $1 ORDER BY group_name")
                .bind(id)
                .fetch_all(self.pool.pool())
                .await
                .map_err(|e| Error::Database(e.to_string()))?;

        let permissions: Vec<(String,)> = sqlx::query_as(
            "SELECT permission FROM user_permissions WHERE user_id = $1 ORDER BY permission",
        )
        .bind(id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(UserRoles {
            groups: groups.into_iter().map(|(g,)| g).collect(),
            permissions: permissions.into_iter().map(|(p,)| p).collect(),
        })
    }

    async fn set_roles(&self, id: UserId, roles: &UserRoles) -> Result<()> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query("DELETE FROM user_groups WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        for group in &roles.groups {
            sqlx::query(
                "INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(group)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error(e, "User"))?;
        }

        for permission in &roles.permissions {
            sqlx::query(
                "INSERT INTO user_permissions (user_id, permission) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(permission)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error(e, "User"))?;
        }

        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn add_group(&self, id: UserId, group: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(group)
        .execute(self.pool.pool())
        .await
        .map_err(|e| map_db_error(e, "User"))?;
        Ok(())
    }
}
