//! PostgreSQL implementation of UserRepository.
//!
//! Email addresses are kept as a JSONB array on the user row; the
//! allow-list lives in its own table keyed by lowercased address.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::db_error;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::user::{EmailAddress, UserRecord};
use crate::ports::{StoreError, UserRepository};

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn upsert(&self, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, image_url, email_addresses, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                image_url = EXCLUDED.image_url,
                email_addresses = EXCLUDED.email_addresses,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id.as_str())
        .bind(user.first_name.as_deref())
        .bind(user.image_url.as_deref())
        .bind(Json(&user.email_addresses))
        .bind(user.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert user"))?;
        Ok(())
    }

    async fn find(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT first_name, image_url, email_addresses, updated_at FROM users WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch user"))?;

        Ok(row.map(|row| {
            let Json(email_addresses): Json<Vec<EmailAddress>> = row.get("email_addresses");
            let updated_at: DateTime<Utc> = row.get("updated_at");
            UserRecord {
                id: id.clone(),
                first_name: row.get("first_name"),
                image_url: row.get("image_url"),
                email_addresses,
                updated_at: Timestamp::from_datetime(updated_at),
            }
        }))
    }

    async fn remove(&self, id: &UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_email_allowed(&self, email: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS hit FROM allowed_emails WHERE email = $1")
            .bind(email.to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("check allowed email"))?;
        Ok(row.is_some())
    }

    async fn allow_email(&self, email: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO allowed_emails (email) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(email.to_ascii_lowercase())
            .execute(&self.pool)
            .await
            .map_err(db_error("allow email"))?;
        Ok(())
    }
}
