use super::models::Session;
use crate::backend::BackendError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct AuthDatabase {
    pool: PgPool,
}

impl AuthDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_session(
        &self,
        session_id: uuid::Uuid,
        owner_id: &str,
        expires: DateTime<Utc>,
    ) -> Result<Session, BackendError> {
        Ok(sqlx::query_as::<_, Session>(
            "INSERT INTO sessions(id, owner_id, expires) VALUES ($1, $2, $3)
            RETURNING id, owner_id, expires, created_at",
        )
        .bind(session_id)
        .bind(owner_id)
        .bind(expires)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Owner of the session if it exists and has not expired.
    pub async fn session_owner(
        &self,
        session_id: uuid::Uuid,
    ) -> Result<Option<String>, BackendError> {
        let owner = sqlx::query_scalar::<_, String>(
            "SELECT owner_id FROM sessions WHERE id = $1 AND expires > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }

    pub async fn delete_session(&self, session_id: uuid::Uuid) -> Result<(), BackendError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, BackendError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
