use chrono::{DateTime, Utc};

/// Session model
#[derive(Debug, sqlx::FromRow)]
pub struct Session {
    pub id: uuid::Uuid,
    pub owner_id: String,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
