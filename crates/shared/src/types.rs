//! Database row types shared across the Chirp backend

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A user row as stored in the database
///
/// `password_hash` stays server-side; response types are built from the
/// other fields.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_premium: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A post row as stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
