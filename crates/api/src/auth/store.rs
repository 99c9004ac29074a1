//! Persistence contracts for the auth subsystem
//!
//! The session orchestrator talks to the relational store through two
//! narrow traits so the state machine can be exercised against an
//! in-memory double. `PgAuthStore` is the production implementation.

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// Byte length of a refresh token before hex encoding
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// A user's credential as stored: identity plus one-way password hash.
/// The plaintext never exists at rest.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: Uuid,
    pub password_hash: String,
}

/// A persisted refresh token row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshTokenRecord {
    /// A refresh token is usable iff it is unexpired and unrevoked
    pub fn is_usable(&self, now: OffsetDateTime) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

/// Generate a cryptographically random opaque refresh token
///
/// 32 random bytes, hex-encoded. Collision probability is negligible at
/// this length; the primary key on `refresh_tokens.token` is the backstop.
pub fn generate_refresh_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Store failure, surfaced as an internal error, never as "token invalid"
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Lookup of login credentials by email
pub trait CredentialStore {
    fn credential_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Credential>, StoreError>> + Send;
}

/// Persistence of opaque refresh tokens
pub trait RefreshTokenStore {
    fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    fn find(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Option<RefreshTokenRecord>, StoreError>> + Send;

    /// Set `revoked_at = now()` if the token exists and is not yet revoked.
    /// Returns whether a row changed; the transition is one-way.
    fn mark_revoked(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Administrative purge of all refresh tokens. Returns the count deleted.
    fn delete_all(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}

/// Postgres-backed implementation of both store contracts
#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for PgAuthStore {
    async fn credential_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(user_id, password_hash)| Credential {
            user_id,
            password_hash,
        }))
    }
}

impl RefreshTokenStore for PgAuthStore {
    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id = %user_id,
            expires_at = %expires_at,
            "Refresh token created"
        );

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token, user_id, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn mark_revoked(&self, token: &str) -> Result<bool, StoreError> {
        // The WHERE clause keeps revocation monotonic: a revoked_at that has
        // been set is never touched again
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens")
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(count = deleted, "Purged refresh tokens");
        }

        Ok(deleted)
    }
}
