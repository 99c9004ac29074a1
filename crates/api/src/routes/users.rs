//! User management routes

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chirp_shared::UserRow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::hash_password,
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub is_premium: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            is_premium: row.is_premium,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Basic email shape check; the unique index is the real gatekeeper
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.') && !email.contains(' ')
        }
        None => false,
    }
}

fn validate_credentials(email: &str, password: &str) -> ApiResult<()> {
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    if password.is_empty() {
        return Err(ApiError::Validation("Password must not be empty".to_string()));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    validate_credentials(&req.email, &req.password)?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "create_user: hashing failed");
        ApiError::Internal
    })?;

    let user: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        RETURNING id, email, password_hash, is_premium, created_at, updated_at
        "#,
    )
    .bind(req.email.to_lowercase())
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Update the authenticated user's email and password
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = state.sessions.authenticate(&headers)?;

    validate_credentials(&req.email, &req.password)?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "update_user: hashing failed");
        ApiError::Internal
    })?;

    let user: UserRow = sqlx::query_as(
        r#"
        UPDATE users
        SET email = $2, password_hash = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, password_hash, is_premium, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(req.email.to_lowercase())
    .bind(&password_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(user.into()))
}
