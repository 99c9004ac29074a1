//! Authentication routes: login, refresh, revoke

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chirp_shared::UserRow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional shorter access-token lifetime; clamped to the configured max
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub email: String,
    pub is_premium: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Verify credentials and hand out an access + refresh token pair
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let pair = state
        .sessions
        .login(&req.email, &req.password, req.expires_in_seconds)
        .await?;

    let user: UserRow = sqlx::query_as(
        r#"
        SELECT id, email, password_hash, is_premium, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(pair.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::Internal)?;

    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        is_premium: user.is_premium,
        created_at: user.created_at,
        updated_at: user.updated_at,
        token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Mint a new access token from a bearer refresh token
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<RefreshResponse>> {
    let token = state.sessions.refresh(&headers).await?;
    Ok(Json(RefreshResponse { token }))
}

/// Revoke a bearer refresh token
pub async fn revoke(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    state.sessions.revoke(&headers).await?;
    Ok(StatusCode::NO_CONTENT)
}
