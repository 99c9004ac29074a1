//! Administrative endpoints: metrics and the dev-only reset

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub fileserver_hits: u64,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub users_deleted: u64,
    pub posts_deleted: u64,
    pub refresh_tokens_deleted: u64,
}

/// Report the static fileserver hit counter
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        fileserver_hits: state.fileserver_hits.load(Ordering::Relaxed),
    })
}

/// Wipe all state and reset the hit counter; dev platform only
pub async fn reset(State(state): State<AppState>) -> ApiResult<Json<ResetResponse>> {
    if state.config.platform != "dev" {
        tracing::warn!(platform = %state.config.platform, "reset refused outside dev");
        return Err(ApiError::Forbidden);
    }

    let refresh_tokens_deleted = state.sessions.purge_refresh_tokens().await?;

    let posts_deleted = sqlx::query("DELETE FROM posts")
        .execute(&state.pool)
        .await?
        .rows_affected();

    let users_deleted = sqlx::query("DELETE FROM users")
        .execute(&state.pool)
        .await?
        .rows_affected();

    state.fileserver_hits.store(0, Ordering::Relaxed);

    tracing::info!(
        users_deleted,
        posts_deleted,
        refresh_tokens_deleted,
        "state reset"
    );

    Ok(Json(ResetResponse {
        users_deleted,
        posts_deleted,
        refresh_tokens_deleted,
    }))
}
