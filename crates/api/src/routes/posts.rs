//! Post CRUD routes

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chirp_shared::PostRow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Maximum post body length in characters
const MAX_POST_LEN: usize = 140;

/// Words replaced by **** regardless of case
const PROFANITIES: &[&str] = &["kerfuffle", "sharbert", "fornax"];

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub author_id: Option<Uuid>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub body: String,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<PostRow> for PostResponse {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            body: row.body,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Replace profane whole words with ****, preserving the rest verbatim
fn clean_profanity(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if PROFANITIES.iter().any(|p| word.eq_ignore_ascii_case(p)) {
                "****"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a post owned by the authenticated user
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let user_id = state.sessions.authenticate(&headers)?;

    if req.body.chars().count() > MAX_POST_LEN {
        return Err(ApiError::Validation("Post is too long".to_string()));
    }

    let cleaned = clean_profanity(&req.body);

    let post: PostRow = sqlx::query_as(
        r#"
        INSERT INTO posts (user_id, body)
        VALUES ($1, $2)
        RETURNING id, user_id, body, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(&cleaned)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(post_id = %post.id, user_id = %user_id, "post created");

    Ok((StatusCode::CREATED, Json(post.into())))
}

/// List posts, optionally filtered by author and sorted by creation time
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    // Sort direction is interpolated from a fixed set, never from raw input
    let descending = match query.sort.as_deref() {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Invalid sort parameter '{other}', must be 'asc' or 'desc'"
            )));
        }
    };

    let sql = match (query.author_id.is_some(), descending) {
        (true, false) => {
            "SELECT id, user_id, body, created_at, updated_at FROM posts \
             WHERE user_id = $1 ORDER BY created_at ASC"
        }
        (true, true) => {
            "SELECT id, user_id, body, created_at, updated_at FROM posts \
             WHERE user_id = $1 ORDER BY created_at DESC"
        }
        (false, false) => {
            "SELECT id, user_id, body, created_at, updated_at FROM posts \
             ORDER BY created_at ASC"
        }
        (false, true) => {
            "SELECT id, user_id, body, created_at, updated_at FROM posts \
             ORDER BY created_at DESC"
        }
    };

    let mut q = sqlx::query_as::<_, PostRow>(sql);
    if let Some(author_id) = query.author_id {
        q = q.bind(author_id);
    }

    let posts = q.fetch_all(&state.pool).await?;

    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

/// Fetch a single post by ID
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<PostResponse>> {
    let post: PostRow = sqlx::query_as(
        "SELECT id, user_id, body, created_at, updated_at FROM posts WHERE id = $1",
    )
    .bind(post_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(post.into()))
}

/// Delete a post; only its owner may do so
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user_id = state.sessions.authenticate(&headers)?;

    let post: PostRow = sqlx::query_as(
        "SELECT id, user_id, body, created_at, updated_at FROM posts WHERE id = $1",
    )
    .bind(post_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    // Forbidden, not unauthorized: the caller is logged in, just not the owner
    state.sessions.authorize_owner(user_id, post.user_id)?;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(&state.pool)
        .await?;

    tracing::info!(post_id = %post_id, user_id = %user_id, "post deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_profanity_replaces_whole_words() {
        assert_eq!(
            clean_profanity("This is a kerfuffle opinion"),
            "This is a **** opinion"
        );
        assert_eq!(clean_profanity("sharbert"), "****");
        assert_eq!(
            clean_profanity("fornax Fornax FORNAX"),
            "**** **** ****"
        );
    }

    #[test]
    fn test_clean_profanity_leaves_substrings_alone() {
        // Only whole words are filtered
        assert_eq!(clean_profanity("kerfuffle!"), "kerfuffle!");
        assert_eq!(clean_profanity("unsharbert"), "unsharbert");
    }

    #[test]
    fn test_clean_profanity_preserves_clean_text() {
        let body = "I hear Mastodon is better than Chirp";
        assert_eq!(clean_profanity(body), body);
    }
}
