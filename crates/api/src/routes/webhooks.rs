//! Membership provider webhook
//!
//! Gated by the static API key, not by user tokens: the caller is the
//! payment provider, not a logged-in user.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct MembershipEvent {
    pub event: String,
    pub data: MembershipEventData,
}

#[derive(Debug, Deserialize)]
pub struct MembershipEventData {
    // Kept as a string so a garbled ID is a 400, not a body rejection
    pub user_id: String,
}

/// Handle a membership event from the payment provider
pub async fn membership_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<MembershipEvent>,
) -> ApiResult<StatusCode> {
    state.sessions.verify_api_key(&headers)?;

    // Only upgrades are acted on; everything else is acknowledged and dropped
    if event.event != "user.upgraded" {
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = Uuid::parse_str(&event.data.user_id)
        .map_err(|_| ApiError::BadRequest("invalid user id".to_string()))?;

    let result = sqlx::query("UPDATE users SET is_premium = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    tracing::info!(user_id = %user_id, "user upgraded to premium");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbled_user_id_is_our_bad_request_not_a_body_rejection() {
        // The payload must survive deserialization so a malformed ID reaches
        // the handler and comes back as a 400 instead of a 422
        let event: MembershipEvent = serde_json::from_str(
            r#"{"event": "user.upgraded", "data": {"user_id": "not-a-uuid"}}"#,
        )
        .expect("payload with a garbled id must still deserialize");

        assert!(Uuid::parse_str(&event.data.user_id).is_err());
    }

    #[test]
    fn test_well_formed_user_id_parses() {
        let event: MembershipEvent = serde_json::from_str(
            r#"{"event": "user.upgraded", "data": {"user_id": "3311741c-6798-4a49-b4d8-f2923e7e94c9"}}"#,
        )
        .expect("valid payload must deserialize");

        assert!(Uuid::parse_str(&event.data.user_id).is_ok());
    }
}
