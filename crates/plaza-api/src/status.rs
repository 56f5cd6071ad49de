use axum::Json;
use axum::extract::State;

use plaza_types::api::{PublishStatusRequest, StatusResponse};

use crate::error::ApiError;
use crate::{AppState, join_err, verify_caller};

/// POST /tg/status — publish the caller's status. Replaces any previous
/// active status and opens the 24h chat-eligibility window.
pub async fn publish_status(
    State(state): State<AppState>,
    Json(req): Json<PublishStatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if req.init_data.is_empty() {
        return Err(ApiError::BadRequest("Missing initData".into()));
    }

    let (_user, caller_key) = verify_caller(&state, &req.init_data)?;

    let db = state.clone();
    let key = caller_key.clone();
    let (id, expires_at) = tokio::task::spawn_blocking(move || {
        Ok::<_, ApiError>(db.db.publish_status(
            &key,
            req.latitude,
            req.longitude,
            req.message.as_deref(),
            req.icon.as_deref(),
            req.location.as_deref(),
        )?)
    })
    .await
    .map_err(join_err)??;

    Ok(Json(StatusResponse {
        id,
        user_key: caller_key,
        expires_at,
    }))
}
