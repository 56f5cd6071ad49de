use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use tracing::{info, warn};

use plaza_types::api::CleanupResponse;

use crate::error::ApiError;
use crate::{AppState, join_err};

/// POST /cleanup-expired-chats — standalone maintenance trigger. Gated by
/// the service bearer token; when none is configured the endpoint is locked.
pub async fn cleanup_expired_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CleanupResponse>, ApiError> {
    let Some(expected) = state.cleanup_token.as_deref() else {
        warn!("cleanup endpoint called but no cleanup token is configured");
        return Err(ApiError::ServiceUnauthorized);
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));
    if provided != Some(expected) {
        return Err(ApiError::ServiceUnauthorized);
    }

    let db = state.clone();
    let (rooms, messages) =
        tokio::task::spawn_blocking(move || Ok::<_, ApiError>(db.db.sweep_expired()?))
            .await
            .map_err(join_err)??;

    if rooms > 0 {
        info!("Cleanup: removed {} expired rooms and {} messages", rooms, messages);
    }

    Ok(Json(CleanupResponse {
        cleaned_rooms: rooms,
        cleaned_messages: messages,
    }))
}

/// Background task that sweeps expired rooms on an interval, independent of
/// the inline sweep in the send path.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let db = state.clone();
        match tokio::task::spawn_blocking(move || db.db.sweep_expired()).await {
            Ok(Ok((rooms, messages))) => {
                if rooms > 0 {
                    info!("Sweep: removed {} expired rooms and {} messages", rooms, messages);
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {:#}", e),
            Err(e) => warn!("Sweep join error: {}", e),
        }
    }
}
