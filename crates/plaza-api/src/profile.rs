use axum::Json;
use axum::extract::State;
use tracing::info;

use plaza_db::models::ProfileRow;
use plaza_types::api::{ProfileResponse, UpsertProfileRequest};

use crate::error::ApiError;
use crate::{AppState, join_err, verify_caller};

/// POST /tg/upsert-profile — create or refresh the caller's profile from the
/// verified identity. The profile feeds sender names in room reads.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if req.init_data.is_empty() {
        return Err(ApiError::BadRequest("Missing initData".into()));
    }

    let (user, caller_key) = verify_caller(&state, &req.init_data)?;

    let profile = ProfileRow {
        user_key: caller_key,
        telegram_id: user.id.to_string(),
        name: Some(user.display_name()).filter(|n| !n.is_empty()),
        username: user.username.clone(),
        avatar_url: user.photo_url.clone(),
    };

    let db = state.clone();
    let stored = tokio::task::spawn_blocking(move || {
        db.db.upsert_profile(&profile)?;
        Ok::<_, ApiError>(profile)
    })
    .await
    .map_err(join_err)??;

    info!("user_profile_updated: {}", stored.user_key);

    Ok(Json(ProfileResponse {
        user_key: stored.user_key,
        name: stored.name.unwrap_or_default(),
        username: stored.username,
        avatar_url: stored.avatar_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{signed_init_data, state};

    #[tokio::test]
    async fn upsert_is_idempotent_per_user_key() {
        let state = state();

        let first = upsert_profile(
            State(state.clone()),
            Json(UpsertProfileRequest {
                init_data: signed_init_data(7, "Grace"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(first.0.user_key, "tg:7");
        assert_eq!(first.0.name, "Grace");

        let second = upsert_profile(
            State(state.clone()),
            Json(UpsertProfileRequest {
                init_data: signed_init_data(7, "Grace H"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(second.0.name, "Grace H");

        let stored = state.db.get_profile("tg:7").unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Grace H"));
    }

    #[tokio::test]
    async fn rejects_unsigned_payloads() {
        let state = state();
        let result = upsert_profile(
            State(state),
            Json(UpsertProfileRequest {
                init_data: "user=%7B%22id%22%3A7%7D".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }
}
