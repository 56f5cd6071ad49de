use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::{info, warn};

use plaza_auth::user_key;
use plaza_db::RoomLookup;
use plaza_types::api::{
    ChatMessage, RoomMessagesResponse, RoomQuery, SendMessageRequest, SendMessageResponse,
    StartChatRequest, StartChatResponse,
};

use crate::error::ApiError;
use crate::{AppState, join_err, verify_caller};

/// Telegram caps messages at 4096 characters; so do we.
const MAX_MESSAGE_CHARS: usize = 4096;

/// How many messages a room read returns (the latest ones).
const MESSAGE_PAGE_SIZE: u32 = 50;

/// POST /tg/chat/start — find or create the room between the verified caller
/// and the target key. Requires the caller to hold a live status.
pub async fn start_chat(
    State(state): State<AppState>,
    Json(req): Json<StartChatRequest>,
) -> Result<Json<StartChatResponse>, ApiError> {
    if req.init_data.is_empty() || req.target_user_key.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing initData or target_user_key".into(),
        ));
    }

    let (_user, caller_key) = verify_caller(&state, &req.init_data)?;

    // A room with yourself would break the user1_key < user2_key invariant.
    if caller_key == req.target_user_key {
        return Err(ApiError::BadRequest("Cannot start a chat with yourself".into()));
    }

    let db = state.clone();
    let caller = caller_key.clone();
    let target = req.target_user_key.clone();
    let lookup = tokio::task::spawn_blocking(move || {
        if !db.db.has_active_status(&caller)? {
            return Err(ApiError::NoActiveStatus);
        }
        Ok(db.db.find_or_create_room(&caller, &target)?)
    })
    .await
    .map_err(join_err)??;

    if let RoomLookup::Created(id) = lookup {
        info!(
            "chat_started: {} -> {} (room {})",
            caller_key, req.target_user_key, id
        );
    }

    Ok(Json(StartChatResponse {
        room_id: lookup.id(),
    }))
}

/// GET /tg/chat/room/{id} — the room's messages, oldest to newest, for a
/// verified participant.
pub async fn get_room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<RoomMessagesResponse>, ApiError> {
    if query.init_data.is_empty() {
        return Err(ApiError::BadRequest("Missing initData".into()));
    }

    let (_user, caller_key) = verify_caller(&state, &query.init_data)?;

    let db = state.clone();
    let caller = caller_key.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let room = db.db.get_room(room_id)?.ok_or(ApiError::RoomNotFound)?;
        if !room.is_participant(&caller) {
            return Err(ApiError::AccessDenied);
        }
        Ok(db.db.room_messages(room_id, MESSAGE_PAGE_SIZE)?)
    })
    .await
    .map_err(join_err)??;

    // Rows come newest-first; clients render oldest-first.
    let messages = rows
        .into_iter()
        .rev()
        .map(|row| {
            let is_own = row.sender_user_key == caller_key;
            ChatMessage {
                id: row.id,
                sender_user_key: row.sender_user_key,
                sender_name: row.sender_name.unwrap_or_else(|| "Anonymous".into()),
                text: row.text,
                created_at: row.created_at,
                is_own,
            }
        })
        .collect();

    Ok(Json(RoomMessagesResponse { messages }))
}

/// POST /tg/chat/room/{id}/send — append a message, bump room recency, and
/// fire a best-effort notification at the other participant.
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    if req.init_data.is_empty() || req.text.is_empty() {
        return Err(ApiError::BadRequest("Missing initData or text".into()));
    }

    let (user, caller_key) = verify_caller(&state, &req.init_data)?;

    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest("Message too long".into()));
    }

    let db = state.clone();
    let caller = caller_key.clone();
    let body = text.clone();
    let (message_id, recipient_key) = tokio::task::spawn_blocking(move || {
        // Opportunistic sweep so an expired room 404s instead of taking the
        // write. Never fatal to the send path.
        if let Err(e) = db.db.sweep_expired() {
            warn!("inline sweep failed: {:#}", e);
        }

        let room = db.db.get_room(room_id)?.ok_or(ApiError::RoomNotFound)?;
        if !room.is_participant(&caller) {
            return Err(ApiError::AccessDenied);
        }

        let recipient = room.other_participant(&caller).to_string();
        let id = db.db.insert_message(room_id, &caller, &body)?;
        db.db.touch_room(room_id)?;
        Ok((id, recipient))
    })
    .await
    .map_err(join_err)??;

    // Fire-and-forget: the response never waits on Telegram.
    if let Some(recipient_id) = user_key::telegram_id(&recipient_key).map(str::to_string) {
        let notifier = state.notifier.clone();
        let sender = user.display_name();
        let preview = text;
        tokio::spawn(async move {
            if let Err(e) = notifier
                .notify_new_message(&recipient_id, &sender, &preview, room_id)
                .await
            {
                warn!("Notification error (non-critical): {:#}", e);
            }
        });
    }

    Ok(Json(SendMessageResponse {
        success: true,
        message_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{give_status, signed_init_data, state};

    #[tokio::test]
    async fn start_requires_active_status() {
        let state = state();
        let result = start_chat(
            State(state),
            Json(StartChatRequest {
                init_data: signed_init_data(1, "Ada"),
                target_user_key: "tg:2".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NoActiveStatus)));
    }

    #[tokio::test]
    async fn start_is_symmetric_between_participants() {
        let state = state();
        give_status(&state, "tg:1");
        give_status(&state, "tg:2");

        let a = start_chat(
            State(state.clone()),
            Json(StartChatRequest {
                init_data: signed_init_data(1, "Ada"),
                target_user_key: "tg:2".into(),
            }),
        )
        .await
        .unwrap();

        let b = start_chat(
            State(state),
            Json(StartChatRequest {
                init_data: signed_init_data(2, "Bob"),
                target_user_key: "tg:1".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(a.0.room_id, b.0.room_id);
    }

    #[tokio::test]
    async fn cannot_start_a_chat_with_yourself() {
        let state = state();
        give_status(&state, "tg:1");

        let result = start_chat(
            State(state.clone()),
            Json(StartChatRequest {
                init_data: signed_init_data(1, "Ada"),
                target_user_key: "tg:1".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        // Nothing was inserted: the pair invariant never saw an equal pair.
        let rooms: i64 = state
            .db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM chat_rooms", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(rooms, 0);
    }

    #[tokio::test]
    async fn bad_signature_is_unauthorized() {
        let state = state();
        let tampered = signed_init_data(1, "Ada").replace("Ada", "Eva");
        let result = start_chat(
            State(state),
            Json(StartChatRequest {
                init_data: tampered,
                target_user_key: "tg:2".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let state = state();
        let result = start_chat(
            State(state),
            Json(StartChatRequest {
                init_data: String::new(),
                target_user_key: "tg:2".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    async fn open_room(state: &AppState) -> i64 {
        give_status(state, "tg:1");
        start_chat(
            State(state.clone()),
            Json(StartChatRequest {
                init_data: signed_init_data(1, "Ada"),
                target_user_key: "tg:2".into(),
            }),
        )
        .await
        .unwrap()
        .0
        .room_id
    }

    #[tokio::test]
    async fn empty_text_is_rejected_and_not_stored() {
        let state = state();
        let room_id = open_room(&state).await;

        let result = send_message(
            State(state.clone()),
            Path(room_id),
            Json(SendMessageRequest {
                init_data: signed_init_data(1, "Ada"),
                text: "   ".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::EmptyMessage)));
        assert!(state.db.room_messages(room_id, 50).unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_text_is_rejected() {
        let state = state();
        let room_id = open_room(&state).await;

        let result = send_message(
            State(state),
            Path(room_id),
            Json(SendMessageRequest {
                init_data: signed_init_data(1, "Ada"),
                text: "x".repeat(MAX_MESSAGE_CHARS + 1),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn non_participant_is_denied_not_hidden() {
        let state = state();
        let room_id = open_room(&state).await;

        let read = get_room_messages(
            State(state.clone()),
            Path(room_id),
            Query(RoomQuery {
                init_data: signed_init_data(3, "Eve"),
            }),
        )
        .await;
        assert!(matches!(read, Err(ApiError::AccessDenied)));

        let send = send_message(
            State(state),
            Path(room_id),
            Json(SendMessageRequest {
                init_data: signed_init_data(3, "Eve"),
                text: "let me in".into(),
            }),
        )
        .await;
        assert!(matches!(send, Err(ApiError::AccessDenied)));
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let state = state();
        let result = get_room_messages(
            State(state),
            Path(9999),
            Query(RoomQuery {
                init_data: signed_init_data(1, "Ada"),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::RoomNotFound)));
    }

    #[tokio::test]
    async fn send_then_list_round_trip() {
        let state = state();
        let room_id = open_room(&state).await;

        send_message(
            State(state.clone()),
            Path(room_id),
            Json(SendMessageRequest {
                init_data: signed_init_data(1, "Ada"),
                text: "  hello there  ".into(),
            }),
        )
        .await
        .unwrap();
        send_message(
            State(state.clone()),
            Path(room_id),
            Json(SendMessageRequest {
                init_data: signed_init_data(2, "Bob"),
                text: "hi".into(),
            }),
        )
        .await
        .unwrap();

        let listing = get_room_messages(
            State(state),
            Path(room_id),
            Query(RoomQuery {
                init_data: signed_init_data(1, "Ada"),
            }),
        )
        .await
        .unwrap();

        let messages = &listing.0.messages;
        assert_eq!(messages.len(), 2);
        // Oldest first, trimmed, flagged relative to the caller.
        assert_eq!(messages[0].text, "hello there");
        assert!(messages[0].is_own);
        assert_eq!(messages[1].text, "hi");
        assert!(!messages[1].is_own);
        // No profile rows exist, so names fall back.
        assert_eq!(messages[0].sender_name, "Anonymous");
    }

    #[tokio::test]
    async fn send_into_expired_room_is_not_found() {
        let state = state();
        let room_id = open_room(&state).await;

        state
            .db
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE chat_rooms SET expires_at = datetime('now', '-1 minute') WHERE id = ?1",
                    [room_id],
                )?;
                Ok(())
            })
            .unwrap();

        // The inline sweep removes the room before the write is attempted.
        let result = send_message(
            State(state.clone()),
            Path(room_id),
            Json(SendMessageRequest {
                init_data: signed_init_data(1, "Ada"),
                text: "too late".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::RoomNotFound)));
        assert!(state.db.get_room(room_id).unwrap().is_none());
    }
}
