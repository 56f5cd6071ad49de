use serde::{Deserialize, Serialize};

// -- Errors --

/// Every failed request renders exactly this shape. `code` carries a
/// machine-readable discriminator where the client branches on it
/// (currently only NO_ACTIVE_STATUS).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartChatRequest {
    #[serde(rename = "initData")]
    pub init_data: String,
    pub target_user_key: String,
}

#[derive(Debug, Serialize)]
pub struct StartChatResponse {
    pub room_id: i64,
}

/// GET /tg/chat/room/{id} carries the assertion as a query parameter.
#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "initData")]
    pub init_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomMessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_user_key: String,
    pub sender_name: String,
    pub text: String,
    pub created_at: String,
    pub is_own: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(rename = "initData")]
    pub init_data: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message_id: i64,
}

// -- Maintenance --

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub cleaned_rooms: usize,
    pub cleaned_messages: usize,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertProfileRequest {
    #[serde(rename = "initData")]
    pub init_data: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_key: String,
    pub name: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

// -- Statuses --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishStatusRequest {
    #[serde(rename = "initData")]
    pub init_data: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message: Option<String>,
    pub icon: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: i64,
    pub user_key: String,
    pub expires_at: String,
}
