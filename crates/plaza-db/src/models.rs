/// Database row types — these map directly to SQLite rows.
/// Distinct from plaza-types API models to keep the DB layer independent.

pub struct ProfileRow {
    pub user_key: String,
    pub telegram_id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct RoomRow {
    pub id: i64,
    pub user1_key: String,
    pub user2_key: String,
    pub created_at: String,
    pub last_message_at: String,
    pub expires_at: String,
}

impl RoomRow {
    pub fn is_participant(&self, user_key: &str) -> bool {
        self.user1_key == user_key || self.user2_key == user_key
    }

    /// The participant that is not `user_key`. Callers check membership first.
    pub fn other_participant(&self, user_key: &str) -> &str {
        if self.user1_key == user_key {
            &self.user2_key
        } else {
            &self.user1_key
        }
    }
}

pub struct MessageRow {
    pub id: i64,
    pub room_id: i64,
    pub sender_user_key: String,
    /// Profile name (or username) of the sender, when a profile row exists.
    pub sender_name: Option<String>,
    pub text: String,
    pub created_at: String,
}
