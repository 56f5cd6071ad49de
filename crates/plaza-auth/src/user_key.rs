/// Namespace prefix for Telegram-derived user keys.
pub const PREFIX: &str = "tg:";

/// Build the stable user key for a verified Telegram id.
pub fn from_telegram_id(telegram_id: i64) -> String {
    format!("{PREFIX}{telegram_id}")
}

/// Extract the Telegram id from a user key; None when the key is not in the
/// `tg:` namespace.
pub fn telegram_id(user_key: &str) -> Option<&str> {
    user_key.strip_prefix(PREFIX).filter(|id| !id.is_empty())
}
