//! Fixtures shared by the handler tests: a signed initData builder that
//! mirrors the client side, and an in-memory app state.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::notify::Notifier;
use crate::{AppState, AppStateInner};

pub(crate) const TOKEN: &str = "7215911:AAf-test-bot-token";

/// Mirror of the client-side signing Telegram performs.
pub(crate) fn signed_init_data(telegram_id: i64, first_name: &str) -> String {
    let user = format!(r#"{{"id":{telegram_id},"first_name":"{first_name}"}}"#);
    let auth_date = chrono::Utc::now().timestamp().to_string();
    let params = [("user", user.as_str()), ("auth_date", auth_date.as_str())];

    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(key, _)| *key);
    let check_string = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n");

    let secret = Sha256::digest(TOKEN.as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(&secret).unwrap();
    mac.update(check_string.as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        ser.append_pair(key, value);
    }
    ser.append_pair("hash", &hash);
    ser.finish()
}

pub(crate) fn state() -> AppState {
    Arc::new(AppStateInner {
        db: plaza_db::Database::open_in_memory().unwrap(),
        bot_token: TOKEN.into(),
        cleanup_token: Some("svc-token".into()),
        notifier: Notifier::new(TOKEN.into(), "plaza_bot".into()),
    })
}

pub(crate) fn give_status(state: &AppState, user_key: &str) {
    state
        .db
        .publish_status(user_key, Some(55.75), Some(37.61), Some("here"), None, None)
        .unwrap();
}
