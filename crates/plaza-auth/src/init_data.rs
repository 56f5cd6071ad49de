use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// An assertion older than this is rejected even when the signature is valid.
pub const MAX_AUTH_AGE_SECS: i64 = 86_400;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("missing hash in init data")]
    MissingSignature,
    #[error("invalid hash - data may be tampered")]
    InvalidSignature,
    #[error("missing or malformed user data")]
    MissingUserData,
    #[error("init data expired")]
    Expired,
}

/// The `user` field embedded in initData, as Telegram serializes it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
}

impl TelegramUser {
    /// First + last name, falling back to the username when both are empty.
    pub fn display_name(&self) -> String {
        let mut name = self.first_name.trim().to_string();
        if let Some(last) = self.last_name.as_deref() {
            if !last.trim().is_empty() {
                if !name.is_empty() {
                    name.push(' ');
                }
                name.push_str(last.trim());
            }
        }
        if name.is_empty() {
            name = self.username.clone().unwrap_or_default();
        }
        name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub user: TelegramUser,
    pub auth_date: Option<i64>,
}

/// Verify a Mini App `initData` assertion against the bot token.
///
/// The signature covers every parameter except `hash`, sorted by key and
/// joined as `key=value` lines; the signing key is the SHA-256 digest of the
/// raw bot token. The freshness window is enforced whenever `auth_date` is
/// present.
pub fn verify(init_data: &str, bot_token: &str) -> Result<VerifiedIdentity, VerifyError> {
    verify_at(init_data, bot_token, chrono::Utc::now().timestamp())
}

/// Same as [`verify`] with an explicit "now" (unix seconds).
pub fn verify_at(
    init_data: &str,
    bot_token: &str,
    now_unix: i64,
) -> Result<VerifiedIdentity, VerifyError> {
    let mut hash = None;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in form_urlencoded::parse(init_data.as_bytes()) {
        if key == "hash" {
            hash = Some(value.into_owned());
        } else {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }
    let hash = hash.ok_or(VerifyError::MissingSignature)?;

    // Data-check string: remaining pairs in byte order of their keys.
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let check_string = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n");

    let secret = Sha256::digest(bot_token.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC can take key of any size");
    mac.update(check_string.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected != hash {
        return Err(VerifyError::InvalidSignature);
    }

    let user_json = pairs
        .iter()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.as_str())
        .ok_or(VerifyError::MissingUserData)?;
    let user: TelegramUser =
        serde_json::from_str(user_json).map_err(|_| VerifyError::MissingUserData)?;

    // A non-numeric auth_date is treated as absent, matching the lenient
    // parse the clients have always been verified against.
    let auth_date = pairs
        .iter()
        .find(|(key, _)| key == "auth_date")
        .and_then(|(_, value)| value.parse::<i64>().ok());
    if let Some(auth_date) = auth_date {
        if now_unix - auth_date > MAX_AUTH_AGE_SECS {
            return Err(VerifyError::Expired);
        }
    }

    Ok(VerifiedIdentity { user, auth_date })
}
