pub mod chat;
pub mod cleanup;
pub mod error;
pub mod notify;
pub mod profile;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use tracing::warn;

use plaza_auth::{TelegramUser, user_key};
use plaza_db::Database;

use crate::error::ApiError;
use crate::notify::Notifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub bot_token: String,
    /// Bearer token guarding the maintenance endpoint; None locks it.
    pub cleanup_token: Option<String>,
    pub notifier: Notifier,
}

/// The one verification path every authenticated handler goes through.
/// Returns the verified Telegram user and the derived user key.
pub(crate) fn verify_caller(
    state: &AppStateInner,
    init_data: &str,
) -> Result<(TelegramUser, String), ApiError> {
    match plaza_auth::verify(init_data, &state.bot_token) {
        Ok(identity) => {
            let key = user_key::from_telegram_id(identity.user.id);
            Ok((identity.user, key))
        }
        Err(e) => {
            warn!("initData verification failed: {}", e);
            Err(ApiError::Unauthorized)
        }
    }
}

pub(crate) fn join_err(e: tokio::task::JoinError) -> ApiError {
    tracing::error!("spawn_blocking join error: {}", e);
    ApiError::Internal(anyhow::anyhow!(e))
}
