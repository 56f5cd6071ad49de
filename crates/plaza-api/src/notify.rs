use anyhow::bail;
use serde_json::json;
use tracing::debug;

/// Outbound push to the recipient via the Telegram Bot API. Strictly
/// best-effort: callers spawn it and log failures, nothing propagates back
/// into a request.
#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
    bot_username: String,
}

impl Notifier {
    pub fn new(bot_token: String, bot_username: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            bot_username,
        }
    }

    /// Deep link that reopens the Mini App inside the given room.
    pub fn deep_link(&self, room_id: i64) -> String {
        format!(
            "https://t.me/{}?startapp=chat&room={}",
            self.bot_username, room_id
        )
    }

    pub async fn notify_new_message(
        &self,
        recipient_telegram_id: &str,
        sender_name: &str,
        text: &str,
        room_id: i64,
    ) -> anyhow::Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = json!({
            "chat_id": recipient_telegram_id,
            "text": format!("💬 New message from {sender_name}: \"{text}\""),
            "reply_markup": {
                "inline_keyboard": [[
                    { "text": "💬 Open chat", "url": self.deep_link(room_id) }
                ]]
            }
        });

        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            bail!("Telegram API error {status}: {detail}");
        }

        debug!("Notification sent to {}", recipient_telegram_id);
        Ok(())
    }
}
