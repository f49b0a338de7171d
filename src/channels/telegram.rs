//! Telegram channel: long-polls the Bot API for updates.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// sendMessage limit, in characters.
const MAX_MESSAGE_CHARS: usize = 4096;

/// Seconds the server holds a `getUpdates` request open.
const POLL_TIMEOUT_SECS: u64 = 30;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Check if a username or numeric id is in the allowed list.
    pub fn is_user_allowed(&self, identity: &str) -> bool {
        check_user_allowed(&self.allowed_users, [identity])
    }

    /// Send a text message, splitting at Telegram's length limit.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            self.send_message_chunk(chat_id, &chunk).await?;
        }
        Ok(())
    }

    /// Markdown first; Telegram rejects unbalanced markup, so retry plain.
    async fn send_message_chunk(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let markdown = self
            .post_send(serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown"
            }))
            .await?;
        if markdown.status().is_success() {
            return Ok(());
        }
        tracing::warn!(
            chat_id,
            status = %markdown.status(),
            "Markdown reply rejected, resending as plain text"
        );

        let plain = self
            .post_send(serde_json::json!({"chat_id": chat_id, "text": text}))
            .await?;
        if plain.status().is_success() {
            return Ok(());
        }
        let status = plain.status();
        let detail = plain.text().await.unwrap_or_default();
        Err(send_failed(format!("sendMessage returned {status}: {detail}")))
    }

    async fn post_send(&self, body: Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))
    }
}

fn send_failed(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason,
    }
}

/// One long-poll round. Returns the raw updates.
async fn fetch_updates(
    client: &reqwest::Client,
    url: &str,
    offset: i64,
) -> Result<Vec<Value>, reqwest::Error> {
    let data: Value = client
        .post(url)
        .json(&serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"]
        }))
        .send()
        .await?
        .json()
        .await?;
    Ok(data
        .get("result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;
            tracing::info!("Polling Telegram for updates");

            loop {
                let updates = match fetch_updates(&client, &url, offset).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        tracing::warn!(error = %e, "Telegram poll failed, backing off");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in &updates {
                    if let Some(id) = update.get("update_id").and_then(Value::as_i64) {
                        offset = offset.max(id + 1);
                    }
                    if let Some(incoming) = parse_update(update, &allowed_users)
                        && tx.send(incoming).is_err()
                    {
                        tracing::info!("Telegram receiver dropped, stopping poll loop");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(Value::as_str)
            .ok_or_else(|| send_failed("message has no chat_id".into()))?;

        self.send_message(chat_id, &response.content).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let unhealthy = |reason: String| ChannelError::StartupFailed {
            name: "telegram".into(),
            reason,
        };
        let status = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| unhealthy(e.to_string()))?
            .status();
        if !status.is_success() {
            return Err(unhealthy(format!("getMe returned {status}")));
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

fn api_url(token: &SecretString, method: &str) -> String {
    format!(
        "https://api.telegram.org/bot{}/{method}",
        token.expose_secret()
    )
}

/// Turn one `getUpdates` entry into a message, if it is text from an
/// allowed user. The user id is Telegram's numeric id.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    let message = update.get("message")?;
    let text = message.get("text").and_then(Value::as_str)?;
    let from = message.get("from")?;

    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();

    if !check_user_allowed(allowed_users, [username, user_id.as_str()]) {
        tracing::warn!(
            username,
            user_id = %user_id,
            "Telegram: ignoring message from unauthorized user"
        );
        return None;
    }

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)?
        .to_string();
    let display = from
        .get("first_name")
        .and_then(Value::as_str)
        .unwrap_or(username);

    Some(
        IncomingMessage::new("telegram", &user_id, text)
            .with_user_name(display)
            .with_metadata(serde_json::json!({
                "chat_id": chat_id,
                "username": username,
            })),
    )
}

/// Check if any identity matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks of at most `max_chars` characters.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > max_chars {
        let limit = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..limit];
        let split_at = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(0) | None => limit,
            Some(i) => i,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(allowed: &[&str]) -> TelegramChannel {
        TelegramChannel::new(
            SecretString::from("fake-token"),
            allowed.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn update(username: &str, id: i64, text: &str) -> Value {
        serde_json::json!({
            "update_id": 10,
            "message": {
                "text": text,
                "from": {"id": id, "username": username, "first_name": "Dana"},
                "chat": {"id": 99887766}
            }
        })
    }

    #[test]
    fn reports_its_name() {
        assert_eq!(channel(&["*"]).name(), "telegram");
    }

    #[test]
    fn builds_bot_api_urls() {
        assert_eq!(
            channel(&["*"]).api_url("getUpdates"),
            "https://api.telegram.org/botfake-token/getUpdates"
        );
    }

    #[test]
    fn wildcard_allows_everyone() {
        assert!(channel(&["*"]).is_user_allowed("anyone"));
    }

    #[test]
    fn allow_list_matches_exactly() {
        let ch = channel(&["alice"]);
        assert!(ch.is_user_allowed("alice"));
        assert!(!ch.is_user_allowed("alice2"));
        assert!(!ch.is_user_allowed("Alice"));
        assert!(!ch.is_user_allowed(""));
    }

    #[test]
    fn empty_allow_list_denies() {
        assert!(!channel(&[]).is_user_allowed("alice"));
    }

    #[test]
    fn parse_update_uses_numeric_id() {
        let msg = parse_update(&update("dana", 42, "/start"), &["*".into()]).unwrap();
        assert_eq!(msg.user_id, "42");
        assert_eq!(msg.user_name.as_deref(), Some("Dana"));
        assert_eq!(msg.content, "/start");
        assert_eq!(msg.metadata["chat_id"], "99887766");
    }

    #[test]
    fn parse_update_checks_allow_list_by_name_or_id() {
        assert!(parse_update(&update("dana", 42, "hi"), &["42".into()]).is_some());
        assert!(parse_update(&update("dana", 42, "hi"), &["dana".into()]).is_some());
        assert!(parse_update(&update("dana", 42, "hi"), &["bob".into()]).is_none());
    }

    #[test]
    fn parse_update_skips_non_text() {
        let sticker = serde_json::json!({
            "update_id": 1,
            "message": {"from": {"id": 1}, "chat": {"id": 1}, "sticker": {}}
        });
        assert!(parse_update(&sticker, &["*".into()]).is_none());
    }

    #[test]
    fn short_messages_stay_whole() {
        assert_eq!(split_message("Hello", 4096), vec!["Hello"]);
    }

    #[test]
    fn message_at_limit_is_one_chunk() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn long_messages_split_on_newlines() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks, vec!["a".repeat(2000), "b".repeat(3000)]);
    }

    #[test]
    fn hard_cut_without_whitespace() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let msg = "é".repeat(4100);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks[0].chars().count(), 4096);
        assert_eq!(chunks[1].chars().count(), 4);
    }

    #[test]
    fn empty_message_is_one_empty_chunk() {
        assert_eq!(split_message("", 4096), vec![""]);
    }
}
