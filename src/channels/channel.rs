//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::bot::{InboundEvent, Reply};
use crate::error::ChannelError;

/// A line of text received on a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel that received it.
    pub channel: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub content: String,
    pub received_at: DateTime<Utc>,
    /// Channel-specific routing data (e.g. Telegram `chat_id`).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            user_name: None,
            content: content.to_string(),
            received_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    /// Parse the text into an event for the dispatcher.
    pub fn to_event(&self) -> InboundEvent {
        InboundEvent::from_text(&self.user_id, self.user_name.as_deref(), &self.content)
    }
}

/// Text sent back on the channel a message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl From<&Reply> for OutgoingResponse {
    fn from(reply: &Reply) -> Self {
        Self::text(reply.render_text())
    }
}

pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A text chat surface.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_become_command_events() {
        let msg = IncomingMessage::new("cli", "local-user", "/plan view").with_user_name("Sam");
        match msg.to_event() {
            InboundEvent::CommandInvoked {
                command,
                subcommand,
                user_name,
                ..
            } => {
                assert_eq!(command, "plan");
                assert_eq!(subcommand.as_deref(), Some("view"));
                assert_eq!(user_name.as_deref(), Some("Sam"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn replies_render_as_text() {
        let reply = Reply::titled("Done", "All set.");
        assert_eq!(
            OutgoingResponse::from(&reply).content,
            "**Done**\nAll set."
        );
    }
}
