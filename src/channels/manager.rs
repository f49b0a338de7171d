//! Runs several channels as one merged message stream.

use futures::stream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

#[derive(Default)]
pub struct ChannelManager {
    channels: Vec<Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        tracing::info!(channel = channel.name(), "Channel registered");
        self.channels.push(channel);
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Start every channel. A channel that fails to start is logged and
    /// skipped; it is an error only if none start.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::new();
        for channel in &self.channels {
            match channel.start().await {
                Ok(s) => streams.push(s),
                Err(e) => tracing::error!(channel = channel.name(), error = %e, "Channel failed to start"),
            }
        }
        if streams.is_empty() {
            return Err(ChannelError::StartupFailed {
                name: "all".into(),
                reason: "no channel started".into(),
            });
        }
        Ok(Box::pin(stream::select_all(streams)))
    }

    /// Send a response on the channel the message came from.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .iter()
            .find(|c| c.name() == msg.channel)
            .ok_or_else(|| ChannelError::SendFailed {
                name: msg.channel.clone(),
                reason: "channel not registered".into(),
            })?;
        channel.respond(msg, response).await
    }

    pub async fn shutdown_all(&self) -> Result<(), ChannelError> {
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), error = %e, "Channel shutdown failed");
            }
        }
        Ok(())
    }
}
