//! Main message loop: channel messages in, one task per event.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{ChannelManager, OutgoingResponse};
use crate::error::Error;

use super::Dispatcher;

/// Run until Ctrl+C or until every channel stream ends.
///
/// Events for different users run concurrently; the wizard's
/// compare-and-set keeps same-user races consistent.
pub async fn run(dispatcher: Arc<Dispatcher>, channels: Arc<ChannelManager>) -> Result<(), Error> {
    let mut message_stream = channels.start_all().await?;
    tracing::info!(channels = ?channels.names(), "Coach ready and listening");

    loop {
        let message = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down...");
                break;
            }
            msg = message_stream.next() => {
                match msg {
                    Some(m) => m,
                    None => {
                        tracing::info!("All channel streams ended, shutting down...");
                        break;
                    }
                }
            }
        };

        let dispatcher = Arc::clone(&dispatcher);
        let channels = Arc::clone(&channels);
        tokio::spawn(async move {
            let reply = dispatcher.handle(message.to_event()).await;
            if let Err(e) = channels
                .respond(&message, OutgoingResponse::from(&reply))
                .await
            {
                tracing::error!(channel = %message.channel, error = %e, "Failed to send reply");
            }
        });
    }

    channels.shutdown_all().await?;
    Ok(())
}
