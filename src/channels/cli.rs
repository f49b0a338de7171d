//! Local REPL: one stdin line per message, replies printed to stdout.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

const PROMPT: &str = "coach> ";

/// Lines that end the session instead of being sent.
const EXIT_WORDS: &[&str] = &["/quit", "/exit"];

pub struct CliChannel {
    user_id: String,
}

impl CliChannel {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new("local-user")
    }
}

/// What to do with one line of input.
fn classify(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || EXIT_WORDS.contains(&line) {
        None
    } else {
        Some(line)
    }
}

async fn read_stdin(user_id: String, tx: mpsc::UnboundedSender<IncomingMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("{PROMPT}");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed, closing CLI channel");
                break;
            }
        };
        if EXIT_WORDS.contains(&line.trim()) {
            break;
        }
        let Some(text) = classify(&line) else {
            eprint!("{PROMPT}");
            continue;
        };
        let message = IncomingMessage::new("cli", &user_id, text).with_user_name(&user_id);
        if tx.send(message).is_err() {
            break;
        }
    }
    tracing::debug!("CLI input closed");
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(read_stdin(self.user_id.clone(), tx));

        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            let message = rx.recv().await?;
            Some((message, rx))
        })))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", response.content);
        eprint!("{PROMPT}");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user() {
        let ch = CliChannel::default();
        assert_eq!(ch.name(), "cli");
        assert_eq!(ch.user_id, "local-user");
    }

    #[test]
    fn blank_and_exit_lines_are_not_sent() {
        assert_eq!(classify("  /habits list "), Some("/habits list"));
        assert_eq!(classify("   "), None);
        assert_eq!(classify("/quit"), None);
    }
}
