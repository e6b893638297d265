//! CLI channel — stdin/stdout REPL host for local use.
//!
//! Each line becomes a message from the configured sender. A line of the
//! form `@<id> <text>` is attributed to `<id>` instead, which makes it easy
//! to exercise the allow-list by hand.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, MessageStream};
use crate::dispatch::PlainMessage;
use crate::error::ChannelError;

/// Reads stdin lines and prints replies to stdout.
pub struct CliChannel {
    sender: String,
}

impl CliChannel {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }

    /// Turn a typed line into a message, honoring an `@id` prefix.
    pub fn to_message(&self, line: &str) -> PlainMessage {
        if let Some(rest) = line.strip_prefix('@')
            && let Some((id, text)) = rest.split_once(char::is_whitespace)
            && !id.is_empty()
        {
            return PlainMessage::new(id, text.trim());
        }
        PlainMessage::new(self.sender.clone(), line)
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let default_sender = self.sender.clone();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();
            let parser = CliChannel::new(default_sender);

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if line == "/quit" || line == "/exit" {
                            break;
                        }
                        if tx.send(parser.to_message(&line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(&self, _msg: &PlainMessage, reply: &str) -> Result<(), ChannelError> {
        println!("\n{}\n", reply);
        eprint!("> ");
        Ok(())
    }
}
