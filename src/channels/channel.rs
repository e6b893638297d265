//! Host channel trait — where inbound messages come from and replies go.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::dispatch::PlainMessage;
use crate::error::ChannelError;

/// Stream of inbound messages produced by a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = PlainMessage> + Send>>;

/// A host platform connection.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Start receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply to the sender of `msg`.
    async fn respond(&self, msg: &PlainMessage, reply: &str) -> Result<(), ChannelError>;
}
