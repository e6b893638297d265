//! The one interface a host platform adapter must provide.

/// An inbound chat message as seen by the engine.
///
/// Implemented once per host platform. The sender id is already
/// normalized to a string (numeric platform ids included).
pub trait InboundMessage: Send + Sync {
    /// Raw message text.
    fn text(&self) -> &str;

    /// Sender identity used by the access gate.
    fn sender_id(&self) -> String;
}

/// Minimal owned message, used by the CLI host and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainMessage {
    pub sender: String,
    pub content: String,
}

impl PlainMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }
}

impl InboundMessage for PlainMessage {
    fn text(&self) -> &str {
        &self.content
    }

    fn sender_id(&self) -> String {
        self.sender.clone()
    }
}
