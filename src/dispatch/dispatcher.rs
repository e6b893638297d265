//! Dispatcher — turns an inbound message into at most one reply.
//!
//! Matching runs in two steps:
//! 1. Exact: the whole normalized message is a registered keyword. Any
//!    action variant fires, and this always wins.
//! 2. Substring fallback: the first registered keyword (insertion order)
//!    contained in the message. Only text actions are eligible, so partial
//!    text never fires an HTTP call.
//!
//! No match, or a sender the access gate rejects, means silence.

use std::sync::Arc;

use tracing::{debug, info};

use crate::access::AccessGate;
use crate::actions::{Action, ActionRegistry, normalize_keyword};
use crate::dispatch::message::InboundMessage;
use crate::http::HttpExecutor;

/// How a keyword matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Substring,
}

/// A keyword binding selected for a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched {
    pub keyword: String,
    pub action: Action,
    pub kind: MatchKind,
}

pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    gate: Arc<AccessGate>,
    executor: Arc<HttpExecutor>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ActionRegistry>,
        gate: Arc<AccessGate>,
        executor: Arc<HttpExecutor>,
    ) -> Self {
        Self {
            registry,
            gate,
            executor,
        }
    }

    /// Entry point for host adapters. Applies the access gate, normalizes
    /// the text and dispatches it.
    pub async fn handle(&self, message: &dyn InboundMessage) -> Option<String> {
        let sender = message.sender_id();
        if !self.gate.allows(&sender).await {
            return None;
        }

        let text = normalize_keyword(message.text());
        if text.is_empty() {
            return None;
        }
        self.dispatch(&text).await
    }

    /// Match an already-normalized message and produce the reply.
    pub async fn dispatch(&self, message: &str) -> Option<String> {
        let matched = self.find_match(message).await?;
        info!(
            keyword = %matched.keyword,
            kind = ?matched.kind,
            action = matched.action.kind(),
            "Keyword matched"
        );
        Some(self.run(&matched.action).await)
    }

    /// Select the binding for an already-normalized message, without running it.
    pub async fn find_match(&self, message: &str) -> Option<Matched> {
        if let Some(action) = self.registry.get(message).await {
            return Some(Matched {
                keyword: message.to_string(),
                action,
                kind: MatchKind::Exact,
            });
        }

        let found = self
            .registry
            .list()
            .await
            .into_iter()
            .find(|(keyword, action)| {
                !keyword.is_empty() && action.is_text() && message.contains(keyword.as_str())
            });

        match found {
            Some((keyword, action)) => Some(Matched {
                keyword,
                action,
                kind: MatchKind::Substring,
            }),
            None => {
                debug!(message, "No keyword matched");
                None
            }
        }
    }

    async fn run(&self, action: &Action) -> String {
        match action {
            Action::Text { value } => value.clone(),
            api => match self.executor.execute(api).await {
                Some(outcome) => outcome.reply_for(api),
                // execute only returns None for text actions, handled above
                None => api.to_string(),
            },
        }
    }
}
