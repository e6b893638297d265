//! Engine facade — loads every structure once and wires the components.

use std::sync::Arc;

use tracing::info;

use crate::access::AccessGate;
use crate::actions::ActionRegistry;
use crate::commands::{AdminCommand, AdminHandler, CommandParser};
use crate::config::ReplyConfig;
use crate::credentials::CredentialPool;
use crate::dispatch::{Dispatcher, InboundMessage};
use crate::error::HttpError;
use crate::http::HttpExecutor;
use crate::store::DocumentStore;

/// What the engine made of one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to send.
    Silent,
    /// Reply text for the sender.
    Text(String),
}

impl Reply {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Silent => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// All engine components, shared behind `Arc`s.
pub struct ReplyEngine {
    config: ReplyConfig,
    pub registry: Arc<ActionRegistry>,
    pub credentials: Arc<CredentialPool>,
    pub gate: Arc<AccessGate>,
    pub dispatcher: Dispatcher,
    pub admin: AdminHandler,
}

impl ReplyEngine {
    /// Load persisted state from `store`. Unreadable documents start empty.
    pub async fn load(
        config: ReplyConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, HttpError> {
        let registry = Arc::new(ActionRegistry::load(Arc::clone(&store)).await);
        let credentials = Arc::new(CredentialPool::load(Arc::clone(&store)).await);
        let gate = Arc::new(AccessGate::load(store).await);
        let executor = Arc::new(HttpExecutor::new(
            Arc::clone(&credentials),
            config.http_timeout,
        )?);

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&gate),
            Arc::clone(&executor),
        );
        let admin = AdminHandler::new(
            Arc::clone(&registry),
            Arc::clone(&credentials),
            Arc::clone(&gate),
            executor,
        );

        info!(timeout_secs = config.http_timeout.as_secs(), "Reply engine ready");
        Ok(Self {
            config,
            registry,
            credentials,
            gate,
            dispatcher,
            admin,
        })
    }

    pub fn config(&self) -> &ReplyConfig {
        &self.config
    }

    /// Route one inbound message: command-group lines go to the admin surface
    /// (subject to the host admin list), everything else to the dispatcher.
    pub async fn on_message(&self, message: &dyn InboundMessage) -> Reply {
        let Some(parsed) = CommandParser::parse(message.text()) else {
            return match self.dispatcher.handle(message).await {
                Some(text) => Reply::Text(text),
                None => Reply::Silent,
            };
        };

        let command = match parsed {
            Ok(command) => command,
            Err(e) => {
                return Reply::Text(format!("❌ {e}\n\n{}", AdminCommand::help_text()));
            }
        };

        let sender = message.sender_id();
        if !command.is_read_only() && !self.config.is_admin(&sender) {
            info!(sender = %sender, "Admin command refused for non-admin sender");
            return Reply::Text("❌ This command requires admin permission".to_string());
        }

        Reply::Text(self.admin.execute(command).await)
    }
}
