//! Applies admin commands to the engine state and renders the replies.
//!
//! Permission checks belong to the host; by the time a command reaches
//! `AdminHandler` it is authorized. The access gate does not apply here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::access::AccessGate;
use crate::actions::{Action, ActionRegistry};
use crate::commands::parser::AdminCommand;
use crate::credentials::CredentialPool;
use crate::error::{AccessError, Error, RegistryError};
use crate::http::HttpExecutor;

pub struct AdminHandler {
    registry: Arc<ActionRegistry>,
    credentials: Arc<CredentialPool>,
    gate: Arc<AccessGate>,
    executor: Arc<HttpExecutor>,
}

impl AdminHandler {
    pub fn new(
        registry: Arc<ActionRegistry>,
        credentials: Arc<CredentialPool>,
        gate: Arc<AccessGate>,
        executor: Arc<HttpExecutor>,
    ) -> Self {
        Self {
            registry,
            credentials,
            gate,
            executor,
        }
    }

    /// Run a command and return the text to send back.
    pub async fn execute(&self, command: AdminCommand) -> String {
        match command {
            AdminCommand::Help => AdminCommand::help_text().to_string(),

            AdminCommand::AddReply { keyword, text } => {
                match self.registry.put(&keyword, Action::text(text.clone())).await {
                    Ok(_) => format!("✅ Added keyword reply: [{keyword}] -> {text}"),
                    Err(e) => failure("save the reply", e),
                }
            }
            AdminCommand::ListReplies => self.list_replies().await,
            AdminCommand::DeleteReply { keyword } => match self.registry.delete(&keyword).await {
                Ok(_) => format!("✅ Deleted keyword: {}", keyword.trim().to_lowercase()),
                Err(RegistryError::NotFound { keyword }) => {
                    format!("❌ Keyword not found: {keyword}")
                }
                Err(e) => failure("delete the keyword", e),
            },

            AdminCommand::AddToken { token } => match self.credentials.append(&token).await {
                Ok(index) => format!("✅ API token added at index {index}"),
                Err(e) => failure("add the token", e),
            },
            AdminCommand::UpdateToken { index, token } => {
                match self.credentials.update(index, &token).await {
                    Ok(()) => format!("✅ API token {index} updated"),
                    Err(e) => failure("update the token", e),
                }
            }
            AdminCommand::RemoveToken { index } => self.remove_token(index).await,
            AdminCommand::ListTokens => self.list_tokens().await,
            AdminCommand::SetLegacyToken { token } => {
                match self.credentials.set_legacy(&token).await {
                    Ok(()) => "✅ Fallback API token set".to_string(),
                    Err(e) => failure("set the fallback token", e),
                }
            }

            AdminCommand::AllowAdd { id } => match self.gate.add(&id).await {
                Ok(true) => format!("✅ Added {id} to the allow-list"),
                Ok(false) => format!("ℹ️ {id} is already on the allow-list"),
                Err(e) => failure("update the allow-list", e),
            },
            AdminCommand::AllowRemove { id } => match self.gate.remove(&id).await {
                Ok(()) => format!("✅ Removed {id} from the allow-list"),
                Err(AccessError::NotFound { id }) => format!("❌ {id} is not on the allow-list"),
                Err(e) => failure("update the allow-list", e),
            },
            AdminCommand::AllowList => self.list_allowed().await,
            AdminCommand::AllowToggle => match self.gate.toggle().await {
                Ok(enabled) => gate_state_message(enabled),
                Err(e) => failure("switch the allow-list", e),
            },
            AdminCommand::AllowSet { enabled } => match self.gate.set_enabled(enabled).await {
                Ok(_) => gate_state_message(enabled),
                Err(e) => failure("switch the allow-list", e),
            },

            AdminCommand::RegisterGet {
                keyword,
                endpoint,
                token_index,
            } => {
                self.register_and_call(&keyword, Action::get_api(endpoint, token_index))
                    .await
            }
            AdminCommand::RegisterPost {
                keyword,
                endpoint,
                payload,
                code_map,
                token_index,
            } => {
                let action = Action::post_api(endpoint, payload, token_index, code_map);
                self.register_and_call(&keyword, action).await
            }
        }
    }

    /// Persist an API action, then run it once and report the live result.
    async fn register_and_call(&self, keyword: &str, action: Action) -> String {
        if let Err(e) = self.registry.put(keyword, action.clone()).await {
            return failure("save the API action", e);
        }
        let keyword = keyword.trim().to_lowercase();
        info!(keyword = %keyword, action = action.kind(), "API action registered, running first call");

        let reply = match self.executor.execute(&action).await {
            Some(outcome) => outcome.reply_for(&action),
            None => action.to_string(),
        };
        format!("✅ Registered [{keyword}] -> {action}\n{reply}")
    }

    async fn list_replies(&self) -> String {
        let entries = self.registry.list().await;
        if entries.is_empty() {
            return "No custom replies yet".to_string();
        }
        let lines: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, (keyword, action))| format!("{}. [{keyword}] -> {action}", i + 1))
            .collect();
        format!("Current keyword replies:\n{}", lines.join("\n"))
    }

    async fn remove_token(&self, index: usize) -> String {
        if let Err(e) = self.credentials.remove(index).await {
            return failure("remove the token", e);
        }

        let remaining = self.credentials.len().await;
        let mut lines = vec![format!("✅ API token {index} removed")];
        for (keyword, stored) in self.registry.keywords_with_token_index_from(index).await {
            let note = if stored >= remaining {
                format!("⚠️ [{keyword}] uses token #{stored}, now out of range; it falls back to the default token")
            } else {
                format!(
                    "⚠️ [{keyword}] uses token #{stored}, which now holds the token formerly at #{}",
                    stored + 1
                )
            };
            warn!(keyword = %keyword, token_index = stored, "Credential removal shifted an action's token");
            lines.push(note);
        }
        lines.join("\n")
    }

    async fn list_tokens(&self) -> String {
        let tokens = self.credentials.list_masked().await;
        let legacy = self.credentials.legacy_masked().await;
        if tokens.is_empty() && legacy.is_none() {
            return "No API tokens configured".to_string();
        }
        let mut lines = vec!["API tokens:".to_string()];
        lines.extend(tokens.iter().enumerate().map(|(i, t)| format!("{i}. {t}")));
        if let Some(legacy) = legacy {
            lines.push(format!("fallback: {legacy}"));
        }
        lines.join("\n")
    }

    async fn list_allowed(&self) -> String {
        let snapshot = self.gate.snapshot().await;
        let state = if snapshot.enabled { "on" } else { "off" };
        if snapshot.ids.is_empty() {
            return format!("Allow-list is {state} and empty");
        }
        format!("Allow-list is {state}:\n{}", snapshot.ids.join("\n"))
    }
}

fn gate_state_message(enabled: bool) -> String {
    if enabled {
        "✅ Allow-list on: only listed senders get automatic replies".to_string()
    } else {
        "✅ Allow-list off: everyone gets automatic replies".to_string()
    }
}

fn failure(what: &str, e: impl Into<Error>) -> String {
    let e = e.into();
    warn!("Admin command failed: {}", e);
    match e {
        Error::Validation(v) => format!("❌ {v}"),
        Error::Credential(c) => format!("❌ {c}"),
        other => format!("❌ Failed to {what}: {other}"),
    }
}
