//! HTTP executor — one authenticated call, normalized into a `CallOutcome`.
//!
//! Failures never surface as `Err`: a missing token, a non-2xx status and a
//! transport error all become `ok == false` with a user-facing message. The
//! status code is kept on non-2xx responses so overrides still apply.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::actions::{Action, Payload};
use crate::credentials::CredentialPool;
use crate::error::HttpError;

/// Longest error body echoed back in a reply.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Reply used when no credential resolves.
pub const NO_TOKEN_MESSAGE: &str =
    "❌ API token not configured. Add one with /token add <token> first.";

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Normalized result of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub ok: bool,
    pub message: String,
    /// HTTP status, when a response was received at all.
    pub status: Option<u16>,
}

impl CallOutcome {
    fn failure(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            status,
        }
    }

    /// The reply to show: the action's override for this status if one is
    /// configured, otherwise the executor's own message.
    pub fn reply_for(&self, action: &Action) -> String {
        match action.override_for(self.status) {
            Some(reply) => reply.to_string(),
            None => self.message.clone(),
        }
    }
}

/// Issues authenticated GET/POST calls with a fixed timeout.
pub struct HttpExecutor {
    client: reqwest::Client,
    credentials: Arc<CredentialPool>,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(credentials: Arc<CredentialPool>, timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(Self {
            client,
            credentials,
            timeout,
        })
    }

    /// Run an API action. Returns `None` for text actions.
    pub async fn execute(&self, action: &Action) -> Option<CallOutcome> {
        match action {
            Action::Text { .. } => None,
            Action::GetApi {
                endpoint,
                token_index,
            } => Some(self.call(Method::Get, endpoint, None, *token_index).await),
            Action::PostApi {
                endpoint,
                payload,
                token_index,
                ..
            } => Some(
                self.call(Method::Post, endpoint, Some(payload), *token_index)
                    .await,
            ),
        }
    }

    /// Issue one call. The token is resolved first; without one no request is made.
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&Payload>,
        token_index: Option<usize>,
    ) -> CallOutcome {
        let token = match self.credentials.resolve(token_index).await {
            Ok(token) => token,
            Err(e) => {
                warn!(endpoint, "No credential for API call: {}", e);
                return CallOutcome::failure(NO_TOKEN_MESSAGE, None);
            }
        };
        debug!(%method, endpoint, source = ?token.source, "Calling API");

        let request = match method {
            Method::Get => self.client.get(endpoint),
            Method::Post => self.client.post(endpoint),
        }
        .bearer_auth(token.secret.expose_secret())
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json");

        // Headers go first so `json` does not add a second Content-Type.
        let request = match method {
            Method::Get => request,
            Method::Post => {
                let empty = Payload::new();
                request.json(payload.unwrap_or(&empty))
            }
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%method, endpoint, "API call failed before a response: {}", e);
                return CallOutcome::failure(self.transport_message(&e), None);
            }
        };

        let status = response.status();
        let code = status.as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(%method, endpoint, status = code, "Failed to read API response body: {}", e);
                String::new()
            }
        };

        if !status.is_success() {
            info!(%method, endpoint, status = code, "API returned an error status");
            return CallOutcome::failure(error_message(code, &body), Some(code));
        }

        info!(%method, endpoint, status = code, "API call succeeded");
        CallOutcome {
            ok: true,
            message: success_message(&body),
            status: Some(code),
        }
    }

    fn transport_message(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!(
                "❌ API call failed: no response within {}s",
                self.timeout.as_secs()
            )
        } else if e.is_connect() {
            "❌ API call failed: could not connect to the endpoint".to_string()
        } else if e.is_builder() {
            "❌ API call failed: invalid endpoint URL".to_string()
        } else {
            "❌ API call failed: request error".to_string()
        }
    }
}

/// JSON bodies are pretty-printed; anything else passes through as text.
fn success_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => {
            let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string());
            format!("API response (JSON):\n{pretty}")
        }
        Err(_) => format!("API response (text):\n{body}"),
    }
}

fn error_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("❌ API call failed: HTTP {status}");
    }
    let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("❌ API call failed: HTTP {status}\n{snippet}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_bodies_are_pretty_printed() {
        let msg = success_message(r#"{"a":1}"#);
        assert_eq!(msg, "API response (JSON):\n{\n  \"a\": 1\n}");
    }

    #[test]
    fn non_json_bodies_pass_through() {
        assert_eq!(success_message("pong"), "API response (text):\npong");
    }

    #[test]
    fn error_message_includes_body_when_present() {
        assert_eq!(error_message(404, ""), "❌ API call failed: HTTP 404");
        assert_eq!(
            error_message(500, " boom "),
            "❌ API call failed: HTTP 500\nboom"
        );
    }

    #[test]
    fn error_body_is_truncated() {
        let long = "x".repeat(MAX_ERROR_BODY_CHARS * 2);
        let msg = error_message(502, &long);
        assert!(msg.len() < long.len());
    }

    #[test]
    fn reply_prefers_override() {
        let action = Action::post_api(
            "e",
            Payload::new(),
            None,
            crate::actions::build_code_map(&["404".into()], &["item not found".into()]).unwrap(),
        );
        let outcome = CallOutcome::failure("raw", Some(404));
        assert_eq!(outcome.reply_for(&action), "item not found");

        let outcome = CallOutcome::failure("raw", None);
        assert_eq!(outcome.reply_for(&action), "raw");
    }
}
