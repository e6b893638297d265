//! Action model — what a keyword does when it fires.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// JSON body template sent by a POST action.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// HTTP status → replacement reply.
pub type CodeMap = BTreeMap<u16, String>;

/// A registered behavior bound to a keyword.
///
/// Persisted as `{"type": "text" | "get_api" | "post_api", ...}`. Unknown
/// tags fail to deserialize; the registry drops such entries on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Static reply text.
    Text { value: String },
    /// Authenticated GET; the response becomes the reply.
    GetApi {
        endpoint: String,
        #[serde(default)]
        token_index: Option<usize>,
    },
    /// Authenticated POST with a fixed JSON payload.
    PostApi {
        endpoint: String,
        #[serde(default)]
        payload: Payload,
        #[serde(default)]
        token_index: Option<usize>,
        #[serde(default, deserialize_with = "deserialize_code_map")]
        code_map: Option<CodeMap>,
    },
}

impl Action {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { value: body.into() }
    }

    pub fn get_api(endpoint: impl Into<String>, token_index: Option<usize>) -> Self {
        Self::GetApi {
            endpoint: endpoint.into(),
            token_index,
        }
    }

    /// Build a POST action. An empty code map is stored as `None`.
    pub fn post_api(
        endpoint: impl Into<String>,
        payload: Payload,
        token_index: Option<usize>,
        code_map: Option<CodeMap>,
    ) -> Self {
        Self::PostApi {
            endpoint: endpoint.into(),
            payload,
            token_index,
            code_map: code_map.filter(|m| !m.is_empty()),
        }
    }

    /// Short variant label used in listings and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::GetApi { .. } => "get_api",
            Self::PostApi { .. } => "post_api",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// Credential index this action asked for, if any.
    pub fn token_index(&self) -> Option<usize> {
        match self {
            Self::Text { .. } => None,
            Self::GetApi { token_index, .. } | Self::PostApi { token_index, .. } => *token_index,
        }
    }

    /// Configured replacement reply for an HTTP status, if one applies.
    pub fn override_for(&self, status: Option<u16>) -> Option<&str> {
        let status = status?;
        match self {
            Self::PostApi {
                code_map: Some(map),
                ..
            } => map.get(&status).map(String::as_str),
            _ => None,
        }
    }

    /// Parse one persisted entry. Older documents stored a bare string,
    /// which is read as a text action.
    pub fn from_document(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        match value {
            serde_json::Value::String(body) => Ok(Self::text(body)),
            other => serde_json::from_value(other),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { value } => write!(f, "{value}"),
            Self::GetApi {
                endpoint,
                token_index,
            } => {
                write!(f, "GET {endpoint}")?;
                write_token_index(f, *token_index)
            }
            Self::PostApi {
                endpoint,
                payload,
                token_index,
                code_map,
            } => {
                write!(f, "POST {endpoint}")?;
                if !payload.is_empty() {
                    write!(f, " payload={}", serde_json::Value::Object(payload.clone()))?;
                }
                write_token_index(f, *token_index)?;
                if let Some(map) = code_map {
                    let codes: Vec<String> = map.keys().map(u16::to_string).collect();
                    write!(f, " overrides=[{}]", codes.join(","))?;
                }
                Ok(())
            }
        }
    }
}

fn write_token_index(f: &mut fmt::Formatter<'_>, token_index: Option<usize>) -> fmt::Result {
    match token_index {
        Some(i) => write!(f, " (token #{i})"),
        None => Ok(()),
    }
}

/// Trim and case-fold a keyword or inbound message.
pub fn normalize_keyword(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Read a payload value typed by an operator: valid JSON keeps its type
/// (`true`, `42`, `null`, `"quoted"`), anything else stays a plain string.
pub fn coerce_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// Zip payload keys with their coerced values.
pub fn build_payload(keys: &[String], values: &[String]) -> Result<Payload, ValidationError> {
    if keys.len() != values.len() {
        return Err(ValidationError::LengthMismatch {
            left: "payload keys".into(),
            right: "payload values".into(),
            left_len: keys.len(),
            right_len: values.len(),
        });
    }
    let mut payload = Payload::new();
    for (key, value) in keys.iter().zip(values) {
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::EmptyField("payload key".into()));
        }
        payload.insert(key.to_string(), coerce_value(value));
    }
    Ok(payload)
}

/// Zip status codes with override replies. Every code must be an integer.
pub fn build_code_map(
    codes: &[String],
    replies: &[String],
) -> Result<Option<CodeMap>, ValidationError> {
    if codes.len() != replies.len() {
        return Err(ValidationError::LengthMismatch {
            left: "status codes".into(),
            right: "override replies".into(),
            left_len: codes.len(),
            right_len: replies.len(),
        });
    }
    let mut map = CodeMap::new();
    for (code, reply) in codes.iter().zip(replies) {
        let status = code
            .trim()
            .parse::<u16>()
            .map_err(|_| ValidationError::NotAnInteger {
                field: "status code".into(),
                value: code.clone(),
            })?;
        map.insert(status, reply.clone());
    }
    Ok(Some(map).filter(|m| !m.is_empty()))
}

/// Stored code maps have string keys; keep the integer ones and drop the rest.
fn deserialize_code_map<'de, D>(deserializer: D) -> Result<Option<CodeMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Map<String, serde_json::Value>> =
        Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let map: CodeMap = raw
        .into_iter()
        .filter_map(|(code, reply)| {
            let status = code.trim().parse::<u16>().ok()?;
            let reply = match reply {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Some((status, reply))
        })
        .collect();

    Ok(Some(map).filter(|m| !m.is_empty()))
}
