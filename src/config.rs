//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for outbound API calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ReplyConfig {
    /// Directory holding the persisted JSON documents.
    pub data_dir: PathBuf,
    /// Timeout applied to every outbound API call.
    pub http_timeout: Duration,
    /// Sender ids the host treats as admins. `*` allows everyone.
    pub admins: Vec<String>,
    /// Sender id attached to lines typed into the CLI host.
    pub cli_sender: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/plugins/custom_command"),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            admins: vec!["*".to_string()],
            cli_sender: "local-user".to_string(),
        }
    }
}

impl ReplyConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let data_dir = std::env::var("CUSTOM_REPLY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let http_timeout = std::env::var("CUSTOM_REPLY_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        let admins = std::env::var("CUSTOM_REPLY_ADMINS")
            .map(|raw| parse_id_list(&raw))
            .unwrap_or(defaults.admins);

        let cli_sender =
            std::env::var("CUSTOM_REPLY_SENDER").unwrap_or(defaults.cli_sender);

        Self {
            data_dir,
            http_timeout,
            admins,
            cli_sender,
        }
    }

    /// Whether the host should accept admin commands from this sender.
    pub fn is_admin(&self, sender_id: &str) -> bool {
        self.admins.iter().any(|a| a == "*" || a == sender_id)
    }
}

fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
