//! Parses `/`-prefixed admin lines into `AdminCommand`s.
//!
//! Arguments are split with shell-style quoting, so multi-word values are
//! written as `"two words"`. Payload entries and status overrides use
//! repeatable flags: `--key k --value v`, `--code 404 --reply "not found"`.
//! Only lines starting with a known command group are parsed here.

use crate::actions::{CodeMap, Payload, build_code_map, build_payload};
use crate::error::ValidationError;

const HELP_TEXT: &str = "\
Commands:
  /reply add <keyword> <text>      bind a static reply
  /reply list                      show all bindings
  /reply del <keyword>             remove a binding
  /token add <token>               append an API token
  /token set <index> <token>       replace the token at index
  /token del <index>               remove the token at index
  /token list                      show masked tokens
  /token legacy <token>            set the single fallback token
  /allow add|del <id>              edit the allow-list
  /allow list                      show the allow-list
  /allow toggle|on|off             switch the allow-list
  /api get <keyword> <endpoint> [--token N]
  /api post <keyword> <endpoint> [--key K --value V]... [--code C --reply R]... [--token N]";

/// First words that mark a line as an admin command.
const COMMAND_GROUPS: [&str; 5] = ["/help", "/reply", "/token", "/allow", "/api"];

/// A parsed admin command.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Help,
    AddReply { keyword: String, text: String },
    ListReplies,
    DeleteReply { keyword: String },
    AddToken { token: String },
    UpdateToken { index: usize, token: String },
    RemoveToken { index: usize },
    ListTokens,
    SetLegacyToken { token: String },
    AllowAdd { id: String },
    AllowRemove { id: String },
    AllowList,
    AllowToggle,
    AllowSet { enabled: bool },
    RegisterGet {
        keyword: String,
        endpoint: String,
        token_index: Option<usize>,
    },
    RegisterPost {
        keyword: String,
        endpoint: String,
        payload: Payload,
        code_map: Option<CodeMap>,
        token_index: Option<usize>,
    },
}

impl AdminCommand {
    /// Commands that only read state; hosts may let anyone run these.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Help | Self::ListReplies | Self::ListTokens | Self::AllowList
        )
    }

    pub fn help_text() -> &'static str {
        HELP_TEXT
    }
}

/// Parses admin lines.
pub struct CommandParser;

impl CommandParser {
    /// `None` if the line does not start with a command group. Other
    /// `/`-prefixed text is ordinary message content.
    pub fn parse(line: &str) -> Option<Result<AdminCommand, ValidationError>> {
        let trimmed = line.trim();
        if !Self::is_command(trimmed) {
            return None;
        }
        Some(parse_tokens(trimmed))
    }

    pub fn is_command(line: &str) -> bool {
        let group = line.split_whitespace().next().unwrap_or_default();
        COMMAND_GROUPS
            .iter()
            .any(|known| group.eq_ignore_ascii_case(known))
    }
}

fn parse_tokens(line: &str) -> Result<AdminCommand, ValidationError> {
    let tokens = shell_words::split(line).map_err(|e| ValidationError::Tokenize(e.to_string()))?;
    let mut args = tokens.into_iter();
    let group = args.next().unwrap_or_default().to_lowercase();
    let sub = args.next().map(|s| s.to_lowercase()).unwrap_or_default();
    let rest: Vec<String> = args.collect();

    match (group.as_str(), sub.as_str()) {
        ("/help", _) => Ok(AdminCommand::Help),

        ("/reply", "add") => {
            let (keyword, text) = rest
                .split_first()
                .ok_or_else(|| missing("keyword"))?;
            let keyword = non_empty("keyword", keyword)?;
            let text = non_empty("reply text", &text.join(" "))?;
            Ok(AdminCommand::AddReply { keyword, text })
        }
        ("/reply", "list") => Ok(AdminCommand::ListReplies),
        ("/reply", "del") => Ok(AdminCommand::DeleteReply {
            keyword: non_empty("keyword", first(&rest, "keyword")?)?,
        }),

        ("/token", "add") => Ok(AdminCommand::AddToken {
            token: non_empty("token", first(&rest, "token")?)?,
        }),
        ("/token", "set") => {
            let index = parse_index(first(&rest, "index")?)?;
            let token = non_empty("token", rest.get(1).ok_or_else(|| missing("token"))?)?;
            Ok(AdminCommand::UpdateToken { index, token })
        }
        ("/token", "del") => Ok(AdminCommand::RemoveToken {
            index: parse_index(first(&rest, "index")?)?,
        }),
        ("/token", "list") => Ok(AdminCommand::ListTokens),
        ("/token", "legacy") => Ok(AdminCommand::SetLegacyToken {
            token: non_empty("token", first(&rest, "token")?)?,
        }),

        ("/allow", "add") => Ok(AdminCommand::AllowAdd {
            id: non_empty("sender id", first(&rest, "sender id")?)?,
        }),
        ("/allow", "del") => Ok(AdminCommand::AllowRemove {
            id: non_empty("sender id", first(&rest, "sender id")?)?,
        }),
        ("/allow", "list") => Ok(AdminCommand::AllowList),
        ("/allow", "toggle") => Ok(AdminCommand::AllowToggle),
        ("/allow", "on") => Ok(AdminCommand::AllowSet { enabled: true }),
        ("/allow", "off") => Ok(AdminCommand::AllowSet { enabled: false }),

        ("/api", "get") => {
            let call = ApiArgs::parse(&rest)?;
            if !call.keys.is_empty() || !call.codes.is_empty() {
                return Err(ValidationError::UnexpectedArgument(
                    "GET actions take no payload or status overrides".into(),
                ));
            }
            Ok(AdminCommand::RegisterGet {
                keyword: call.keyword,
                endpoint: call.endpoint,
                token_index: call.token_index,
            })
        }
        ("/api", "post") => {
            let call = ApiArgs::parse(&rest)?;
            let payload = build_payload(&call.keys, &call.values)?;
            let code_map = build_code_map(&call.codes, &call.replies)?;
            Ok(AdminCommand::RegisterPost {
                keyword: call.keyword,
                endpoint: call.endpoint,
                payload,
                code_map,
                token_index: call.token_index,
            })
        }

        _ => Err(ValidationError::UnknownCommand(
            format!("{group} {sub}").trim().to_string(),
        )),
    }
}

/// Positional keyword/endpoint plus repeatable flags.
#[derive(Debug, Default)]
struct ApiArgs {
    keyword: String,
    endpoint: String,
    keys: Vec<String>,
    values: Vec<String>,
    codes: Vec<String>,
    replies: Vec<String>,
    token_index: Option<usize>,
}

impl ApiArgs {
    fn parse(args: &[String]) -> Result<Self, ValidationError> {
        let mut parsed = Self::default();
        let mut positional = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut flag_value = |name: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| missing(&format!("value for {name}")))
            };
            match arg.as_str() {
                "--key" => parsed.keys.push(flag_value("--key")?),
                "--value" => parsed.values.push(flag_value("--value")?),
                "--code" => parsed.codes.push(flag_value("--code")?),
                "--reply" => parsed.replies.push(flag_value("--reply")?),
                "--token" => parsed.token_index = Some(parse_index(&flag_value("--token")?)?),
                _ => positional.push(arg.clone()),
            }
        }

        let mut positional = positional.into_iter();
        parsed.keyword = non_empty("keyword", &positional.next().ok_or_else(|| missing("keyword"))?)?;
        parsed.endpoint =
            non_empty("endpoint", &positional.next().ok_or_else(|| missing("endpoint"))?)?;
        if let Some(extra) = positional.next() {
            return Err(ValidationError::UnexpectedArgument(extra));
        }
        Ok(parsed)
    }
}

fn missing(what: &str) -> ValidationError {
    ValidationError::MissingArgument(what.to_string())
}

fn first<'a>(rest: &'a [String], what: &str) -> Result<&'a String, ValidationError> {
    rest.first().ok_or_else(|| missing(what))
}

fn non_empty(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    Ok(value.to_string())
}

fn parse_index(raw: &str) -> Result<usize, ValidationError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ValidationError::NotAnInteger {
            field: "index".into(),
            value: raw.to_string(),
        })
}
