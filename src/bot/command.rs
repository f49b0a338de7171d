//! Inbound events and the text command parser.
//!
//! Text channels turn `/command [subcommand] key=value … free text` into a
//! `CommandInvoked` event; anything that does not start with `/` is a
//! direct message.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Commands whose first bare word is a subcommand rather than free text.
const SUBCOMMAND_COMMANDS: &[&str] = &[
    "start",
    "plan",
    "habits",
    "pushmode",
    "hiring",
    "admin_state",
    "admin_actions",
    "admin_memory",
    "admin_config",
    "admin_reports",
];

/// One unit of input from a chat surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    CommandInvoked {
        user_id: String,
        #[serde(default)]
        user_name: Option<String>,
        command: String,
        #[serde(default)]
        subcommand: Option<String>,
        #[serde(default)]
        options: BTreeMap<String, String>,
        /// Free text after the options.
        #[serde(default)]
        text: String,
        /// Platform roles, used for admin authorization.
        #[serde(default)]
        roles: Vec<String>,
    },
    DirectMessageReceived {
        user_id: String,
        #[serde(default)]
        user_name: Option<String>,
        text: String,
    },
}

impl InboundEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::CommandInvoked { user_id, .. } | Self::DirectMessageReceived { user_id, .. } => {
                user_id
            }
        }
    }

    /// Display name, falling back to the user id.
    pub fn user_name(&self) -> &str {
        match self {
            Self::CommandInvoked {
                user_id, user_name, ..
            }
            | Self::DirectMessageReceived {
                user_id, user_name, ..
            } => user_name.as_deref().unwrap_or(user_id),
        }
    }

    /// Parse a line typed into a text channel.
    pub fn from_text(user_id: &str, user_name: Option<&str>, text: &str) -> Self {
        let trimmed = text.trim();
        let user_id = user_id.to_string();
        let user_name = user_name.map(String::from);

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::DirectMessageReceived {
                user_id,
                user_name,
                text: trimmed.to_string(),
            };
        };

        let (head, mut rest) = split_word(rest);
        // Telegram appends the bot name in groups: /plan@coach_bot
        let command = head
            .split('@')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut subcommand = None;
        if SUBCOMMAND_COMMANDS.contains(&command.as_str()) {
            let (word, after) = split_word(rest);
            if !word.is_empty() && !word.contains('=') {
                subcommand = Some(word.to_ascii_lowercase());
                rest = after;
            }
        }

        let (options, text) = parse_options(rest);

        Self::CommandInvoked {
            user_id,
            user_name,
            command,
            subcommand,
            options,
            text,
            roles: Vec::new(),
        }
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Leading `key=value` pairs (values may be double-quoted), then free text.
fn parse_options(mut rest: &str) -> (BTreeMap<String, String>, String) {
    let mut options = BTreeMap::new();
    loop {
        rest = rest.trim_start();
        let Some(eq) = rest.find('=') else { break };
        let key = &rest[..eq];
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            break;
        }

        let after = &rest[eq + 1..];
        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(char::is_whitespace) {
                Some(i) => (&after[..i], &after[i..]),
                None => (after, ""),
            },
        };
        options.insert(key.to_ascii_lowercase(), value.to_string());
        rest = remaining;
    }
    (options, rest.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(text: &str) -> (String, Option<String>, BTreeMap<String, String>, String) {
        match InboundEvent::from_text("U1", None, text) {
            InboundEvent::CommandInvoked {
                command,
                subcommand,
                options,
                text,
                ..
            } => (command, subcommand, options, text),
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_direct_message() {
        let event = InboundEvent::from_text("U1", Some("ana"), "  about 8k a month ");
        assert_eq!(
            event,
            InboundEvent::DirectMessageReceived {
                user_id: "U1".into(),
                user_name: Some("ana".into()),
                text: "about 8k a month".into(),
            }
        );
        assert_eq!(event.user_name(), "ana");
    }

    #[test]
    fn bare_command() {
        let (cmd, sub, opts, text) = command("/START");
        assert_eq!(cmd, "start");
        assert!(sub.is_none());
        assert!(opts.is_empty());
        assert!(text.is_empty());
    }

    #[test]
    fn subcommand_and_options() {
        let (cmd, sub, opts, text) =
            command("/habits add frequency=custom cron=\"0 9 * * *\" Call five leads");
        assert_eq!(cmd, "habits");
        assert_eq!(sub.as_deref(), Some("add"));
        assert_eq!(opts["frequency"], "custom");
        assert_eq!(opts["cron"], "0 9 * * *");
        assert_eq!(text, "Call five leads");
    }

    #[test]
    fn free_text_commands_keep_first_word() {
        let (cmd, sub, _, text) = command("/mindset feeling stuck today");
        assert_eq!(cmd, "mindset");
        assert!(sub.is_none());
        assert_eq!(text, "feeling stuck today");
    }

    #[test]
    fn options_stop_at_free_text() {
        let (_, _, opts, text) = command("/marketing type=emails Launch week, price=5k");
        assert_eq!(opts.len(), 1);
        assert_eq!(opts["type"], "emails");
        assert_eq!(text, "Launch week, price=5k");
    }

    #[test]
    fn bot_suffix_is_dropped() {
        let (cmd, sub, _, _) = command("/plan@coach_bot view");
        assert_eq!(cmd, "plan");
        assert_eq!(sub.as_deref(), Some("view"));
    }

    #[test]
    fn json_shape() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"type":"command_invoked","user_id":"U9","command":"admin_reports","subcommand":"stages","roles":["ops"]}"#,
        )
        .unwrap();
        assert_eq!(event.user_id(), "U9");
        assert_eq!(event.user_name(), "U9");
        match event {
            InboundEvent::CommandInvoked { options, text, roles, .. } => {
                assert!(options.is_empty());
                assert!(text.is_empty());
                assert_eq!(roles, vec!["ops"]);
            }
            _ => panic!("wrong variant"),
        }
    }
}
