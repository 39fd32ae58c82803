use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{CommandSpec, MEME_COMMANDS, NO_ARG_COMMANDS, RAW_ARG_COMMANDS};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub caption: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            caption: None,
            command_args: BTreeMap::new(),
        }
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let remainder = &slash_tail[command_len..];
            let arg = if remainder.is_empty() {
                ""
            } else {
                remainder.trim()
            };

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let key = if action == "add_image" { "url" } else { "target" };
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert(key.to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if MEME_COMMANDS.iter().any(|value| *value == command) {
                return meme_intent(text, arg);
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    // Bare chat text is a caption for the default stored image.
    let mut intent = Intent::new("render_meme", text);
    intent.caption = Some(raw_trimmed.to_string());
    intent
}

/// `/meme [index] [caption...]` — an all-digit first token selects the
/// stored image, everything after it is the caption.
fn meme_intent(raw: &str, arg: &str) -> Intent {
    let mut intent = Intent::new("render_meme", raw);
    let mut caption = arg;

    let mut parts = arg.splitn(2, char::is_whitespace);
    if let Some(head) = parts.next() {
        if !head.is_empty() && head.chars().all(|ch| ch.is_ascii_digit()) {
            if let Ok(index) = head.parse::<u64>() {
                intent
                    .command_args
                    .insert("index".to_string(), Value::Number(index.into()));
                caption = parts.next().map(str::trim).unwrap_or("");
            }
        }
    }

    if !caption.is_empty() {
        intent.caption = Some(caption.to_string());
    }
    intent
}
