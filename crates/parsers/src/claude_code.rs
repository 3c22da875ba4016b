use crate::common::emit_assistant;
use crate::correlate::{Rule, Scope, skip};
use crate::fields::{Role, first_id, is_truthy, normalize_role};
use crate::{SchemaProfile, TranscriptSchema, has_jsonl_ext};
use sessdiag_core::{DiagEvent, TextLayout};
use sessdiag_core::event::COMMAND_TOOL;
use sessdiag_core::extract::extract_text;
use sessdiag_core::format::{CallFormat, Labelled};
use sessdiag_core::markup::{clean, command_name, has_command_name, has_local_stdout};
use serde_json::Value;
use std::path::Path;

pub struct ClaudeCodeSchema;

const RECORD_TYPES: &[&str] = &["user", "assistant", "summary", "file-history-snapshot", "system"];

const CALL_FORMAT: CallFormat = CallFormat {
    path_keys: &["file_path", "path"],
    command_keys: &["command"],
    edit_pairs: &[
        ("old_str", "new_str"),
        ("search", "replace"),
        ("oldText", "newText"),
    ],
    labelled: &[Labelled::named("pattern"), Labelled::named("regex")],
    write_tools: &[],
};

static PROFILE: SchemaProfile = SchemaProfile {
    call_format: &CALL_FORMAT,
    suppressed_prefixes: &[
        "Caveat:",
        "This session is being continued",
        "With your Claude Max subscription",
        "[Request interrupted",
    ],
    strips_markup: true,
    opaque_args: false,
    assistant_layout: TextLayout::Compact,
    call_id_keys: &["id"],
    result_id_keys: &["tool_use_id"],
};

static RULES: &[Rule] = &[
    Rule {
        label: "meta",
        matches: is_meta,
        extract: skip,
    },
    Rule {
        label: "compact-summary",
        matches: is_compact_summary,
        extract: compact_summary,
    },
    Rule {
        label: "message",
        matches: is_message,
        extract: message_envelope,
    },
];

impl TranscriptSchema for ClaudeCodeSchema {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn can_parse(&self, path: &Path) -> bool {
        has_jsonl_ext(path)
            && path
                .to_str()
                .is_some_and(|s| s.contains(".claude/projects"))
    }

    fn recognizes(&self, record: &Value) -> bool {
        record_type(record).is_some_and(|t| RECORD_TYPES.contains(&t))
            || record.get("isMeta").is_some()
            || record.get("isCompactSummary").is_some()
    }

    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    fn profile(&self) -> &'static SchemaProfile {
        &PROFILE
    }
}

fn record_type(record: &Value) -> Option<&str> {
    record.get("type").and_then(Value::as_str)
}

fn message(record: &Value) -> Option<&Value> {
    record.get("message").filter(|m| m.is_object())
}

fn is_meta(record: &Value) -> bool {
    is_truthy(record.get("isMeta")) || record_type(record) == Some("file-history-snapshot")
}

fn is_compact_summary(record: &Value) -> bool {
    is_truthy(record.get("isCompactSummary"))
}

fn is_message(record: &Value) -> bool {
    record_type(record).is_some_and(|t| t == "user" || t == "assistant")
        && message(record).is_some()
}

fn compact_summary(scope: &mut Scope<'_>, record: &Value) {
    let text = extract_text(record.get("message").and_then(|m| m.get("content")));
    scope.emit(DiagEvent::CompactSummary { text });
}

/// Dispatch on `message.role`; the record `type` only marks the envelope.
fn message_envelope(scope: &mut Scope<'_>, record: &Value) {
    let Some(msg) = message(record) else {
        return;
    };
    let role = msg
        .get("role")
        .and_then(Value::as_str)
        .map(normalize_role)
        .unwrap_or(Role::Other);
    match role {
        Role::User => user_message(scope, msg.get("content")),
        Role::Assistant => emit_assistant(scope, msg.get("content")),
        _ => tracing::trace!("Dropping Claude message without a usable role"),
    }
}

fn user_message(scope: &mut Scope<'_>, content: Option<&Value>) {
    match content {
        Some(Value::String(text)) => {
            if let Some(text) = command_echo(scope, text) {
                scope.emit_user_text(&text);
            }
        }
        Some(Value::Array(items)) => {
            let mut text_parts = Vec::new();
            for item in items {
                match item.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        let Some(text) = item.get("text").and_then(Value::as_str) else {
                            continue;
                        };
                        if let Some(text) = command_echo(scope, text) {
                            text_parts.push(text);
                        }
                    }
                    Some("tool_result") => tool_result(scope, item),
                    _ => {}
                }
            }
            if !text_parts.is_empty() {
                scope.emit_user_text(&text_parts.join("\n"));
            }
        }
        _ => {}
    }
}

/// Handle slash-command markup in one user text.
///
/// Command output is emitted straight away as a `cmd` result. Returns the
/// text still to be shown as a user message: `[cmd] name` for a command
/// echo, the raw text otherwise. Malformed command markup yields nothing.
fn command_echo(scope: &mut Scope<'_>, text: &str) -> Option<String> {
    if has_command_name(text) {
        return command_name(text).map(|name| format!("[cmd] {name}"));
    }
    if has_local_stdout(text) {
        let output = clean(text);
        if !output.is_empty() {
            scope.emit(DiagEvent::tool_result(COMMAND_TOOL, false, output));
        }
        return None;
    }
    Some(text.to_string())
}

fn tool_result(scope: &mut Scope<'_>, item: &Value) {
    let id = first_id(item, scope.profile().result_id_keys);
    let name = scope.resolve_result(id.as_deref(), None);
    let body = match item.get("content") {
        Some(Value::String(text)) => text.clone(),
        content => extract_text(content),
    };
    scope.emit(DiagEvent::tool_result(
        name,
        is_truthy(item.get("is_error")),
        body,
    ));
}
