use crate::common::emit_assistant;
use crate::correlate::{Rule, Scope, skip};
use crate::fields::{Role, first_id, first_str, is_truthy, normalize_role};
use crate::{SchemaProfile, TranscriptSchema, has_jsonl_ext};
use sessdiag_core::{DiagEvent, TextLayout};
use sessdiag_core::extract::extract_text;
use sessdiag_core::format::{CallFormat, Labelled};
use serde_json::Value;
use std::path::Path;

pub struct PiSchema;

const HEADER_TYPES: &[&str] = &["session", "model_change", "thinking_level_change"];

const CALL_FORMAT: CallFormat = CallFormat {
    path_keys: &["path", "file_path"],
    command_keys: &["command", "cmd"],
    edit_pairs: &[("oldText", "newText"), ("search", "replace")],
    labelled: &[Labelled::named("pattern"), Labelled::bare("query")],
    write_tools: &["write", "file_actions", "create"],
};

static PROFILE: SchemaProfile = SchemaProfile {
    call_format: &CALL_FORMAT,
    suppressed_prefixes: &[],
    strips_markup: false,
    opaque_args: true,
    assistant_layout: TextLayout::Indented,
    call_id_keys: &["id"],
    result_id_keys: &["toolCallId", "tool_call_id"],
};

static RULES: &[Rule] = &[
    Rule {
        label: "header",
        matches: is_header,
        extract: skip,
    },
    Rule {
        label: "message",
        matches: is_message,
        extract: message,
    },
];

impl TranscriptSchema for PiSchema {
    fn name(&self) -> &'static str {
        "pi"
    }

    fn can_parse(&self, path: &Path) -> bool {
        has_jsonl_ext(path) && path.to_str().is_some_and(|s| s.contains(".pi/"))
    }

    fn recognizes(&self, record: &Value) -> bool {
        match record_type(record) {
            Some("message") => record
                .get("message")
                .and_then(|m| m.get("role"))
                .is_some_and(Value::is_string),
            Some(t) => HEADER_TYPES.contains(&t),
            None => false,
        }
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

fn is_header(record: &Value) -> bool {
    record_type(record).is_some_and(|t| HEADER_TYPES.contains(&t))
}

fn is_message(record: &Value) -> bool {
    record_type(record) == Some("message") && record.get("message").is_some_and(Value::is_object)
}

fn message(scope: &mut Scope<'_>, record: &Value) {
    let Some(msg) = record.get("message") else {
        return;
    };
    let role = msg
        .get("role")
        .and_then(Value::as_str)
        .map(normalize_role)
        .unwrap_or(Role::Other);
    match role {
        Role::User => scope.emit_user_text(&extract_text(msg.get("content"))),
        Role::Assistant => emit_assistant(scope, msg.get("content")),
        Role::ToolResult => {
            let id = first_id(msg, scope.profile().result_id_keys);
            let name =
                scope.resolve_result(id.as_deref(), first_str(msg, &["toolName", "tool_name"]));
            let is_error = is_truthy(msg.get("isError")) || is_truthy(msg.get("is_error"));
            scope.emit(DiagEvent::tool_result(
                name,
                is_error,
                extract_text(msg.get("content")),
            ));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process;
    use sessdiag_core::config::TruncationLimits;
    use serde_json::json;

    fn run(records: Vec<Value>) -> Vec<String> {
        process(&PiSchema, records, TruncationLimits::default())
    }

    fn msg(message: Value) -> Value {
        json!({"type": "message", "id": "m", "message": message})
    }

    #[test]
    fn test_headers_dropped() {
        let records = vec![
            json!({"type": "session", "id": "s1", "cwd": "/w"}),
            json!({"type": "model_change", "model": "m"}),
            json!({"type": "thinking_level_change", "level": "high"}),
        ];
        assert!(run(records).is_empty());
    }

    #[test]
    fn test_user_text_is_not_filtered() {
        let records = vec![
            msg(json!({"role": "user", "content": [{"type": "text", "text": "Caveat: keep"}]})),
            msg(json!({"role": "user", "content": "<b>raw</b>"})),
        ];
        assert_eq!(run(records), vec!["USER: Caveat: keep", "USER: <b>raw</b>"]);
    }

    #[test]
    fn test_tool_call_and_result() {
        let records = vec![
            msg(json!({"role": "assistant", "content": [
                {"type": "thinking", "thinking": "plan"},
                {"type": "text", "text": "Running it."},
                {"type": "toolCall", "id": "call_1", "name": "bash", "arguments": {"cmd": "ls"}}
            ]})),
            msg(json!({"role": "toolResult", "toolCallId": "call_1", "toolName": "other",
                       "content": [{"type": "text", "text": "a.txt"}], "isError": false})),
        ];
        assert_eq!(
            run(records),
            vec!["A: Running it.\n  [bash] `ls`", "TOOL [bash]: ✓ a.txt"]
        );
    }

    #[test]
    fn test_assistant_keeps_blank_continuation_lines() {
        let records = vec![msg(json!({"role": "assistant", "content": [
            {"type": "text", "text": "one\n\ntwo"}
        ]}))];
        assert_eq!(run(records), vec!["A: one\n   \n   two"]);
    }

    #[test]
    fn test_result_falls_back_to_tool_name() {
        let records = vec![msg(json!({"role": "toolResult", "toolCallId": "gone",
                                      "toolName": "read", "content": "x", "isError": true}))];
        assert_eq!(run(records), vec!["TOOL [read]: ✗ x"]);
    }

    #[test]
    fn test_result_placeholder() {
        let records = vec![msg(json!({"role": "toolResult", "content": []}))];
        assert_eq!(run(records), vec!["TOOL [tool]: ✓"]);
    }

    #[test]
    fn test_write_and_query_arguments() {
        let records = vec![msg(json!({"role": "assistant", "content": [
            {"type": "toolCall", "id": "w", "name": "write",
             "arguments": {"path": "/n.md", "content": "hello"}},
            {"type": "toolCall", "id": "q", "name": "search", "arguments": {"query": "needle"}}
        ]}))];
        assert_eq!(
            run(records),
            vec!["A:\n  [write] /n.md content=\"hello\"\n  [search] \"needle\""]
        );
    }

    #[test]
    fn test_non_message_records_dropped() {
        let records = vec![
            json!({"type": "message", "message": "not an object"}),
            json!({"type": "custom", "data": {}}),
        ];
        assert!(run(records).is_empty());
    }
}
