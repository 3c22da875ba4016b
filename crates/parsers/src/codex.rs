use crate::common::{call_args, emit_assistant};
use crate::correlate::{Rule, Scope, dispatch, skip};
use crate::fields::{
    Role, detect_role, first_id, first_str, first_truthy, first_value, is_truthy, normalize_role,
};
use crate::{SchemaProfile, TranscriptSchema, has_jsonl_ext};
use sessdiag_core::{DiagEvent, TextLayout};
use sessdiag_core::extract::flatten_text;
use sessdiag_core::format::{CallFormat, Labelled};
use serde_json::Value;
use std::path::Path;

pub struct CodexSchema;

const METADATA_TYPES: &[&str] = &["session_meta", "turn_context", "event_msg"];
const CALL_TYPES: &[&str] = &["function_call", "function-call", "functioncall", "custom_tool_call"];
const OUTPUT_TYPES: &[&str] = &[
    "function_call_output",
    "function-output",
    "functionoutput",
    "custom_tool_call_output",
];
const RECOGNIZED_TYPES: &[&str] = &[
    "session_meta",
    "response_item",
    "event_msg",
    "turn_context",
    "function_call",
    "function_call_output",
    "reasoning",
];

/// Injected context blocks that are not something the user typed.
const INJECTED_PREFIXES: &[&str] = &["<environment_context>", "<user_instructions>"];
/// Markup-led user blocks longer than this are treated as injected context.
const INJECTED_BLOCK_MIN_CHARS: usize = 500;

/// Top-level text keys; the first one present wins even when empty.
const ENVELOPE_TEXT_KEYS: &[&str] = &["content", "text", "message", "body"];
const CHOICE_TEXT_KEYS: &[&str] = &["message", "text", "content"];
const NESTED_CONTAINERS: &[&str] = &["message", "msg", "payload"];
const NESTED_TEXT_KEYS: &[&str] = &["content", "text", "body"];

const CALL_FORMAT: CallFormat = CallFormat {
    path_keys: &["path", "file_path"],
    command_keys: &["command"],
    edit_pairs: &[
        ("old_str", "new_str"),
        ("search", "replace"),
        ("oldText", "newText"),
    ],
    labelled: &[Labelled::named("pattern")],
    write_tools: &[],
};

static PROFILE: SchemaProfile = SchemaProfile {
    call_format: &CALL_FORMAT,
    suppressed_prefixes: &[],
    strips_markup: false,
    opaque_args: true,
    assistant_layout: TextLayout::Compact,
    call_id_keys: &["call_id", "tool_call_id", "id"],
    result_id_keys: &["call_id", "tool_call_id"],
};

/// Rules shared by top-level records and `response_item` payloads.
static ITEM_RULES: &[Rule] = &[
    Rule {
        label: "reasoning",
        matches: is_reasoning,
        extract: reasoning,
    },
    Rule {
        label: "function-call",
        matches: is_call,
        extract: function_call,
    },
    Rule {
        label: "function-output",
        matches: is_output,
        extract: function_output,
    },
];

static RULES: &[Rule] = &[
    Rule {
        label: "metadata",
        matches: is_metadata,
        extract: skip,
    },
    Rule {
        label: "reasoning",
        matches: is_reasoning,
        extract: reasoning,
    },
    Rule {
        label: "function-call",
        matches: is_call,
        extract: function_call,
    },
    Rule {
        label: "function-output",
        matches: is_output,
        extract: function_output,
    },
    Rule {
        label: "response-item",
        matches: is_response_item,
        extract: response_item,
    },
    Rule {
        label: "envelope",
        matches: any_record,
        extract: envelope,
    },
];

impl TranscriptSchema for CodexSchema {
    fn name(&self) -> &'static str {
        "codex"
    }

    fn can_parse(&self, path: &Path) -> bool {
        has_jsonl_ext(path)
            && path
                .to_str()
                .is_some_and(|s| s.contains(".codex/sessions") || s.contains("codex/sessions"))
    }

    fn recognizes(&self, record: &Value) -> bool {
        record.get("record_type").is_some()
            || record
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| RECOGNIZED_TYPES.contains(&t))
    }

    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    fn profile(&self) -> &'static SchemaProfile {
        &PROFILE
    }
}

/// Lowercased `type`, else `record_type`.
fn kind(record: &Value) -> Option<String> {
    first_str(record, &["type", "record_type"]).map(str::to_ascii_lowercase)
}

fn kind_in(record: &Value, kinds: &[&str]) -> bool {
    kind(record).is_some_and(|k| kinds.contains(&k.as_str()))
}

fn any_record(_record: &Value) -> bool {
    true
}

fn is_metadata(record: &Value) -> bool {
    kind_in(record, METADATA_TYPES)
}

fn is_reasoning(record: &Value) -> bool {
    kind(record).as_deref() == Some("reasoning")
}

fn is_call(record: &Value) -> bool {
    kind_in(record, CALL_TYPES)
}

fn is_output(record: &Value) -> bool {
    kind_in(record, OUTPUT_TYPES)
}

fn is_response_item(record: &Value) -> bool {
    kind(record).as_deref() == Some("response_item")
        && record.get("payload").is_some_and(Value::is_object)
}

fn reasoning(scope: &mut Scope<'_>, record: &Value) {
    let items = match record.get("summary") {
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };
    for item in items {
        if let Some(text) = item.get("text").and_then(Value::as_str) {
            scope.emit(DiagEvent::ReasoningNote {
                text: text.trim().to_string(),
            });
        }
    }
}

fn function_call(scope: &mut Scope<'_>, record: &Value) {
    let name = first_str(record, &["name", "function", "func"]).unwrap_or("unknown");
    let args = call_args(
        scope,
        first_value(record, &["arguments", "args", "parameters", "input"]),
    );
    let id = first_id(record, scope.profile().call_id_keys);
    let call = scope.tool_call(id, name, &args);
    scope.emit(DiagEvent::assistant("", vec![call]));
}

fn function_output(scope: &mut Scope<'_>, record: &Value) {
    let id = first_id(record, scope.profile().result_id_keys);
    let name = scope.resolve_result(id.as_deref(), first_str(record, &["name", "function"]));
    let raw = first_value(record, &["output", "content", "result"])
        .map(flatten_text)
        .unwrap_or_default();
    let (body, exit_failed) = unwrap_exec_output(raw);
    let is_error = exit_failed
        || ["error", "is_error", "isError"]
            .iter()
            .any(|key| is_truthy(record.get(*key)));
    scope.emit(DiagEvent::tool_result(name, is_error, body.trim_end()));
}

/// Unwrap a JSON-encoded `{"output": .., "metadata": {"exit_code": N}}`
/// shell result. The flag is set for a non-zero exit code.
fn unwrap_exec_output(raw: String) -> (String, bool) {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&raw) else {
        return (raw, false);
    };
    let Some(output) = map.get("output") else {
        return (raw, false);
    };
    let failed = map
        .get("metadata")
        .and_then(|m| m.get("exit_code"))
        .and_then(Value::as_i64)
        .is_some_and(|code| code != 0);
    (flatten_text(output), failed)
}

fn response_item(scope: &mut Scope<'_>, record: &Value) {
    let Some(payload) = record.get("payload") else {
        return;
    };
    if !dispatch(ITEM_RULES, scope, payload) {
        payload_message(scope, payload);
    }
}

fn payload_message(scope: &mut Scope<'_>, payload: &Value) {
    let role = first_str(payload, &["role", "type"])
        .map(normalize_role)
        .unwrap_or(Role::Other);
    match role {
        Role::User => {
            let text = payload.get("content").map(flatten_text).unwrap_or_default();
            if is_injected_context(&text) {
                tracing::trace!("Dropping injected Codex context block");
                return;
            }
            scope.emit_user_text(&text);
        }
        Role::Assistant => emit_assistant(scope, payload.get("content")),
        _ => {}
    }
}

fn is_injected_context(text: &str) -> bool {
    let text = text.trim_start();
    if INJECTED_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
        return true;
    }
    text.chars().count() > INJECTED_BLOCK_MIN_CHARS
        && text.chars().take(50).any(|c| c == '<')
        && text.chars().take(100).any(|c| c == '>')
}

fn envelope(scope: &mut Scope<'_>, record: &Value) {
    let role = detect_role(record)
        .or_else(|| kind(record))
        .map(|label| normalize_role(&label))
        .unwrap_or(Role::Other);
    let text = envelope_text(record);
    match role {
        Role::User => {
            if starts_with_tag(&text) {
                tracing::trace!("Dropping markup-led Codex user message");
                return;
            }
            scope.emit_user_text(&text);
        }
        Role::Assistant => {
            scope.emit(DiagEvent::assistant(text, Vec::new()).with_layout(TextLayout::Verbatim))
        }
        _ => {}
    }
}

/// Text of a generic envelope: the first present top-level key, then the
/// `choices` list, then the first nested container.
fn envelope_text(record: &Value) -> String {
    let text = ENVELOPE_TEXT_KEYS
        .iter()
        .find_map(|key| record.get(*key))
        .map(flatten_text)
        .unwrap_or_default();
    if !text.is_empty() {
        return text;
    }

    if let Some(Value::Array(choices)) = record.get("choices") {
        let text = choices
            .iter()
            .filter_map(|choice| first_truthy(choice, CHOICE_TEXT_KEYS))
            .map(flatten_text)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if !text.is_empty() {
            return text;
        }
    }

    NESTED_CONTAINERS
        .iter()
        .filter_map(|key| record.get(*key))
        .find(|nested| nested.is_object())
        .and_then(|nested| first_truthy(nested, NESTED_TEXT_KEYS))
        .map(flatten_text)
        .unwrap_or_default()
}

fn starts_with_tag(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with('<') && text.chars().take(100).any(|c| c == '>')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process;
    use sessdiag_core::config::TruncationLimits;
    use serde_json::json;

    fn run(records: Vec<Value>) -> Vec<String> {
        process(&CodexSchema, records, TruncationLimits::default())
    }

    fn item(payload: Value) -> Value {
        json!({"timestamp": "2025-01-01T00:00:00Z", "type": "response_item", "payload": payload})
    }

    #[test]
    fn test_metadata_dropped() {
        let records = vec![
            json!({"type": "session_meta", "payload": {"id": "s1", "cwd": "/w"}}),
            json!({"type": "turn_context", "payload": {"model": "m"}}),
            json!({"type": "event_msg", "payload": {"type": "token_count"}}),
        ];
        assert!(run(records).is_empty());
    }

    #[test]
    fn test_user_and_assistant_items() {
        let records = vec![
            item(json!({"type": "message", "role": "user",
                        "content": [{"type": "input_text", "text": "fix the bug"}]})),
            item(json!({"type": "message", "role": "assistant",
                        "content": [{"type": "output_text", "text": "Done."}]})),
        ];
        assert_eq!(run(records), vec!["USER: fix the bug", "A: Done."]);
    }

    #[test]
    fn test_injected_context_dropped() {
        let long = format!("<permissions>{}</permissions>", "x".repeat(600));
        let records = vec![
            item(json!({"type": "message", "role": "user",
                        "content": [{"type": "input_text", "text": "<environment_context>\n<cwd>/w</cwd>"}]})),
            item(json!({"type": "message", "role": "user",
                        "content": [{"type": "input_text", "text": long}]})),
            item(json!({"type": "message", "role": "developer",
                        "content": [{"type": "input_text", "text": "rules"}]})),
        ];
        assert!(run(records).is_empty());
    }

    #[test]
    fn test_short_markup_user_text_kept_in_items() {
        let records = vec![item(json!({"type": "message", "role": "user",
                                        "content": "<b>bold</b> ask"}))];
        assert_eq!(run(records), vec!["USER: <b>bold</b> ask"]);
    }

    #[test]
    fn test_call_and_output_in_items() {
        let records = vec![
            item(json!({"type": "function_call", "name": "shell", "call_id": "c1",
                        "arguments": "{\"command\":[\"bash\",\"-lc\",\"ls\"]}"})),
            item(json!({"type": "reasoning", "summary": [{"type": "summary_text", "text": "thinking"}]})),
            item(json!({"type": "function_call_output", "call_id": "c1",
                        "output": "{\"output\":\"a.txt\\n\",\"metadata\":{\"exit_code\":0}}"})),
        ];
        assert_eq!(
            run(records),
            vec![
                "A:\n  [shell] `[\"bash\",\"-lc\",\"ls\"]`",
                "A: [reasoning] thinking",
                "TOOL [shell]: ✓ a.txt",
            ]
        );
    }

    #[test]
    fn test_nonzero_exit_code_is_error() {
        let records = vec![json!({"type": "function_call_output", "call_id": "x",
            "output": "{\"output\":\"no such file\",\"metadata\":{\"exit_code\":2}}"})];
        assert_eq!(run(records), vec!["TOOL [tool]: ✗ no such file"]);
    }

    #[test]
    fn test_output_error_flag_and_own_name() {
        let records = vec![json!({"type": "function-output", "name": "apply_patch",
                                  "output": "rejected", "is_error": true})];
        assert_eq!(run(records), vec!["TOOL [apply_patch]: ✗ rejected"]);
    }

    #[test]
    fn test_record_type_discriminator() {
        let records = vec![
            json!({"record_type": "FunctionCall", "function": "read_file",
                   "args": {"path": "/a"}, "tool_call_id": "t9"}),
            json!({"record_type": "FunctionOutput", "tool_call_id": "t9", "result": "contents"}),
        ];
        assert_eq!(
            run(records),
            vec!["A:\n  [read_file] /a", "TOOL [read_file]: ✓ contents"]
        );
    }

    #[test]
    fn test_custom_tool_call_with_opaque_input() {
        let records = vec![json!({"type": "custom_tool_call", "call_id": "p1",
                                  "name": "apply_patch", "input": "*** Begin Patch"})];
        assert_eq!(run(records), vec!["A:\n  [apply_patch] *** Begin Patch"]);
    }

    #[test]
    fn test_call_without_name() {
        let records = vec![json!({"type": "function_call", "arguments": {}})];
        assert_eq!(run(records), vec!["A:\n  [unknown] {}"]);
    }

    #[test]
    fn test_reasoning_dict_summary() {
        let records = vec![
            json!({"type": "reasoning", "summary": {"text": "one"}}),
            json!({"type": "reasoning", "summary": [{"text": "a"}, {"text": "b"}, {"no": 1}]}),
        ];
        assert_eq!(
            run(records),
            vec!["A: [reasoning] one", "A: [reasoning] a", "A: [reasoning] b"]
        );
    }

    #[test]
    fn test_generic_envelope() {
        let records = vec![
            json!({"record_type": "message", "author": "human", "text": "hi there"}),
            json!({"record_type": "message", "msg": {"role": "bot", "content": "hello"}}),
            json!({"type": "user", "content": "<ctx>injected</ctx>"}),
            json!({"type": "assistant", "choices": [{"message": {"content": "picked"}}]}),
        ];
        assert_eq!(
            run(records),
            vec!["USER: hi there", "A: hello", "A: picked"]
        );
    }

    #[test]
    fn test_nested_container_prefers_content() {
        let records = vec![
            json!({"record_type": "message", "msg": {"role": "assistant", "text": "T", "content": "C"}}),
            json!({"record_type": "message", "payload": {"role": "user", "content": "", "body": "B"}}),
        ];
        assert_eq!(run(records), vec!["A: C", "USER: B"]);
    }

    #[test]
    fn test_choices_prefer_message() {
        let records = vec![json!({"role": "assistant", "choices": [
            {"text": "T", "message": {"content": "M"}},
            {"message": "", "text": "second"}
        ]})];
        assert_eq!(run(records), vec!["A: M\nsecond"]);
    }

    #[test]
    fn test_first_present_top_level_key_wins() {
        let records = vec![json!({"role": "assistant", "content": "", "text": "skipped",
                                  "choices": [{"text": "from choices"}]})];
        assert_eq!(run(records), vec!["A: from choices"]);
    }

    #[test]
    fn test_envelope_assistant_text_is_verbatim() {
        let records = vec![json!({"role": "assistant", "content": "first\n\n  indented"})];
        assert_eq!(run(records), vec!["A: first\n\n  indented"]);
    }

    #[test]
    fn test_unknown_records_dropped() {
        assert!(run(vec![json!({"type": "compacted", "payload": {}})]).is_empty());
    }

    #[test]
    fn test_unwrap_exec_output_passthrough() {
        assert_eq!(unwrap_exec_output("plain".into()), ("plain".into(), false));
        assert_eq!(
            unwrap_exec_output("{\"other\":1}".into()),
            ("{\"other\":1}".into(), false)
        );
    }
}
