//! Assistant-turn handling shared by every schema.

use crate::correlate::Scope;
use crate::fields::{first_id, first_str, first_value};
use sessdiag_core::DiagEvent;
use sessdiag_core::event::PLACEHOLDER_TOOL;
use sessdiag_core::format::ToolArgs;
use serde_json::Value;

const TEXT_FRAGMENTS: &[&str] = &["text", "output_text"];
const CALL_FRAGMENTS: &[&str] = &["tool_use", "function_call", "toolCall"];
const CALL_NAME_KEYS: &[&str] = &["name", "function"];
const CALL_ARG_KEYS: &[&str] = &["input", "arguments", "args"];

/// Walk an assistant `content` value into one composite event.
///
/// Text fragments accumulate in order, call fragments are formatted and
/// recorded for correlation, anything else (thinking, images) is dropped.
/// A bare string is taken as the whole text.
pub(crate) fn emit_assistant(scope: &mut Scope<'_>, content: Option<&Value>) {
    let mut text_parts: Vec<String> = Vec::new();
    let mut calls = Vec::new();

    match content {
        Some(Value::String(text)) => text_parts.push(text.clone()),
        Some(Value::Array(items)) => {
            for item in items {
                let Some(kind) = item.get("type").and_then(Value::as_str) else {
                    continue;
                };
                if TEXT_FRAGMENTS.contains(&kind) {
                    if let Some(text) = item.get("text").and_then(Value::as_str) {
                        let text = text.trim();
                        if !text.is_empty() {
                            text_parts.push(text.to_string());
                        }
                    }
                } else if CALL_FRAGMENTS.contains(&kind) {
                    let name = first_str(item, CALL_NAME_KEYS).unwrap_or(PLACEHOLDER_TOOL);
                    let args = call_args(scope, first_value(item, CALL_ARG_KEYS));
                    let id = first_id(item, scope.profile().call_id_keys);
                    calls.push(scope.tool_call(id, name, &args));
                }
            }
        }
        _ => {}
    }

    let layout = scope.profile().assistant_layout;
    scope.emit(DiagEvent::assistant(text_parts.join("\n"), calls).with_layout(layout));
}

/// Decode call arguments per the schema's tolerance for non-mapping input.
pub(crate) fn call_args(scope: &Scope<'_>, raw: Option<&Value>) -> ToolArgs {
    if scope.profile().opaque_args {
        ToolArgs::from_value(raw)
    } else {
        ToolArgs::map_or_empty(raw)
    }
}
