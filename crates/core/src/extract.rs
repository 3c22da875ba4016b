use serde_json::Value;

/// Keys tried, in order, when flattening a dict into text.
const FLATTEN_KEYS: &[&str] = &["text", "content", "message", "body", "display_text"];

/// Fragment tags that never contribute to visible text.
const HIDDEN_FRAGMENT_TYPES: &[&str] = &["thinking", "reasoning", "redacted_thinking"];

/// Extract visible text from a message `content` value.
///
/// - absent / null → `""`
/// - string → trimmed
/// - list → trimmed `{"type":"text","text":...}` fragments joined by `\n`;
///   every other fragment kind (thinking, tool_use, images) is dropped
/// - anything else → `""`
pub fn extract_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| fragment_type(item) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Flatten an arbitrarily nested value into readable text.
///
/// Looser than [`extract_text`]: dicts resolve through the first present key
/// of `text`, `content`, `message`, `body`, `display_text`, and fall back to
/// all of their values. Numbers are stringified. Reasoning fragments are
/// skipped.
pub fn flatten_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => join_non_empty(items.iter().map(flatten_text)),
        Value::Object(map) => {
            if fragment_type(value).is_some_and(|t| HIDDEN_FRAGMENT_TYPES.contains(&t)) {
                return String::new();
            }
            for key in FLATTEN_KEYS {
                if let Some(inner) = map.get(*key) {
                    return flatten_text(inner);
                }
            }
            join_non_empty(map.values().map(flatten_text))
        }
    }
}

fn fragment_type(item: &Value) -> Option<&str> {
    item.get("type").and_then(Value::as_str)
}

fn join_non_empty(parts: impl Iterator<Item = String>) -> String {
    parts
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_absent_and_null() {
        assert_eq!(extract_text(None), "");
        assert_eq!(extract_text(Some(&Value::Null)), "");
    }

    #[test]
    fn test_extract_string_is_trimmed() {
        assert_eq!(extract_text(Some(&json!("  hello \n"))), "hello");
    }

    #[test]
    fn test_extract_list_keeps_text_fragments_only() {
        let content = json!([
            {"type": "thinking", "thinking": "secret plan"},
            {"type": "text", "text": " first "},
            {"type": "tool_use", "id": "t1", "name": "Read", "input": {}},
            {"type": "text", "text": "   "},
            {"type": "text", "text": "second"}
        ]);
        assert_eq!(extract_text(Some(&content)), "first\nsecond");
    }

    #[test]
    fn test_extract_other_shapes_are_empty() {
        assert_eq!(extract_text(Some(&json!({"text": "x"}))), "");
        assert_eq!(extract_text(Some(&json!(42))), "");
    }

    #[test]
    fn test_extract_is_idempotent() {
        let inputs = [
            json!("  padded  "),
            json!([{"type": "text", "text": " a "}, {"type": "text", "text": "b\n"}]),
            json!([{"type": "thinking", "thinking": "x"}]),
        ];
        for input in inputs {
            let once = extract_text(Some(&input));
            let twice = extract_text(Some(&Value::String(once.clone())));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_flatten_nested_shapes() {
        let value = json!([
            {"type": "input_text", "text": "hello"},
            {"content": [{"text": "nested"}]},
            7,
            null
        ]);
        assert_eq!(flatten_text(&value), "hello\nnested\n7");
    }

    #[test]
    fn test_flatten_key_priority() {
        let value = json!({"body": "b", "message": "m"});
        assert_eq!(flatten_text(&value), "m");
    }

    #[test]
    fn test_flatten_skips_reasoning() {
        let value = json!([
            {"type": "reasoning", "text": "hidden"},
            {"type": "output_text", "text": "shown"}
        ]);
        assert_eq!(flatten_text(&value), "shown");
    }

    #[test]
    fn test_flatten_dict_without_known_keys() {
        let value = json!({"a": "x", "b": "y"});
        assert_eq!(flatten_text(&value), "x\ny");
    }
}
