//! Loose field access over schema-free JSON records.

use serde_json::Value;

const ROLE_KEYS: &[&str] = &["role", "actor", "author", "from"];
const ROLE_CONTAINERS: &[&str] = &["message", "msg", "payload"];

/// Canonical speaker of a message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    User,
    Assistant,
    ToolResult,
    System,
    Other,
}

/// First key holding a string.
pub(crate) fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_str))
}

/// First key holding a non-null value.
pub(crate) fn first_value<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| value.get(*key).filter(|v| !v.is_null()))
}

/// First key holding a truthy value (see [`is_truthy`]).
pub(crate) fn first_truthy<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| value.get(*key).filter(|v| is_truthy(Some(v))))
}

/// First key holding a usable identifier (non-empty string or number).
pub(crate) fn first_id(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Loose truthiness: absent, null, `false`, `0`, `""`, `[]` and `{}` are false.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Raw role label, looked up on the record and then one level down.
pub(crate) fn detect_role(record: &Value) -> Option<String> {
    role_on(record).or_else(|| {
        ROLE_CONTAINERS
            .iter()
            .filter_map(|key| record.get(*key))
            .find_map(role_on)
    })
}

fn role_on(value: &Value) -> Option<String> {
    ROLE_KEYS
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(role_label)
}

fn role_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => first_str(value, &["role", "name"])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

pub(crate) fn normalize_role(label: &str) -> Role {
    match label.trim().to_ascii_lowercase().as_str() {
        "user" | "human" | "end-user" => Role::User,
        "assistant" | "ai" | "bot" => Role::Assistant,
        "toolresult" | "tool_result" | "tool" => Role::ToolResult,
        "system" | "developer" => Role::System,
        _ => Role::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_str_priority() {
        let value = json!({"function": "f", "name": "n"});
        assert_eq!(first_str(&value, &["name", "function"]), Some("n"));
        assert_eq!(first_str(&value, &["func"]), None);
    }

    #[test]
    fn test_first_value_skips_null() {
        let value = json!({"arguments": null, "input": {"a": 1}});
        assert_eq!(
            first_value(&value, &["arguments", "input"]),
            Some(&json!({"a": 1}))
        );
    }

    #[test]
    fn test_first_truthy_skips_empty() {
        let value = json!({"message": "", "text": {}, "content": "c"});
        assert_eq!(
            first_truthy(&value, &["message", "text", "content"]),
            Some(&json!("c"))
        );
        assert_eq!(first_truthy(&value, &["message"]), None);
    }

    #[test]
    fn test_first_id() {
        assert_eq!(first_id(&json!({"call_id": ""}), &["call_id"]), None);
        assert_eq!(
            first_id(&json!({"id": 7}), &["call_id", "id"]),
            Some("7".to_string())
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!("boom"))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!(true))));
    }

    #[test]
    fn test_detect_role_direct_and_nested() {
        assert_eq!(detect_role(&json!({"author": "bot"})), Some("bot".into()));
        assert_eq!(
            detect_role(&json!({"payload": {"role": "user"}})),
            Some("user".into())
        );
        assert_eq!(
            detect_role(&json!({"from": {"name": "human"}})),
            Some("human".into())
        );
        assert_eq!(detect_role(&json!({"type": "x"})), None);
    }

    #[test]
    fn test_normalize_role() {
        assert_eq!(normalize_role("Human"), Role::User);
        assert_eq!(normalize_role("end-user"), Role::User);
        assert_eq!(normalize_role("ai"), Role::Assistant);
        assert_eq!(normalize_role("toolResult"), Role::ToolResult);
        assert_eq!(normalize_role("developer"), Role::System);
        assert_eq!(normalize_role("narrator"), Role::Other);
    }
}
