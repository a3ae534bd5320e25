//! Accessors over the opaque command payload.
//!
//! Payloads arrive as a JSON object, a string (sometimes holding JSON) or
//! nothing. Every accessor returns a [`CommandError`] naming the command and
//! field instead of failing loosely.

use super::types::Command;
use crate::error::CommandError;
use serde_json::{Map, Value};

pub struct Payload<'a> {
    command: &'a str,
    value: Option<&'a Value>,
}

impl<'a> Payload<'a> {
    pub fn of(command: &'a Command) -> Self {
        Self {
            command: &command.message_type,
            value: command.payload.as_ref(),
        }
    }

    /// Raw text form. Numbers and booleans are rendered; objects are not text.
    pub fn text(&self) -> Option<String> {
        match self.value? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Non-empty text or an error.
    pub fn require_text(&self) -> Result<String, CommandError> {
        self.text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| self.missing_payload())
    }

    /// Text parsed as an integer.
    pub fn require_int(&self) -> Result<i64, CommandError> {
        let text = self.require_text()?;
        text.trim()
            .parse::<i64>()
            .map_err(|_| self.invalid("payload", format!("`{text}` is not an integer")))
    }

    /// Object payload. A string holding a JSON object also counts.
    pub fn object(&self) -> Option<Map<String, Value>> {
        match self.value? {
            Value::Object(map) => Some(map.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn require_object(&self) -> Result<Fields<'a>, CommandError> {
        self.object()
            .map(|map| Fields {
                command: self.command,
                map,
            })
            .ok_or_else(|| self.missing_payload())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.value, None | Some(Value::Null))
    }

    fn missing_payload(&self) -> CommandError {
        CommandError::MissingPayload {
            command: self.command.to_string(),
        }
    }

    fn invalid(&self, field: &str, message: String) -> CommandError {
        CommandError::InvalidField {
            command: self.command.to_string(),
            field: field.to_string(),
            message,
        }
    }
}

/// Fields of an object payload.
pub struct Fields<'a> {
    command: &'a str,
    map: Map<String, Value>,
}

impl Fields<'_> {
    /// Non-empty string field.
    pub fn str(&self, field: &str) -> Option<&str> {
        self.map
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn require_str(&self, field: &str) -> Result<&str, CommandError> {
        self.str(field).ok_or_else(|| CommandError::MissingField {
            command: self.command.to_string(),
            field: field.to_string(),
        })
    }

    pub fn object(&self, field: &str) -> Option<&Map<String, Value>> {
        self.map.get(field).and_then(Value::as_object)
    }

    /// A string field or an array of strings, flattened.
    pub fn str_list(&self, field: &str) -> Vec<String> {
        match self.map.get(field) {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Loose flag: `"1"`, `1` or `true`.
    pub fn flag(&self, field: &str) -> bool {
        match self.map.get(field) {
            Some(Value::String(s)) => s == "1",
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_from_string_payload() {
        let cmd = Command::text("run-app", r#"{"pkg":"org.example"}"#);
        let fields = Payload::of(&cmd).require_object().unwrap();
        assert_eq!(fields.require_str("pkg").unwrap(), "org.example");
    }

    #[test]
    fn missing_field_names_command_and_field() {
        let cmd = Command::new("uninstall-app", Some(json!({})));
        let fields = Payload::of(&cmd).require_object().unwrap();
        assert_eq!(
            fields.require_str("pkg").unwrap_err(),
            CommandError::MissingField {
                command: "uninstall-app".into(),
                field: "pkg".into()
            }
        );
    }

    #[test]
    fn missing_payload() {
        let cmd = Command::new("delete-file", None);
        assert!(matches!(
            Payload::of(&cmd).require_object(),
            Err(CommandError::MissingPayload { .. })
        ));
        assert!(Payload::of(&cmd).is_empty());
    }

    #[test]
    fn integers_from_text_or_number() {
        assert_eq!(Payload::of(&Command::text("set-volume", " 8 ")).require_int(), Ok(8));
        assert_eq!(
            Payload::of(&Command::new("set-volume", Some(json!(12)))).require_int(),
            Ok(12)
        );
        assert!(Payload::of(&Command::text("set-volume", "loud")).require_int().is_err());
    }

    #[test]
    fn str_list_accepts_string_or_array() {
        let cmd = Command::new("grant-permissions", Some(json!({"pkg": ["a", "", "b", 3]})));
        let fields = Payload::of(&cmd).require_object().unwrap();
        assert_eq!(fields.str_list("pkg"), vec!["a", "b"]);

        let cmd = Command::new("grant-permissions", Some(json!({"pkg": "c"})));
        let fields = Payload::of(&cmd).require_object().unwrap();
        assert_eq!(fields.str_list("pkg"), vec!["c"]);
    }

    #[test]
    fn recursive_flag_is_strict() {
        let cmd = Command::new("purge-dir", Some(json!({"path": "x", "recursive": "1"})));
        assert!(Payload::of(&cmd).require_object().unwrap().flag("recursive"));
        let cmd = Command::new("purge-dir", Some(json!({"path": "x", "recursive": "yes"})));
        assert!(!Payload::of(&cmd).require_object().unwrap().flag("recursive"));
    }
}
