//! JSON fields whose shape differs between endpoints and API versions.
//!
//! Each type decodes by trying its alternatives in order and re-encodes
//! using the JSON shape of whichever alternative matched, so a decoded
//! value always serializes back to the representation it came from.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

/// Inbound filter `active` flag: a plain boolean, or the list of enabled
/// sub-filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoolOrStringList {
    Bool(bool),
    StringList(Vec<String>),
}

impl BoolOrStringList {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::StringList(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Bool(_) => None,
            Self::StringList(values) => Some(values),
        }
    }
}

impl Default for BoolOrStringList {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl From<bool> for BoolOrStringList {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for BoolOrStringList {
    fn from(values: Vec<String>) -> Self {
        Self::StringList(values)
    }
}

impl<'de> Deserialize<'de> for BoolOrStringList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;

        if let Ok(value) = bool::deserialize(&raw) {
            return Ok(Self::Bool(value));
        }
        if let Ok(values) = Vec::<String>::deserialize(&raw) {
            return Ok(Self::StringList(values));
        }

        Err(de::Error::custom(format!(
            "unable to decode as bool or string list: {raw}"
        )))
    }
}

impl Serialize for BoolOrStringList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(value) => value.serialize(serializer),
            Self::StringList(values) => values.serialize(serializer),
        }
    }
}

/// Identifier rendered as a JSON number by some endpoints and as a JSON
/// string by others.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Int64OrString {
    Int64(i64),
    String(String),
}

impl Int64OrString {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(value) => Some(*value),
            Self::String(value) => value.parse().ok(),
        }
    }
}

impl fmt::Display for Int64OrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Int64OrString {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<String> for Int64OrString {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Int64OrString {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Int64OrString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;

        if let Ok(value) = i64::deserialize(&raw) {
            return Ok(Self::Int64(value));
        }
        if let Ok(value) = String::deserialize(&raw) {
            return Ok(Self::String(value));
        }

        Err(de::Error::custom(format!(
            "unable to decode as int64 or string: {raw}"
        )))
    }
}

impl Serialize for Int64OrString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int64(value) => value.serialize(serializer),
            Self::String(value) => value.serialize(serializer),
        }
    }
}

/// Untyped error body returned by the API.
///
/// Usually `{"detail": "..."}`, but any JSON is accepted. Bytes that are not
/// JSON at all are kept verbatim as a string, so decoding never fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorPayload(Value);

impl ErrorPayload {
    pub fn from_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => Self(value),
            Err(_) => Self(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::String(raw) => raw.trim().is_empty(),
            _ => false,
        }
    }

    /// The `detail` message when the payload is exactly `{"detail": "<string>"}`.
    pub fn detail(&self) -> Option<&str> {
        match &self.0 {
            Value::Object(map) if map.len() == 1 => map.get("detail").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Best-effort human message: the `detail` string, or the whole payload.
    pub fn message(&self) -> String {
        if let Some(detail) = self.detail() {
            return detail.to_string();
        }
        match &self.0 {
            Value::String(raw) => raw.trim().to_string(),
            other => other.to_string(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sentry: {}", self.message())
    }
}

impl<'de> Deserialize<'de> for ErrorPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self)
    }
}

impl Serialize for ErrorPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_or_string_list_decodes_bool() {
        let value: BoolOrStringList = serde_json::from_str("true").unwrap();
        assert_eq!(value, BoolOrStringList::Bool(true));
        assert_eq!(value.as_bool(), Some(true));
    }

    #[test]
    fn test_bool_or_string_list_decodes_list() {
        let value: BoolOrStringList =
            serde_json::from_str(r#"["ie_pre_9","safari_pre_6"]"#).unwrap();
        assert_eq!(
            value.as_list(),
            Some(&["ie_pre_9".to_string(), "safari_pre_6".to_string()][..])
        );
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"["ie_pre_9","safari_pre_6"]"#
        );
    }

    #[test]
    fn test_bool_or_string_list_rejects_other_shapes() {
        let err = serde_json::from_str::<BoolOrStringList>(r#"{"a":1}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bool or string list"));
        assert!(message.contains(r#"{"a":1}"#));
    }

    #[test]
    fn test_int64_or_string_keeps_representation() {
        let number: Int64OrString = serde_json::from_str("1234567890123").unwrap();
        assert_eq!(number, Int64OrString::Int64(1_234_567_890_123));
        assert_eq!(serde_json::to_string(&number).unwrap(), "1234567890123");

        let text: Int64OrString = serde_json::from_str(r#""42""#).unwrap();
        assert_eq!(text, Int64OrString::String("42".into()));
        assert_eq!(text.as_i64(), Some(42));
        assert_eq!(serde_json::to_string(&text).unwrap(), r#""42""#);
    }

    #[test]
    fn test_int64_or_string_rejects_float() {
        let err = serde_json::from_str::<Int64OrString>("1.5").unwrap_err();
        assert!(err.to_string().contains("int64 or string"));
    }

    #[test]
    fn test_error_payload_detail() {
        let payload = ErrorPayload::from_slice(br#"{"detail":"not found"}"#);
        assert_eq!(payload.detail(), Some("not found"));
        assert_eq!(payload.to_string(), "sentry: not found");
    }

    #[test]
    fn test_error_payload_multi_key_object_is_stringified() {
        let payload = ErrorPayload::from_slice(br#"{"detail":"x","code":7}"#);
        assert_eq!(payload.detail(), None);
        assert!(payload.message().contains(r#""code":7"#));
    }

    #[test]
    fn test_error_payload_non_json_falls_back_to_raw() {
        let payload = ErrorPayload::from_slice(b"<html>Bad Gateway</html>\n");
        assert!(!payload.is_empty());
        assert_eq!(payload.message(), "<html>Bad Gateway</html>");
        assert_eq!(payload.value(), &json!("<html>Bad Gateway</html>\n"));
    }

    #[test]
    fn test_error_payload_empty_body() {
        assert!(ErrorPayload::from_slice(b"").is_empty());
        assert!(ErrorPayload::from_slice(b"null").is_empty());
    }
}
