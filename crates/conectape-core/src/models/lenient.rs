//! Serde helpers for text fields whose stored type is not guaranteed.
//!
//! Strings pass through, numbers and booleans are stringified, null and
//! absent become empty. Maps and arrays are rejected so that the record is
//! reported as malformed instead of being rendered with garbage.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_)) => Err(de::Error::custom("expected text, found a list")),
        Some(Value::Object(_)) => Err(de::Error::custom("expected text, found a map")),
    }
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_string(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "string")]
        text: String,
        #[serde(default, deserialize_with = "opt_string")]
        maybe: Option<String>,
    }

    #[test]
    fn test_numbers_and_bools_are_stringified() {
        let fields: Fields = serde_json::from_value(json!({"text": 987654321, "maybe": true})).unwrap();
        assert_eq!(fields.text, "987654321");
        assert_eq!(fields.maybe.as_deref(), Some("true"));
    }

    #[test]
    fn test_null_and_absent_are_empty() {
        let fields: Fields = serde_json::from_value(json!({"text": null})).unwrap();
        assert_eq!(fields.text, "");
        assert_eq!(fields.maybe, None);
    }

    #[test]
    fn test_structured_values_are_rejected() {
        let result = serde_json::from_value::<Fields>(json!({"text": {"nested": 1}}));
        assert!(result.is_err());
        let result = serde_json::from_value::<Fields>(json!({"maybe": [1, 2]}));
        assert!(result.is_err());
    }
}
