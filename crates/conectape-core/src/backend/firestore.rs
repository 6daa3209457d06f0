//! Firestore REST wire types.
//!
//! The REST API wraps every field in a typed envelope
//! (`{"stringValue": "..."}`, `{"integerValue": "42"}`, ...). These helpers
//! unwrap them into plain JSON so records decode the same way regardless of
//! which backend produced them.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use super::Document;

#[derive(Debug, Deserialize)]
pub struct RestDocument {
    /// Full resource name: `projects/<p>/databases/(default)/documents/<collection>/<id>`
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(rename = "updateTime")]
    pub update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<RestDocument>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl RestDocument {
    pub fn into_document(self) -> Document {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Document {
            id,
            fields: decode_fields(&self.fields),
            update_time: self.update_time,
        }
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

/// Unwrap one typed Firestore value.
pub fn decode_value(value: &Value) -> Value {
    let Some(envelope) = value.as_object() else {
        return value.clone();
    };
    let Some((kind, inner)) = envelope.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(s.clone())),
            other => other.clone(),
        },
        "doubleValue" => match inner {
            Value::Number(_) => inner.clone(),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default();
            Value::Object(fields)
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default();
            Value::Array(values)
        }
        _ => inner.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_scalar_values() {
        assert_eq!(decode_value(&json!({"stringValue": "Ana"})), json!("Ana"));
        assert_eq!(decode_value(&json!({"integerValue": "987654321"})), json!(987654321));
        assert_eq!(decode_value(&json!({"doubleValue": 1.5})), json!(1.5));
        assert_eq!(decode_value(&json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})), Value::Null);
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-05-01T10:00:00Z"})),
            json!("2024-05-01T10:00:00Z")
        );
    }

    #[test]
    fn test_decode_nested_values() {
        let value = json!({
            "mapValue": {"fields": {
                "tags": {"arrayValue": {"values": [{"stringValue": "a"}, {"integerValue": "2"}]}},
                "empty": {"arrayValue": {}}
            }}
        });
        assert_eq!(decode_value(&value), json!({"tags": ["a", 2], "empty": []}));
    }

    #[test]
    fn test_rest_document_into_document() {
        let raw = json!({
            "name": "projects/p/databases/(default)/documents/contactos/abc123",
            "fields": {
                "primerNombre": {"stringValue": "Ana"},
                "telefono": {"integerValue": "987654321"}
            },
            "updateTime": "2024-05-01T10:00:00.123Z"
        });
        let rest: RestDocument = serde_json::from_value(raw).unwrap();
        let doc = rest.into_document();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.fields["primerNombre"], "Ana");
        assert_eq!(doc.fields["telefono"], 987654321);
        assert_eq!(doc.update_time.as_deref(), Some("2024-05-01T10:00:00.123Z"));
    }

    #[test]
    fn test_empty_list_response() {
        let parsed: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.documents.is_empty());
        assert!(parsed.next_page_token.is_none());
    }
}
