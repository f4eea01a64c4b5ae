//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore REST represents every value as a single-key object naming its type, e.g.
//! `{"stringValue": "a"}` or `{"mapValue": {"fields": {...}}}`. Integers travel as strings.

use serde_json::{Map, Value, json};

use super::{Document, StoreError, StoreResult};

/// Encode a JSON value as a Firestore value
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            if items.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                let values: Vec<Value> = items.iter().map(encode_value).collect();
                json!({ "arrayValue": { "values": values } })
            }
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode a document's top-level fields
pub fn encode_fields(doc: &Document) -> Map<String, Value> {
    doc.iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Decode a Firestore value back into plain JSON
pub fn decode_value(value: &Value) -> StoreResult<Value> {
    let Some(object) = value.as_object() else {
        return Err(StoreError::InvalidDocument(
            "Firestore value is not an object".to_string(),
        ));
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Err(StoreError::InvalidDocument(
            "Firestore value has no type".to_string(),
        ));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or_default())),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().map_err(|e| {
                    StoreError::InvalidDocument(format!("bad integerValue '{s}': {e}"))
                })?,
                Value::Number(n) => n.as_i64().unwrap_or_default(),
                _ => {
                    return Err(StoreError::InvalidDocument(
                        "integerValue has unexpected type".to_string(),
                    ));
                }
            };
            Ok(Value::from(parsed))
        }
        "doubleValue" => Ok(inner
            .as_f64()
            .map(Value::from)
            .unwrap_or(Value::Null)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Ok(Value::String(inner.as_str().unwrap_or_default().to_string()))
        }
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<StoreResult<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Ok(Value::Object(decode_fields(&fields)?))
        }
        other => Err(StoreError::InvalidDocument(format!(
            "unsupported Firestore value type '{other}'"
        ))),
    }
}

/// Decode a Firestore `fields` object into a document
pub fn decode_fields(fields: &Map<String, Value>) -> StoreResult<Document> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}
