//! Conversions between document values, JSON and typed data.

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;
use vdoc_core::{Error, Format, Value};

/// Deserialize a typed value out of a document tree.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    serde_json::from_value(value_to_json(value))
        .map_err(|e| Error::decode(Format::VALUE, e.to_string()))
}

/// Serialize typed data into a document tree.
pub fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value, Error> {
    serde_json::to_value(data)
        .map(json_to_value)
        .map_err(|e| Error::encode(Format::VALUE, e.to_string()))
}

/// Document tree to JSON.
///
/// Binary leaves become base64 strings and non-finite floats become null,
/// since JSON has neither.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(base64::engine::general_purpose::STANDARD.encode(b)),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

/// JSON to document tree.
pub fn json_to_value(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(f)) => Value::Float(f),
            // u64 beyond i64::MAX without float precision
            (None, None) => Value::String(n.to_string()),
        },
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        Json::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}
