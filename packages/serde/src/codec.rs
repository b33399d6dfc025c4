//! Codecs for the document formats a store understands out of the box.

use bytes::Bytes;
use vdoc_core::{Codec, Error, Format, Value};

use crate::convert::{json_to_value, value_to_json};

/// JSON documents.
///
/// ```rust
/// use vdoc_serde::JsonCodec;
/// use vdoc_core::{Codec, Format, Value};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&Value::from("hello"), &Format::JSON).unwrap();
/// assert_eq!(&bytes[..], b"\"hello\"");
/// assert_eq!(codec.decode(&bytes, &Format::JSON).unwrap(), Value::from("hello"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        if !self.supports(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }
        let json: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::decode(format.clone(), e.to_string()))?;
        Ok(json_to_value(json))
    }

    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
        if !self.supports(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }
        serde_json::to_vec_pretty(&value_to_json(value))
            .map(Bytes::from)
            .map_err(|e| Error::encode(format.clone(), e.to_string()))
    }

    fn supports(&self, format: &Format) -> bool {
        format.is_json()
    }
}

/// Text and opaque documents.
///
/// Decodes UTF-8 into a string leaf and anything else into a bytes leaf.
/// Encodes string and bytes leaves verbatim; other values are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        if !self.supports(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }
        Ok(match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::Bytes(bytes.to_vec()),
        })
    }

    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
        match value {
            Value::String(s) => Ok(Bytes::from(s.clone())),
            Value::Bytes(b) => Ok(Bytes::from(b.clone())),
            Value::Null => Ok(Bytes::new()),
            other => Err(Error::encode(
                format.clone(),
                format!("cannot write a {} as plain content", kind_name(other)),
            )),
        }
    }

    fn supports(&self, format: &Format) -> bool {
        format.is_text() || format == &Format::OCTET_STREAM
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Integer(_) | Value::Float(_) => "number",
        Value::String(_) => "string",
        Value::Bytes(_) => "byte string",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
    }
}

/// Routes encode/decode to the first codec that supports the format.
pub struct MultiCodec {
    codecs: Vec<Box<dyn Codec>>,
}

impl MultiCodec {
    /// A codec with no formats.
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Register `codec`; earlier codecs win for shared formats.
    pub fn add(&mut self, codec: impl Codec + 'static) {
        self.codecs.push(Box::new(codec));
    }

    /// JSON first, then text/opaque content.
    pub fn standard() -> Self {
        let mut mc = Self::new();
        mc.add(JsonCodec);
        mc.add(TextCodec);
        mc
    }

    fn route(&self, format: &Format) -> Result<&dyn Codec, Error> {
        self.codecs
            .iter()
            .find(|c| c.supports(format))
            .map(|c| c.as_ref())
            .ok_or_else(|| Error::UnsupportedFormat(format.clone()))
    }
}

impl Default for MultiCodec {
    fn default() -> Self {
        Self::standard()
    }
}

impl Codec for MultiCodec {
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        self.route(format)?.decode(bytes, format)
    }

    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
        self.route(format)?.encode(value, format)
    }

    fn supports(&self, format: &Format) -> bool {
        self.codecs.iter().any(|c| c.supports(format))
    }
}
