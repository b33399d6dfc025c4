//! The codec seam between document bytes and value trees.

use bytes::Bytes;

use crate::{Error, Format, Value};

/// Codec for converting between Value and bytes.
///
/// The store picks a [`Format`] from the document extension and hands the
/// driver's bytes to a codec; the core layer never interprets formats itself.
///
/// # Implementing Custom Codecs
///
/// ```rust
/// use vdoc_core::{Codec, Value, Format, Error};
/// use bytes::Bytes;
///
/// struct UpperCodec;
///
/// impl Codec for UpperCodec {
///     fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
///         let text = std::str::from_utf8(bytes)
///             .map_err(|e| Error::decode(format.clone(), e.to_string()))?;
///         Ok(Value::String(text.to_uppercase()))
///     }
///
///     fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
///         match value {
///             Value::String(s) => Ok(Bytes::from(s.to_lowercase())),
///             _ => Err(Error::encode(format.clone(), "expected a string")),
///         }
///     }
///
///     fn supports(&self, format: &Format) -> bool {
///         format.as_str() == "text/x-upper"
///     }
/// }
/// ```
pub trait Codec: Send + Sync {
    /// Decode raw bytes into a Value.
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error>;

    /// Encode a Value into raw bytes.
    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error>;

    /// Check if this codec supports a format.
    fn supports(&self, format: &Format) -> bool;
}

/// A codec that doesn't support any formats.
pub struct NoCodec;

impl Codec for NoCodec {
    fn decode(&self, _bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        Err(Error::UnsupportedFormat(format.clone()))
    }

    fn encode(&self, _value: &Value, format: &Format) -> Result<Bytes, Error> {
        Err(Error::UnsupportedFormat(format.clone()))
    }

    fn supports(&self, _format: &Format) -> bool {
        false
    }
}

impl<T: Codec + ?Sized> Codec for Box<T> {
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        self.as_ref().decode(bytes, format)
    }

    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
        self.as_ref().encode(value, format)
    }

    fn supports(&self, format: &Format) -> bool {
        self.as_ref().supports(format)
    }
}
