//! The Record type - document content in either wire or tree form.

use bytes::Bytes;

use crate::{Codec, Error, Format, Value};

/// Document content as it crosses the driver boundary.
///
/// - `Raw`: bytes exactly as the driver returned them, with the format
///   derived from the document's extension.
/// - `Parsed`: a decoded [`Value`] tree.
///
/// ```rust
/// use vdoc_core::{Record, Format};
/// use bytes::Bytes;
///
/// let record = Record::raw(Bytes::from_static(b"{\"name\":\"Alice\"}"), Format::JSON);
/// assert!(record.is_raw());
/// assert_eq!(record.format(), Format::JSON);
/// ```
#[derive(Clone)]
pub enum Record {
    Raw { bytes: Bytes, format: Format },
    Parsed(Value),
}

impl Record {
    /// Undecoded bytes in `format`.
    pub fn raw(bytes: impl Into<Bytes>, format: Format) -> Self {
        Record::Raw {
            bytes: bytes.into(),
            format,
        }
    }

    /// An already decoded value.
    pub fn parsed(value: Value) -> Self {
        Record::Parsed(value)
    }

    /// Whether the record still holds bytes.
    pub fn is_raw(&self) -> bool {
        matches!(self, Record::Raw { .. })
    }

    /// The format hint; `Format::VALUE` for parsed records.
    pub fn format(&self) -> Format {
        match self {
            Record::Raw { format, .. } => format.clone(),
            Record::Parsed(_) => Format::VALUE,
        }
    }

    /// Decode into a tree. Parsed records are returned as-is.
    pub fn into_value(self, codec: &dyn Codec) -> Result<Value, Error> {
        match self {
            Record::Parsed(v) => Ok(v),
            Record::Raw { bytes, format } => codec.decode(&bytes, &format),
        }
    }

    /// Encode into bytes of `target_format`.
    ///
    /// Raw records already in the target format pass through untouched;
    /// other raw records are transcoded through a tree.
    pub fn into_bytes(self, codec: &dyn Codec, target_format: &Format) -> Result<Bytes, Error> {
        match self {
            Record::Raw { bytes, format } if &format == target_format => Ok(bytes),
            Record::Raw { bytes, format } => {
                let value = codec.decode(&bytes, &format)?;
                codec.encode(&value, target_format)
            }
            Record::Parsed(v) => codec.encode(&v, target_format),
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Record::Raw { bytes, format } => f
                .debug_struct("Record::Raw")
                .field("bytes_len", &bytes.len())
                .field("format", format)
                .finish(),
            Record::Parsed(v) => f.debug_tuple("Record::Parsed").field(v).finish(),
        }
    }
}

impl From<Value> for Record {
    fn from(v: Value) -> Self {
        Record::Parsed(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoCodec;

    #[test]
    fn parsed_record_skips_codec() {
        let record = Record::parsed(Value::from("hello"));
        assert!(!record.is_raw());
        assert_eq!(record.format(), Format::VALUE);
        assert_eq!(record.into_value(&NoCodec).unwrap(), Value::from("hello"));
    }

    #[test]
    fn raw_passthrough_in_same_format() {
        let bytes = Bytes::from_static(b"{}");
        let record = Record::raw(bytes.clone(), Format::JSON);
        assert_eq!(record.into_bytes(&NoCodec, &Format::JSON).unwrap(), bytes);
    }

    #[test]
    fn raw_needs_codec_otherwise() {
        let record = Record::raw(Bytes::from_static(b"{}"), Format::JSON);
        assert!(matches!(
            record.clone().into_value(&NoCodec),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(record.into_bytes(&NoCodec, &Format::TEXT).is_err());
    }
}
