//! Error types for the core layer.

use crate::format::Format;

/// Failures of the flat-key data algebra.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// A bracketed segment that is not a valid array index.
    #[error("malformed flat key {key:?}: bad segment {segment:?}")]
    MalformedPath { key: String, segment: String },

    /// Unflatten nested deeper than the configured limit.
    #[error("flat key {key:?} nests deeper than {max} levels")]
    DepthExceeded { key: String, max: usize },
}

/// Failures decoding a persisted directory index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("index text is empty")]
    Empty,

    #[error("index header is missing or unrecognized")]
    BadHeader,

    #[error("index row {line}: {message}")]
    BadRow { line: usize, message: String },
}

/// Errors at the core layer.
///
/// These cover the pure algebras and codec failures. Driver and access
/// failures are layered on top by the store.
#[derive(Debug)]
pub enum Error {
    /// Flatten/unflatten failure.
    Data(DataError),

    /// Directory index decode failure.
    Index(IndexError),

    /// Codec failed to decode bytes.
    Decode { format: Format, message: String },

    /// Codec failed to encode value.
    Encode { format: Format, message: String },

    /// Format not supported by codec.
    UnsupportedFormat(Format),

    /// Generic error with message.
    Other { message: String },
}

impl Error {
    /// Decoding `format` failed.
    pub fn decode(format: Format, message: impl Into<String>) -> Self {
        Error::Decode {
            format,
            message: message.into(),
        }
    }

    /// Encoding `format` failed.
    pub fn encode(format: Format, message: impl Into<String>) -> Self {
        Error::Encode {
            format,
            message: message.into(),
        }
    }

    /// An error with only a message.
    pub fn other(message: impl Into<String>) -> Self {
        Error::Other {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Data(e) => write!(f, "data error: {}", e),
            Error::Index(e) => write!(f, "index error: {}", e),
            Error::Decode { format, message } => {
                write!(f, "decode error ({}): {}", format, message)
            }
            Error::Encode { format, message } => {
                write!(f, "encode error ({}): {}", format, message)
            }
            Error::UnsupportedFormat(format) => {
                write!(f, "unsupported format: {}", format)
            }
            Error::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Data(e) => Some(e),
            Error::Index(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DataError> for Error {
    fn from(e: DataError) -> Self {
        Error::Data(e)
    }
}

impl From<IndexError> for Error {
    fn from(e: IndexError) -> Self {
        Error::Index(e)
    }
}
