//! Format hints for document encoding.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A hint about the encoding of a document's bytes.
///
/// MIME-type-like strings; codecs decide which ones they understand. The
/// store derives a format from a document's extension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format(pub Cow<'static, str>);

impl Format {
    /// JSON documents (`application/json`)
    pub const JSON: Format = Format(Cow::Borrowed("application/json"));

    /// UTF-8 text (`text/plain`)
    pub const TEXT: Format = Format(Cow::Borrowed("text/plain"));

    /// Opaque binary data (`application/octet-stream`)
    pub const OCTET_STREAM: Format = Format(Cow::Borrowed("application/octet-stream"));

    /// A value that was never serialized.
    pub const VALUE: Format = Format(Cow::Borrowed("application/x-vdoc-value"));

    /// Wrap a static media type.
    pub const fn from_static(s: &'static str) -> Self {
        Format(Cow::Borrowed(s))
    }

    /// Wrap a media type.
    pub fn new(s: impl Into<String>) -> Self {
        Format(Cow::Owned(s.into()))
    }

    /// The media type string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is JSON.
    pub fn is_json(&self) -> bool {
        self == &Self::JSON
    }

    /// Whether this is a `text/*` type.
    pub fn is_text(&self) -> bool {
        self == &Self::TEXT || self.0.starts_with("text/")
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::OCTET_STREAM
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for Format {
    fn from(s: &'static str) -> Self {
        Format(Cow::Borrowed(s))
    }
}

impl From<String> for Format {
    fn from(s: String) -> Self {
        Format(Cow::Owned(s))
    }
}

impl AsRef<str> for Format {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Format {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Format {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Format::from)
    }
}
