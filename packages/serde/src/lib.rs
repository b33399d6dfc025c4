//! Serde integration for vdoc
//!
//! - `JsonCodec` and `TextCodec`: codecs for JSON and plain documents
//! - `MultiCodec`: format routing over several codecs
//! - Value <-> serde conversions for typed access
//!
//! # Example
//!
//! ```rust
//! use serde::Deserialize;
//! use vdoc_serde::{from_value, json_to_value};
//!
//! #[derive(Deserialize)]
//! struct Site {
//!     title: String,
//! }
//!
//! let value = json_to_value(serde_json::json!({"title": "docs"}));
//! let site: Site = from_value(&value).unwrap();
//! assert_eq!(site.title, "docs");
//! ```

pub use bytes::Bytes;

mod codec;
mod convert;

pub use codec::{JsonCodec, MultiCodec, TextCodec};
pub use convert::{from_value, json_to_value, to_value, value_to_json};

// Re-export core types for convenience
pub use vdoc_core::{Codec, Error, Format, Value};
