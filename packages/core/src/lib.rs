//! Core vdoc: the pure algebra under a document store
//!
//! Everything here is free of I/O:
//! - [`path`]: '/'-separated path and URI algebra
//! - [`Value`]: the tree every document decodes into
//! - [`flat`]: flat-key flatten/unflatten/merge over values
//! - [`reference`]: `$ref` marker discovery
//! - [`DocumentEntry`] and [`DirectoryIndex`]: traversal records and their
//!   persisted form
//! - [`Format`], [`Record`] and [`Codec`]: the seam to driver bytes
//!
//! # Example
//!
//! ```rust
//! use vdoc_core::{flat, path, Value};
//!
//! let doc: Value = [("name", "vdoc")].into_iter().collect();
//! let entries = flat::flatten(&doc);
//! assert_eq!(flat::unflatten(&entries).unwrap(), doc);
//!
//! assert_eq!(path::dirname("/a/b/file"), "/a/b/");
//! ```

pub use bytes::Bytes;

mod entry;
mod error;
pub mod flat;
mod format;
mod index;
pub mod path;
mod record;
pub mod reference;
mod traits;
mod value;

pub use entry::DocumentEntry;
pub use error::{DataError, Error, IndexError};
pub use flat::{DataConfig, Flat, FlatEntry};
pub use format::Format;
pub use index::{DirectoryIndex, IndexColumn};
pub use record::Record;
pub use reference::{MarkerSite, Reference, REFERENCE_KEY};
pub use traits::{Codec, NoCodec};
pub use value::Value;

// Re-export driver-level records for convenience
pub use vdoc_driver::{DocumentKind, DocumentStat};
