//! vdoc: a virtual document store.
//!
//! Documents are addressed by path and stored through a pluggable
//! [`Driver`]. Reading one through [`DocumentStore::fetch`] assembles it:
//! the directory settings above it and the globals of enclosing `_`
//! directories are merged in, and `$ref` markers are replaced by the
//! documents (or fragments) they point at.
//!
//! ```rust
//! use serde_json::json;
//! use vdoc::{json_to_value, value_to_json, DocumentStore, MemoryDriver};
//!
//! let driver = MemoryDriver::from_json(json!({
//!     "/index.json": {"lang": "en"},
//!     "/shared/author.json": {"name": "Ann"},
//! }))
//! .unwrap();
//! let mut store = DocumentStore::new(driver);
//!
//! let post = json_to_value(json!({"title": "Hello", "author": {"$ref": "shared/author.json"}}));
//! store.set("/post.json", post).unwrap();
//!
//! let post = store.fetch_default("/post").unwrap().unwrap();
//! assert_eq!(
//!     value_to_json(&post),
//!     json!({"lang": "en", "title": "Hello", "author": {"lang": "en", "name": "Ann"}})
//! );
//! ```
//!
//! The layers are separate crates, re-exported here:
//!
//! - `vdoc-driver`: the [`Driver`] trait, stats and access levels;
//! - `vdoc-core`: paths, values, flat keys, references and indexes;
//! - `vdoc-serde`: codecs and conversions to and from JSON;
//! - `vdoc-drivers`: [`MemoryDriver`] and [`LocalDriver`];
//! - `vdoc-store`: the [`DocumentStore`] itself.

pub use vdoc_core::{
    flat, path, reference, DataConfig, DirectoryIndex, DocumentEntry, Format, Record, Value,
};
pub use vdoc_driver::{AccessContext, AccessLevel, DocumentKind, DocumentStat, Driver, DriverError};
pub use vdoc_drivers::{LocalDriver, MemoryDriver};
pub use vdoc_serde::{from_value, json_to_value, to_value, value_to_json, MultiCodec};
pub use vdoc_store::{
    DocumentStore, FetchOptions, FindEvent, FindStream, PathFilter, ReadDir, Result, SortKey,
    SortOrder, StoreConfig, StoreError, TraversalOptions,
};
