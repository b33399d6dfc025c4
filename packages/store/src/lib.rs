//! The vdoc document store.
//!
//! A [`DocumentStore`] sits on a [`Driver`](vdoc_driver::Driver) and turns its
//! bytes into assembled documents:
//!
//! - `get`/`set`/`stat` and friends are cache-through primitives;
//! - `fetch` tries candidates for extension-less addresses, merges directory settings and
//!   globals, and resolves `$ref` markers;
//! - `read_dir` and `find_stream` walk trees lazily, the latter with a
//!   progress estimate;
//! - directory indexes can be built, saved and reloaded;
//! - sub-stores can be attached under a prefix.
//!
//! Missing content is never an error: reads return `Ok(None)` and broken
//! references stay in the document as markers. Only access denials, encoding
//! failures and malformed flat keys surface as [`StoreError`].

mod cache;
mod config;
mod error;
mod federation;
mod fetch;
mod indexing;
mod options;
mod references;
mod store;
mod stream;
mod traversal;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use indexing::{FULL_INDEX_FILE, INDEX_FILE};
pub use options::{FetchOptions, PathFilter, SortKey, SortOrder, TraversalOptions};
pub use store::DocumentStore;
pub use stream::{FindEvent, FindStream};
pub use traversal::ReadDir;
