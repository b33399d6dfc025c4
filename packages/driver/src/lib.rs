//! vdoc drivers: the physical layer under a document store.
//!
//! This is the narrow waist of the vdoc stack. Everything at this level is
//! pure bytes addressed by absolute '/'-separated strings - no path algebra,
//! no value semantics, no format interpretation.
//!
//! A driver provides:
//! - `read`/`write`/`append`/`delete`/`rename` on documents
//! - `stat` lookups producing [`DocumentStat`]
//! - `list_dir` listings (directories suffixed with `/`)
//! - an `access` hook for authorization
//!
//! # Example
//!
//! ```rust
//! use vdoc_driver::{Driver, DriverError, DocumentStat};
//! use bytes::Bytes;
//!
//! struct Flat(std::collections::HashMap<String, Bytes>);
//!
//! impl Driver for Flat {
//!     fn read(&mut self, uri: &str) -> Result<Option<Bytes>, DriverError> {
//!         Ok(self.0.get(uri).cloned())
//!     }
//!     fn write(&mut self, uri: &str, document: Bytes) -> Result<(), DriverError> {
//!         self.0.insert(uri.to_string(), document);
//!         Ok(())
//!     }
//!     fn stat(&mut self, uri: &str) -> Result<DocumentStat, DriverError> {
//!         Ok(self.0.get(uri).map_or_else(DocumentStat::missing, |b| {
//!             DocumentStat::file(b.len() as u64, None)
//!         }))
//!     }
//!     fn delete(&mut self, uri: &str) -> Result<(), DriverError> {
//!         self.0.remove(uri);
//!         Ok(())
//!     }
//!     fn list_dir(&mut self, _uri: &str) -> Result<Vec<String>, DriverError> {
//!         Ok(Vec::new())
//!     }
//! }
//! ```

pub use bytes::Bytes;

mod access;
mod error;
mod stat;
mod traits;

pub use access::{AccessContext, AccessLevel};
pub use error::DriverError;
pub use stat::{DocumentKind, DocumentStat};
pub use traits::Driver;
