//! The document store and its cache-through primitives.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, trace};
use vdoc_core::path;
use vdoc_core::{Codec, DirectoryIndex, DocumentStat, Record, Value};
use vdoc_driver::{AccessContext, AccessLevel, Driver, DriverError};
use vdoc_serde::MultiCodec;

use crate::cache::{Cache, Lookup};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::federation::Delegate;

/// A virtual document store over a [`Driver`].
///
/// The store owns two caches (decoded content and stat metadata), a memo of
/// inherited settings and globals, and any directory indexes built so far.
/// Every operation takes `&mut self`; the driver call is the only blocking
/// point.
///
/// Addresses are canonicalized to absolute form with no trailing `/`, so
/// `"docs/a.json"`, `"/docs/a.json"` and `"/docs/./a.json"` share one cache
/// slot.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use vdoc_drivers::MemoryDriver;
/// use vdoc_store::DocumentStore;
///
/// let driver = MemoryDriver::from_json(json!({
///     "_/index.json": {"global": "value"},
///     "data.json": {"$ref": "_/index.json", "key": "val"},
/// }))
/// .unwrap();
/// let mut store = DocumentStore::new(driver);
///
/// let value = store.fetch_default("data.json").unwrap().unwrap();
/// assert_eq!(value.get("global").and_then(|v| v.as_str()), Some("value"));
/// assert_eq!(value.get("key").and_then(|v| v.as_str()), Some("val"));
/// ```
pub struct DocumentStore {
    pub(crate) driver: Box<dyn Driver>,
    pub(crate) codec: Box<dyn Codec>,
    pub(crate) config: StoreConfig,
    pub(crate) context: AccessContext,
    pub(crate) content: Cache<Value>,
    pub(crate) meta: Cache<DocumentStat>,
    /// Merged settings and globals, keyed by document and fetch flags.
    pub(crate) memo: Cache<Option<Value>>,
    pub(crate) indexes: HashMap<(String, bool), DirectoryIndex>,
    pub(crate) delegates: Vec<Delegate>,
    connected: bool,
}

/// Absolute form of `uri` without a trailing `/` (the root stays `/`).
pub(crate) fn canonical(uri: &str) -> String {
    let absolute = path::absolute("/", ".", &[uri]);
    if absolute.len() > 1 && absolute.ends_with('/') {
        absolute.trim_end_matches('/').to_string()
    } else {
        absolute
    }
}

/// Directory form of `uri`: canonical with a trailing `/`.
pub(crate) fn dir_path(uri: &str) -> String {
    let canonical = canonical(uri);
    if canonical.ends_with('/') {
        canonical
    } else {
        format!("{}/", canonical)
    }
}

impl DocumentStore {
    /// A store over `driver` with the default configuration.
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self::with_config(driver, StoreConfig::default())
    }

    /// A store over `driver` tuned by `config`.
    pub fn with_config(driver: impl Driver + 'static, config: StoreConfig) -> Self {
        let ttl = config.cache_ttl();
        DocumentStore {
            driver: Box::new(driver),
            codec: Box::new(MultiCodec::standard()),
            config,
            context: AccessContext::anonymous(),
            content: Cache::new(ttl),
            meta: Cache::new(ttl),
            memo: Cache::new(ttl),
            indexes: HashMap::new(),
            delegates: Vec::new(),
            connected: false,
        }
    }

    /// Replace the codec used to decode and encode documents.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Set the context handed to every access check.
    #[must_use]
    pub fn with_context(mut self, context: AccessContext) -> Self {
        self.context = context;
        self
    }

    /// The configuration in effect.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The context handed to access checks.
    pub fn context(&self) -> &AccessContext {
        &self.context
    }

    /// Replace the access context.
    pub fn set_context(&mut self, context: AccessContext) {
        self.context = context;
    }

    /// Whether the driver connection is open.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Open the driver connection. Primitives connect lazily, so calling this
    /// is only needed to surface connection errors early.
    pub fn connect(&mut self) -> Result<()> {
        self.driver.connect()?;
        self.connected = true;
        for delegate in &mut self.delegates {
            delegate.store.connect()?;
        }
        Ok(())
    }

    /// Close the driver connection and drop every cache.
    pub fn disconnect(&mut self) -> Result<()> {
        for delegate in &mut self.delegates {
            delegate.store.disconnect()?;
        }
        if self.connected {
            self.driver.disconnect()?;
            self.connected = false;
        }
        self.clear_cache();
        Ok(())
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if !self.connected {
            debug!("Connecting driver...");
            self.driver.connect()?;
            self.connected = true;
        }
        Ok(())
    }

    fn authorize(&self, uri: &str, level: AccessLevel) -> Result<()> {
        if self.driver.access(uri, level, &self.context)? {
            Ok(())
        } else {
            Err(StoreError::AccessDenied {
                uri: uri.to_string(),
                level,
            })
        }
    }

    /// Load a document, decoded by its extension's format.
    ///
    /// Returns `Ok(None)` when nothing is stored there, when the driver
    /// rejects the read or when the bytes fail to decode. Only an access
    /// denial is an error.
    pub fn get(&mut self, uri: &str) -> Result<Option<Value>> {
        let uri = canonical(uri);
        if let Some((index, inner)) = self.route(&uri) {
            return self.delegates[index].store.get(&inner);
        }

        if let Lookup::Hit(value) = self.content.lookup(&uri) {
            trace!("Cache hit for {}", uri);
            return Ok(Some(value));
        }
        self.load(&uri)
    }

    fn load(&mut self, uri: &str) -> Result<Option<Value>> {
        self.ensure_connected()?;
        self.authorize(uri, AccessLevel::Read)?;

        debug!("Loading {}...", uri);
        let bytes = match self.driver.read(uri) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.content.remove(uri);
                return Ok(None);
            }
            Err(e) if e.is_access_denied() => return Err(e.into()),
            Err(e) => {
                debug!(uri = %uri, error = %e, "read rejected, treating as not found");
                self.content.remove(uri);
                return Ok(None);
            }
        };

        let format = self.config.format_for(uri);
        match Record::raw(bytes, format).into_value(self.codec.as_ref()) {
            Ok(value) => {
                self.content.insert(uri, value.clone());
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "undecodable document treated as not found");
                Ok(None)
            }
        }
    }

    /// Encode and write a document, then stamp its metadata with the current
    /// time.
    pub fn set(&mut self, uri: &str, value: impl Into<Value>) -> Result<()> {
        let uri = canonical(uri);
        let value = value.into();
        if let Some((index, inner)) = self.route(&uri) {
            return self.delegates[index].store.set(&inner, value);
        }

        self.ensure_connected()?;
        self.authorize(&uri, AccessLevel::Write)?;

        let format = self.config.format_for(&uri);
        let bytes = Record::parsed(value.clone()).into_bytes(self.codec.as_ref(), &format)?;
        let size = bytes.len() as u64;
        debug!("Writing {} ({} bytes)...", uri, size);
        self.driver.write(&uri, bytes)?;

        let stat = DocumentStat::file(size, Some(Utc::now()));
        self.content.insert(uri.clone(), value);
        self.forget_ancestors(&uri);
        self.meta.insert(uri.clone(), stat.clone());
        self.memo.clear();
        self.index_upsert(&uri, stat);
        Ok(())
    }

    /// Append raw bytes to a document.
    pub fn append(&mut self, uri: &str, chunk: impl Into<Bytes>) -> Result<()> {
        let uri = canonical(uri);
        let chunk = chunk.into();
        if let Some((index, inner)) = self.route(&uri) {
            return self.delegates[index].store.append(&inner, chunk);
        }

        self.ensure_connected()?;
        self.authorize(&uri, AccessLevel::Write)?;
        debug!("Appending {} bytes to {}...", chunk.len(), uri);
        self.driver.append(&uri, chunk)?;

        self.content.remove(&uri);
        self.meta.remove(&uri);
        self.forget_ancestors(&uri);
        self.memo.clear();
        let stat = self.stat(&uri)?;
        self.index_upsert(&uri, stat);
        Ok(())
    }

    /// Read metadata. A missing or unreadable address reports
    /// `exists == false`.
    pub fn stat(&mut self, uri: &str) -> Result<DocumentStat> {
        let uri = canonical(uri);
        if let Some((index, inner)) = self.route(&uri) {
            return self.delegates[index].store.stat(&inner);
        }
        if self.is_mount_parent(&uri) {
            return Ok(DocumentStat::directory(None));
        }

        if let Lookup::Hit(stat) = self.meta.lookup(&uri) {
            trace!("Stat cache hit for {}", uri);
            return Ok(stat);
        }

        self.ensure_connected()?;
        self.authorize(&uri, AccessLevel::Read)?;
        debug!("Stat {}...", uri);
        match self.driver.stat(&uri) {
            Ok(stat) => {
                self.meta.insert(uri, stat.clone());
                Ok(stat)
            }
            Err(e) if e.is_access_denied() => Err(e.into()),
            Err(e) => {
                debug!(uri = %uri, error = %e, "stat rejected, treating as not found");
                Ok(DocumentStat::failed(e.to_string()))
            }
        }
    }

    /// Whether anything is stored at `uri`. Documents seen in a listing count
    /// as existing without a stat.
    pub fn exists(&mut self, uri: &str) -> Result<bool> {
        let uri = canonical(uri);
        if self.route(&uri).is_none() && self.content.contains(&uri) {
            return Ok(true);
        }
        Ok(self.stat(&uri)?.exists)
    }

    /// Whether `uri` names a document rather than a directory.
    pub(crate) fn is_document(&mut self, uri: &str) -> Result<bool> {
        if self.route(uri).is_none() && self.content.contains(uri) {
            return Ok(true);
        }
        Ok(self.stat(uri)?.is_file())
    }

    /// Delete a document or directory. Returns `false` when nothing was there.
    pub fn delete(&mut self, uri: &str) -> Result<bool> {
        let uri = canonical(uri);
        if let Some((index, inner)) = self.route(&uri) {
            return self.delegates[index].store.delete(&inner);
        }

        self.ensure_connected()?;
        self.authorize(&uri, AccessLevel::Write)?;
        debug!("Deleting {}...", uri);
        let deleted = match self.driver.delete(&uri) {
            Ok(()) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e.into()),
        };

        self.invalidate(&uri);
        self.index_remove(&uri);
        Ok(deleted)
    }

    /// Move a document or directory, across delegates if needed.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = canonical(from);
        let to = canonical(to);
        match (self.route(&from), self.route(&to)) {
            (None, None) => self.rename_local(&from, &to),
            (Some((a, inner_from)), Some((b, inner_to))) if a == b => {
                self.delegates[a].store.rename(&inner_from, &inner_to)
            }
            _ => self.rename_across(&from, &to),
        }
    }

    fn rename_local(&mut self, from: &str, to: &str) -> Result<()> {
        self.ensure_connected()?;
        self.authorize(from, AccessLevel::Write)?;
        self.authorize(to, AccessLevel::Write)?;
        debug!("Moving {} to {}...", from, to);
        self.driver.rename(from, to).map_err(|e| match e {
            DriverError::NotFound { uri } => StoreError::NotFound { uri },
            e if e.is_not_found() => StoreError::NotFound {
                uri: from.to_string(),
            },
            other => other.into(),
        })?;

        self.invalidate(from);
        self.invalidate(to);
        self.forget_ancestors(to);
        self.index_remove(from);
        self.index_insert_tree(to)?;
        Ok(())
    }

    /// Read, write, delete: the only way to move between two drivers.
    fn rename_across(&mut self, from: &str, to: &str) -> Result<()> {
        let value = self.get(from)?.ok_or_else(|| StoreError::NotFound {
            uri: from.to_string(),
        })?;
        self.set(to, value)?;
        self.delete(from)?;
        Ok(())
    }

    /// Immediate child names of a directory, directories suffixed with `/`.
    ///
    /// Child documents are remembered as existing (but unloaded) in the
    /// content cache. Attached delegates show up as directories. A missing
    /// directory lists as empty. A built or loaded index covering the
    /// directory answers instead of the driver.
    pub fn list_dir(&mut self, uri: &str) -> Result<Vec<String>> {
        let uri = canonical(uri);
        if let Some((index, inner)) = self.route(&uri) {
            return self.delegates[index].store.list_dir(&inner);
        }

        self.ensure_connected()?;
        self.authorize(&uri, AccessLevel::List)?;
        let mut names = match self.indexed_names(&uri) {
            Some(names) => {
                trace!("Listing {} from its index", uri);
                names
            }
            None => {
                debug!("Listing {}...", uri);
                match self.driver.list_dir(&uri) {
                    Ok(names) => names,
                    Err(e) if e.is_access_denied() => return Err(e.into()),
                    Err(e) => {
                        debug!(uri = %uri, error = %e, "listing rejected, treating as empty");
                        Vec::new()
                    }
                }
            }
        };

        let dir = dir_path(&uri);
        for name in &names {
            if !path::is_dir(name) {
                self.content.mark_unloaded(format!("{}{}", dir, name));
            }
        }
        for mount in self.mount_names(&uri) {
            if !names.contains(&mount) {
                names.push(mount);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Drop cached content, stats and memoized settings at or below `uri`.
    pub fn invalidate(&mut self, uri: &str) {
        let uri = canonical(uri);
        self.content.remove_tree(&uri);
        self.meta.remove_tree(&uri);
        self.memo.clear();
    }

    /// Drop every cache, including built indexes.
    pub fn clear_cache(&mut self) {
        self.content.clear();
        self.meta.clear();
        self.memo.clear();
        self.indexes.clear();
    }

    /// Ancestors may have been cached as missing before a write created them.
    fn forget_ancestors(&mut self, uri: &str) {
        let mut dir = canonical(&path::dirname(uri));
        while dir != "/" {
            self.meta.remove(&dir);
            dir = canonical(&path::dirname(&dir));
        }
        self.meta.remove("/");
    }
}
