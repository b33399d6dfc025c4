//! In-memory driver.
//!
//! Documents live in a sorted map keyed by absolute path. Directories are
//! implied by the documents beneath them and remembered once created, so an
//! emptied directory still lists (like a filesystem would).

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use vdoc_core::path;
use vdoc_driver::{AccessContext, AccessLevel, DocumentStat, Driver, DriverError};

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Bytes,
    mtime: DateTime<Utc>,
}

/// A driver keeping every document in memory.
///
/// # Example
///
/// ```rust
/// use vdoc_drivers::MemoryDriver;
/// use vdoc_driver::{Driver, Bytes};
///
/// let mut driver = MemoryDriver::new();
/// driver.write("/docs/a.json", Bytes::from_static(b"{}")).unwrap();
///
/// assert!(driver.stat("/docs/").unwrap().is_dir());
/// assert_eq!(driver.list_dir("/docs").unwrap(), vec!["a.json".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    files: BTreeMap<String, MemoryFile>,
    dirs: BTreeMap<String, DateTime<Utc>>,
    read_only: BTreeSet<String>,
    denied: BTreeSet<String>,
    connected: bool,
}

/// Map a store address onto the internal key: leading `/`, no trailing `/`.
fn key(uri: &str) -> String {
    let normalized = path::join(&["/", uri]);
    if normalized.len() > 1 {
        normalized.trim_end_matches('/').to_string()
    } else {
        normalized
    }
}

fn child_of<'a>(dir: &str, candidate: &'a str) -> Option<&'a str> {
    let rest = if dir == "/" {
        candidate.strip_prefix('/')?
    } else {
        candidate.strip_prefix(dir)?.strip_prefix('/')?
    };
    (!rest.is_empty()).then_some(rest)
}

impl MemoryDriver {
    /// Create an empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed documents from a JSON object of `path -> content`.
    ///
    /// Content under a `.json` path is stored serialized; strings under any
    /// other path are stored verbatim.
    pub fn from_json(documents: JsonValue) -> Result<Self, DriverError> {
        let mut driver = Self::new();
        let map = match documents {
            JsonValue::Object(map) => map,
            other => {
                return Err(DriverError::InvalidAddress {
                    uri: "/".to_string(),
                    message: format!("seed documents must be an object, got {}", other),
                })
            }
        };
        for (uri, content) in map {
            driver.insert_json(&uri, &content)?;
        }
        Ok(driver)
    }

    /// Store a JSON value at `uri`, serialized by extension.
    pub fn insert_json(&mut self, uri: &str, content: &JsonValue) -> Result<(), DriverError> {
        let bytes = match content {
            JsonValue::String(s) if path::extname(uri) != ".json" => Bytes::from(s.clone()),
            other => Bytes::from(
                serde_json::to_vec(other).map_err(|e| DriverError::Transport(Box::new(e)))?,
            ),
        };
        self.write(uri, bytes)
    }

    /// Create an (empty) directory and its parents.
    pub fn create_dir(&mut self, uri: &str) {
        let now = Utc::now();
        let mut dir = key(uri);
        while dir != "/" {
            self.dirs.entry(dir.clone()).or_insert(now);
            dir = key(&path::dirname(&dir));
        }
    }

    /// Override a document's modification time.
    pub fn touch(&mut self, uri: &str, mtime: DateTime<Utc>) -> bool {
        let key = key(uri);
        if let Some(file) = self.files.get_mut(&key) {
            file.mtime = mtime;
            true
        } else if let Some(dir) = self.dirs.get_mut(&key) {
            *dir = mtime;
            true
        } else {
            false
        }
    }

    /// Refuse writes at or below `prefix`.
    pub fn set_read_only(&mut self, prefix: &str) {
        self.read_only.insert(key(prefix));
    }

    /// Refuse every access at or below `prefix`.
    pub fn deny(&mut self, prefix: &str) {
        self.denied.insert(key(prefix));
    }

    /// Whether `connect` ran without a later `disconnect`.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no document is stored.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn covered(prefixes: &BTreeSet<String>, key: &str) -> bool {
        prefixes
            .iter()
            .any(|p| p == "/" || key == p || child_of(p, key).is_some())
    }

    fn is_dir_key(&self, key: &str) -> bool {
        key == "/"
            || self.dirs.contains_key(key)
            || self.files.keys().any(|k| child_of(key, k).is_some())
    }
}

impl Driver for MemoryDriver {
    fn connect(&mut self) -> Result<(), DriverError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        self.connected = false;
        Ok(())
    }

    fn access(
        &self,
        uri: &str,
        level: AccessLevel,
        _context: &AccessContext,
    ) -> Result<bool, DriverError> {
        let key = key(uri);
        if Self::covered(&self.denied, &key) {
            return Ok(false);
        }
        Ok(level != AccessLevel::Write || !Self::covered(&self.read_only, &key))
    }

    fn read(&mut self, uri: &str) -> Result<Option<Bytes>, DriverError> {
        Ok(self.files.get(&key(uri)).map(|f| f.content.clone()))
    }

    fn write(&mut self, uri: &str, document: Bytes) -> Result<(), DriverError> {
        let key = key(uri);
        if key == "/" || self.dirs.contains_key(&key) {
            return Err(DriverError::InvalidAddress {
                uri: uri.to_string(),
                message: "is a directory".to_string(),
            });
        }
        self.create_dir(&path::dirname(&key));
        self.files.insert(
            key,
            MemoryFile {
                content: document,
                mtime: Utc::now(),
            },
        );
        Ok(())
    }

    fn append(&mut self, uri: &str, chunk: Bytes) -> Result<(), DriverError> {
        let combined = match self.files.get(&key(uri)) {
            Some(file) => {
                let mut buf = Vec::with_capacity(file.content.len() + chunk.len());
                buf.extend_from_slice(&file.content);
                buf.extend_from_slice(&chunk);
                Bytes::from(buf)
            }
            None => chunk,
        };
        self.write(uri, combined)
    }

    fn stat(&mut self, uri: &str) -> Result<DocumentStat, DriverError> {
        let key = key(uri);
        if let Some(file) = self.files.get(&key) {
            return Ok(DocumentStat::file(file.content.len() as u64, Some(file.mtime)));
        }
        if self.is_dir_key(&key) {
            return Ok(DocumentStat::directory(self.dirs.get(&key).copied()));
        }
        Ok(DocumentStat::missing())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), DriverError> {
        let from_key = key(from);
        let to_key = key(to);
        if let Some(file) = self.files.remove(&from_key) {
            self.create_dir(&path::dirname(&to_key));
            self.files.insert(to_key, file);
            return Ok(());
        }
        if !self.is_dir_key(&from_key) || from_key == "/" {
            return Err(DriverError::not_found(from));
        }

        let moved: Vec<String> = self
            .files
            .keys()
            .filter(|k| child_of(&from_key, k).is_some())
            .cloned()
            .collect();
        for old in moved {
            if let (Some(file), Some(rest)) = (self.files.remove(&old), child_of(&from_key, &old)) {
                self.files.insert(format!("{}/{}", to_key, rest), file);
            }
        }
        let moved_dirs: Vec<String> = self
            .dirs
            .keys()
            .filter(|k| **k == from_key || child_of(&from_key, k).is_some())
            .cloned()
            .collect();
        for old in moved_dirs {
            if let Some(mtime) = self.dirs.remove(&old) {
                let new = match child_of(&from_key, &old) {
                    Some(rest) => format!("{}/{}", to_key, rest),
                    None => to_key.clone(),
                };
                self.dirs.insert(new, mtime);
            }
        }
        self.create_dir(&to_key);
        Ok(())
    }

    fn delete(&mut self, uri: &str) -> Result<(), DriverError> {
        let key = key(uri);
        if self.files.remove(&key).is_some() {
            return Ok(());
        }
        if !self.is_dir_key(&key) {
            return Err(DriverError::not_found(uri));
        }
        self.files.retain(|k, _| child_of(&key, k).is_none());
        self.dirs
            .retain(|k, _| *k != key && child_of(&key, k).is_none());
        Ok(())
    }

    fn list_dir(&mut self, uri: &str) -> Result<Vec<String>, DriverError> {
        let key = key(uri);
        if !self.is_dir_key(&key) {
            return Err(DriverError::not_found(uri));
        }
        let mut names = BTreeSet::new();
        for file in self.files.keys() {
            if let Some(rest) = child_of(&key, file) {
                match rest.split_once('/') {
                    Some((dir, _)) => names.insert(format!("{}/", dir)),
                    None => names.insert(rest.to_string()),
                };
            }
        }
        for dir in self.dirs.keys() {
            if let Some(rest) = child_of(&key, dir) {
                if let Some(name) = rest.split('/').next() {
                    names.insert(format!("{}/", name));
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}
