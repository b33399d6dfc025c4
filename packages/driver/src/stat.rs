//! Stat records produced by drivers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of node lives at an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    File,
    Directory,
    Symlink,
}

impl DocumentKind {
    /// Short tag used in listings and index rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::File => "file",
            DocumentKind::Directory => "dir",
            DocumentKind::Symlink => "symlink",
        }
    }

    /// Parse a tag produced by [`as_str`](Self::as_str).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(DocumentKind::File),
            "dir" | "directory" => Some(DocumentKind::Directory),
            "symlink" => Some(DocumentKind::Symlink),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for a single address.
///
/// A stat for a missing address is still a valid record: `exists` is false
/// and `error` may carry the reason the lookup failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentStat {
    pub exists: bool,
    pub kind: DocumentKind,
    pub size: u64,
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentStat {
    /// Stat for an address with nothing behind it.
    pub fn missing() -> Self {
        Self::default()
    }

    /// Stat for a lookup that failed for a reason other than absence.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Stat for an existing file.
    pub fn file(size: u64, mtime: Option<DateTime<Utc>>) -> Self {
        Self {
            exists: true,
            kind: DocumentKind::File,
            size,
            mtime,
            error: None,
        }
    }

    /// Stat for an existing directory.
    pub fn directory(mtime: Option<DateTime<Utc>>) -> Self {
        Self {
            exists: true,
            kind: DocumentKind::Directory,
            size: 0,
            mtime,
            error: None,
        }
    }

    /// Stat for an existing symbolic link.
    pub fn symlink(mtime: Option<DateTime<Utc>>) -> Self {
        Self {
            exists: true,
            kind: DocumentKind::Symlink,
            size: 0,
            mtime,
            error: None,
        }
    }

    /// Whether this is an existing regular file.
    pub fn is_file(&self) -> bool {
        self.exists && self.kind == DocumentKind::File
    }

    /// Whether this is an existing directory.
    pub fn is_dir(&self) -> bool {
        self.exists && self.kind == DocumentKind::Directory
    }

    /// Whether this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.exists && self.kind == DocumentKind::Symlink
    }

    /// Modification time in milliseconds since the epoch, 0 when unknown.
    pub fn mtime_millis(&self) -> i64 {
        self.mtime.map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}
