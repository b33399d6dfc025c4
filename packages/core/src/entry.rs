//! Traversal entries.

use serde::{Deserialize, Serialize};
use vdoc_driver::DocumentStat;

use crate::path;

/// One node visited during traversal.
///
/// `name` and `parent` are derived from `path`. Directory paths end with `/`.
/// `fulfilled` is flipped by the streaming progress model once every
/// descendant of a directory has been seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub name: String,
    pub path: String,
    pub parent: String,
    pub depth: usize,
    pub stat: DocumentStat,
    #[serde(default)]
    pub fulfilled: bool,
}

impl DocumentEntry {
    /// Build an entry, deriving `name` and `parent` from `path`.
    pub fn new(path: impl Into<String>, stat: DocumentStat, depth: usize) -> Self {
        let mut path = path.into();
        if stat.is_dir() && !path::is_dir(&path) {
            path.push('/');
        }
        let name = path::basename(&path).trim_end_matches('/').to_string();
        let parent = path::dirname(&path);
        Self {
            name,
            path,
            parent,
            depth,
            stat,
            fulfilled: false,
        }
    }

    /// Whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.stat.is_dir()
    }

    /// Whether the entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.stat.is_file()
    }
}
