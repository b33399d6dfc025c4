//! Persisted directory indexes.
//!
//! An index snapshots the entries of a subtree so a store can reload listings
//! and stats without rescanning the driver. The text form is one JSON header
//! line followed by one JSON array per entry:
//!
//! ```text
//! {"format":"vdoc-index","version":1,"recursive":false,"columns":["kind","size","mtime"]}
//! ["a.json","file",12,1700000000000]
//! ["sub/","dir",0,null]
//! ```
//!
//! Paths are relative to the indexed directory; directories keep their
//! trailing `/`. Both the per-directory and the recursive variant share this
//! format and `decode` accepts either.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use vdoc_driver::{DocumentKind, DocumentStat};

use crate::error::IndexError;
use crate::path;

const FORMAT_TAG: &str = "vdoc-index";
const VERSION: u32 = 1;

/// A stat field persisted per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexColumn {
    Kind,
    Size,
    Mtime,
}

impl IndexColumn {
    /// Every column, in header order.
    pub const ALL: [IndexColumn; 3] = [IndexColumn::Kind, IndexColumn::Size, IndexColumn::Mtime];
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
    recursive: bool,
    columns: Vec<IndexColumn>,
}

/// Entry set of one directory (or a whole subtree when `recursive`).
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryIndex {
    pub recursive: bool,
    pub columns: Vec<IndexColumn>,
    entries: BTreeMap<String, DocumentStat>,
}

impl DirectoryIndex {
    /// Create an empty index with all columns.
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            columns: IndexColumn::ALL.to_vec(),
            entries: BTreeMap::new(),
        }
    }

    /// Insert or replace the stat for a relative path. Parent directories of
    /// a nested path are recorded too when the index is recursive.
    pub fn upsert(&mut self, relative: &str, stat: DocumentStat) {
        if self.recursive {
            let mut parent = path::dirname(relative);
            while parent != "." && parent != "/" {
                self.entries
                    .entry(parent.clone())
                    .or_insert_with(|| DocumentStat::directory(None));
                parent = path::dirname(&parent);
            }
        }
        self.entries.insert(relative.to_string(), stat);
    }

    /// Remove a path and, for directories, everything beneath it.
    pub fn remove(&mut self, relative: &str) -> bool {
        let dir_form = format!("{}/", relative.trim_end_matches('/'));
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key != relative && key != &dir_form && !key.starts_with(&dir_form));
        self.entries.len() != before
    }

    /// Stat recorded for a relative path.
    pub fn get(&self, relative: &str) -> Option<&DocumentStat> {
        self.entries.get(relative)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DocumentStat)> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the index as text.
    pub fn encode(&self) -> String {
        let header = Header {
            format: FORMAT_TAG.to_string(),
            version: VERSION,
            recursive: self.recursive,
            columns: self.columns.clone(),
        };
        let mut out = serde_json::to_string(&header).unwrap_or_default();
        out.push('\n');
        for (relative, stat) in &self.entries {
            let mut row = vec![Json::from(relative.as_str())];
            for column in &self.columns {
                row.push(match column {
                    IndexColumn::Kind => Json::from(stat.kind.as_str()),
                    IndexColumn::Size => Json::from(stat.size),
                    IndexColumn::Mtime => stat.mtime.map_or(Json::Null, |t| {
                        Json::from(t.timestamp_millis())
                    }),
                });
            }
            out.push_str(&Json::Array(row).to_string());
            out.push('\n');
        }
        out
    }

    /// Parse text produced by [`encode`](Self::encode).
    pub fn decode(text: &str) -> Result<Self, IndexError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
        let (_, first) = lines.next().ok_or(IndexError::Empty)?;
        let header: Header = serde_json::from_str(first).map_err(|_| IndexError::BadHeader)?;
        if header.format != FORMAT_TAG || header.version != VERSION {
            return Err(IndexError::BadHeader);
        }

        let mut index = DirectoryIndex {
            recursive: header.recursive,
            columns: header.columns,
            entries: BTreeMap::new(),
        };
        for (number, line) in lines {
            let line_no = number + 1;
            let bad = |message: &str| IndexError::BadRow {
                line: line_no,
                message: message.to_string(),
            };
            let row: Vec<Json> =
                serde_json::from_str(line).map_err(|e| bad(&e.to_string()))?;
            if row.len() != index.columns.len() + 1 {
                return Err(bad("column count mismatch"));
            }
            let relative = row[0].as_str().ok_or_else(|| bad("path is not a string"))?;
            let mut stat = DocumentStat {
                exists: true,
                ..DocumentStat::default()
            };
            for (column, cell) in index.columns.iter().zip(&row[1..]) {
                match column {
                    IndexColumn::Kind => {
                        stat.kind = cell
                            .as_str()
                            .and_then(DocumentKind::parse)
                            .ok_or_else(|| bad("unknown kind"))?;
                    }
                    IndexColumn::Size => {
                        stat.size = cell.as_u64().ok_or_else(|| bad("size is not a number"))?;
                    }
                    IndexColumn::Mtime => {
                        stat.mtime = match cell {
                            Json::Null => None,
                            other => Some(
                                other
                                    .as_i64()
                                    .and_then(DateTime::from_timestamp_millis)
                                    .ok_or_else(|| bad("mtime is not a timestamp"))?,
                            ),
                        };
                    }
                }
            }
            if relative.ends_with('/') && !index.columns.contains(&IndexColumn::Kind) {
                stat.kind = DocumentKind::Directory;
            }
            index.entries.insert(relative.to_string(), stat);
        }
        Ok(index)
    }
}
