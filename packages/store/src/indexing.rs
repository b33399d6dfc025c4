//! Directory index building, persistence and incremental upkeep.

use std::collections::HashMap;
use std::mem;

use tracing::debug;
use vdoc_core::{path, DirectoryIndex, DocumentStat, Value};

use crate::error::Result;
use crate::options::TraversalOptions;
use crate::store::{canonical, dir_path, DocumentStore};

/// File holding a directory's own index.
pub const INDEX_FILE: &str = ".index";
/// File holding the recursive index of a whole subtree.
pub const FULL_INDEX_FILE: &str = ".index-full";

fn is_index_file(uri: &str) -> bool {
    let name = path::basename(uri);
    name == INDEX_FILE || name == FULL_INDEX_FILE
}

fn index_file(dir: &str, recursive: bool) -> String {
    let name = if recursive { FULL_INDEX_FILE } else { INDEX_FILE };
    format!("{}{}", dir, name)
}

/// Where a changed path lands in an index.
#[derive(Debug, PartialEq)]
enum Slot {
    /// The path's own row.
    Itself(String),
    /// A child directory of a flat index that now has content.
    Ancestor(String),
}

fn index_slot(dir: &str, recursive: bool, uri: &str, is_dir: bool) -> Option<Slot> {
    let relative = uri.strip_prefix(dir).filter(|r| !r.is_empty())?;
    if !recursive {
        if let Some((first, _)) = relative.split_once('/') {
            return Some(Slot::Ancestor(format!("{}/", first)));
        }
    }
    Some(Slot::Itself(if is_dir {
        format!("{}/", relative)
    } else {
        relative.to_string()
    }))
}

/// Names of `relative`'s immediate children in `index`, listing style.
fn children_in(index: &DirectoryIndex, relative: &str) -> Vec<String> {
    index
        .iter()
        .filter_map(|(key, _)| key.strip_prefix(relative))
        .filter(|rest| !rest.is_empty() && !rest.trim_end_matches('/').contains('/'))
        .map(str::to_string)
        .collect()
}

impl DocumentStore {
    /// Run `scan` against the driver alone, with no cached index answering
    /// listings.
    fn scanning<T>(&mut self, scan: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let cached: HashMap<(String, bool), DirectoryIndex> = mem::take(&mut self.indexes);
        let result = scan(self);
        self.indexes = cached;
        result
    }

    /// Listing of `dir` from a cached index covering it, if any.
    pub(crate) fn indexed_names(&self, dir: &str) -> Option<Vec<String>> {
        if self.indexes.is_empty() {
            return None;
        }
        let dir = dir_path(dir);
        if let Some(index) = self.indexes.get(&(dir.clone(), false)) {
            return Some(children_in(index, ""));
        }
        self.indexes
            .iter()
            .filter(|((_, recursive), _)| *recursive)
            .find_map(|((root, _), index)| {
                let relative = dir.strip_prefix(root.as_str())?;
                if relative.is_empty() || index.get(relative).is_some_and(DocumentStat::is_dir) {
                    Some(children_in(index, relative))
                } else {
                    None
                }
            })
    }

    /// Scan `uri` and cache its index. A recursive index covers the whole
    /// subtree; otherwise only immediate children are recorded.
    pub fn build_index(&mut self, uri: &str, recursive: bool) -> Result<DirectoryIndex> {
        let dir = dir_path(uri);
        debug!("Building {} index of {}", if recursive { "full" } else { "flat" }, dir);
        let options = TraversalOptions::default()
            .with_depth(if recursive { -1 } else { 1 })
            .with_filter(|p| !is_index_file(p));

        let index = self.scanning(|store| {
            let mut index = DirectoryIndex::new(recursive);
            for entry in store.read_dir(&dir, options) {
                let entry = entry?;
                if let Some(relative) = entry.path.strip_prefix(&dir) {
                    index.upsert(relative, entry.stat);
                }
            }
            Ok(index)
        })?;
        self.indexes.insert((dir, recursive), index.clone());
        Ok(index)
    }

    /// Persist the index of `uri` as `.index` (or `.index-full`), building it
    /// first if it is not cached.
    pub fn save_index(&mut self, uri: &str, recursive: bool) -> Result<DirectoryIndex> {
        let dir = dir_path(uri);
        let index = match self.indexes.get(&(dir.clone(), recursive)) {
            Some(index) => index.clone(),
            None => self.build_index(&dir, recursive)?,
        };
        self.set(&index_file(&dir, recursive), Value::String(index.encode()))?;
        Ok(index)
    }

    /// Load a persisted index of `uri`, preferring the recursive variant.
    ///
    /// Once loaded, listings of `uri` (and, for a recursive index, of the
    /// directories beneath it) are answered from the index until it is
    /// rebuilt or the caches are cleared.
    pub fn load_index(&mut self, uri: &str) -> Result<Option<DirectoryIndex>> {
        let dir = dir_path(uri);
        for recursive in [true, false] {
            let file = index_file(&dir, recursive);
            let text = match self.get(&file)? {
                Some(Value::String(text)) => text,
                Some(Value::Bytes(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
                _ => continue,
            };
            let index = DirectoryIndex::decode(&text).map_err(vdoc_core::Error::from)?;
            self.indexes.insert((dir.clone(), index.recursive), index.clone());
            return Ok(Some(index));
        }
        Ok(None)
    }

    /// A cached index of `uri`, if one was built or loaded.
    pub fn index(&self, uri: &str, recursive: bool) -> Option<&DirectoryIndex> {
        self.indexes.get(&(dir_path(uri), recursive))
    }

    pub(crate) fn index_upsert(&mut self, uri: &str, stat: DocumentStat) {
        if self.indexes.is_empty() || is_index_file(uri) {
            return;
        }
        let uri = canonical(uri);
        let is_dir = stat.is_dir();
        for ((dir, recursive), index) in self.indexes.iter_mut() {
            match index_slot(dir, *recursive, &uri, is_dir) {
                Some(Slot::Itself(key)) => index.upsert(&key, stat.clone()),
                Some(Slot::Ancestor(key)) if index.get(&key).is_none() => {
                    index.upsert(&key, DocumentStat::directory(None));
                }
                _ => {}
            }
        }
    }

    pub(crate) fn index_remove(&mut self, uri: &str) {
        if self.indexes.is_empty() {
            return;
        }
        let uri = canonical(uri);
        for ((dir, recursive), index) in self.indexes.iter_mut() {
            if let Some(relative) = uri.strip_prefix(dir.as_str()) {
                if *recursive || !relative.contains('/') {
                    index.remove(relative);
                }
            }
        }
    }

    /// Record `uri` and, for a directory, everything beneath it.
    pub(crate) fn index_insert_tree(&mut self, uri: &str) -> Result<()> {
        if self.indexes.is_empty() {
            return Ok(());
        }
        let stat = self.stat(uri)?;
        if !stat.exists {
            return Ok(());
        }
        let mut found = vec![(canonical(uri), stat.clone())];
        if stat.is_dir() {
            found.extend(self.scanning(|store| {
                let options = TraversalOptions::default().with_filter(|p| !is_index_file(p));
                store
                    .read_dir(uri, options)
                    .map(|entry| entry.map(|e| (e.path, e.stat)))
                    .collect::<Result<Vec<_>>>()
            })?);
        }
        for (path, stat) in found {
            self.index_upsert(&path, stat);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_slots() {
        assert_eq!(
            index_slot("/d/", false, "/d/a.json", false),
            Some(Slot::Itself("a.json".to_string()))
        );
        assert_eq!(
            index_slot("/d/", false, "/d/sub/a.json", false),
            Some(Slot::Ancestor("sub/".to_string()))
        );
        assert_eq!(
            index_slot("/d/", true, "/d/sub/a.json", false),
            Some(Slot::Itself("sub/a.json".to_string()))
        );
        assert_eq!(
            index_slot("/d/", true, "/d/sub", true),
            Some(Slot::Itself("sub/".to_string()))
        );
        assert_eq!(index_slot("/d/", true, "/other/a.json", false), None);
        assert_eq!(index_slot("/d/", true, "/d/", true), None);
    }

    #[test]
    fn children_of_an_index() {
        let mut index = DirectoryIndex::new(true);
        index.upsert("a.json", DocumentStat::file(1, None));
        index.upsert("sub/b.json", DocumentStat::file(1, None));
        index.upsert("sub/deep/c.json", DocumentStat::file(1, None));
        assert_eq!(children_in(&index, ""), vec!["a.json", "sub/"]);
        assert_eq!(children_in(&index, "sub/"), vec!["b.json", "deep/"]);
        assert!(children_in(&index, "sub/deep/c.json/").is_empty());
    }

    #[test]
    fn listings_come_from_cached_indexes() {
        use serde_json::json;
        use vdoc_drivers::MemoryDriver;

        let mut store = DocumentStore::new(
            MemoryDriver::from_json(json!({"/d/a.json": 1, "/d/sub/b.json": 2})).unwrap(),
        );
        assert_eq!(store.indexed_names("/d"), None);
        store.build_index("/d", true).unwrap();
        assert_eq!(
            store.indexed_names("/d"),
            Some(vec!["a.json".to_string(), "sub/".to_string()])
        );
        assert_eq!(store.indexed_names("/d/sub/"), Some(vec!["b.json".to_string()]));
        assert_eq!(store.indexed_names("/d/missing"), None);
        assert_eq!(store.indexed_names("/elsewhere"), None);
    }

    #[test]
    fn index_files_are_recognized() {
        assert!(is_index_file("/d/.index"));
        assert!(is_index_file("/d/.index-full"));
        assert!(!is_index_file("/d/index.json"));
        assert_eq!(index_file("/d/", true), "/d/.index-full");
    }
}
