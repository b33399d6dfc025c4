//! Lazy depth-first directory walks.

use std::collections::VecDeque;

use tracing::trace;
use vdoc_core::{path, DocumentEntry, DocumentStat};

use crate::error::Result;
use crate::options::TraversalOptions;
use crate::store::{canonical, dir_path, DocumentStore};

/// Iterator over the entries beneath a directory.
///
/// At each level directories come before files, each group sorted by name;
/// then the first child directory is expanded. Nothing is listed until the
/// iterator is pulled, and dropping it part way leaves the store's caches
/// valid.
pub struct ReadDir<'a> {
    store: &'a mut DocumentStore,
    options: TraversalOptions,
    root: Option<String>,
    ready: VecDeque<DocumentEntry>,
    /// Directories still to expand, with their depth; the top is next.
    pending: Vec<(String, usize)>,
}

impl DocumentStore {
    /// Walk `uri`. A file yields itself; a directory yields its descendants
    /// down to `options.depth`; a missing address yields nothing.
    pub fn read_dir(&mut self, uri: &str, options: TraversalOptions) -> ReadDir<'_> {
        ReadDir {
            store: self,
            options,
            root: Some(canonical(uri)),
            ready: VecDeque::new(),
            pending: Vec::new(),
        }
    }

    /// [`read_dir`](Self::read_dir) with the store's configured options.
    pub fn read_dir_default(&mut self, uri: &str) -> ReadDir<'_> {
        let options = self.config.traversal.clone();
        self.read_dir(uri, options)
    }
}

impl ReadDir<'_> {
    fn start(&mut self, root: String) -> Result<()> {
        let stat = self.store.stat(&root)?;
        if stat.is_dir() {
            self.pending.push((dir_path(&root), 0));
        } else if stat.exists {
            self.ready.push_back(DocumentEntry::new(root, stat, 0));
        }
        Ok(())
    }

    fn expand(&mut self, dir: &str, depth: usize) -> Result<()> {
        trace!("Expanding {} at depth {}", dir, depth);
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for name in self.store.list_dir(dir)? {
            let child = format!("{}{}", dir, name);
            if !self.options.accepts(&child) {
                continue;
            }
            let stat = if self.options.skip_stat {
                if path::is_dir(&name) {
                    DocumentStat::directory(None)
                } else {
                    DocumentStat::file(0, None)
                }
            } else {
                self.store.stat(&child)?
            };
            if !stat.exists || (stat.is_symlink() && self.options.skip_symbolic_link) {
                continue;
            }

            let entry = DocumentEntry::new(child, stat, depth + 1);
            if entry.is_dir() {
                dirs.push(entry);
            } else {
                files.push(entry);
            }
        }
        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));

        if self.options.descends_below(depth + 1) {
            for entry in dirs.iter().rev() {
                self.pending.push((entry.path.clone(), depth + 1));
            }
        }
        self.ready.extend(dirs);
        self.ready.extend(files);
        Ok(())
    }
}

impl Iterator for ReadDir<'_> {
    type Item = Result<DocumentEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            if let Err(e) = self.start(root) {
                return Some(Err(e));
            }
        }
        loop {
            if let Some(entry) = self.ready.pop_front() {
                return Some(Ok(entry));
            }
            let (dir, depth) = self.pending.pop()?;
            if let Err(e) = self.expand(&dir, depth) {
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vdoc_drivers::MemoryDriver;

    fn store() -> DocumentStore {
        DocumentStore::new(
            MemoryDriver::from_json(json!({
                "/root/b.json": 1,
                "/root/a.json": 1,
                "/root/sub/c.json": 1,
                "/root/sub/deep/d.json": 1,
                "/root/other/e.json": 1,
            }))
            .unwrap(),
        )
    }

    fn paths(store: &mut DocumentStore, uri: &str, options: TraversalOptions) -> Vec<String> {
        store
            .read_dir(uri, options)
            .map(|entry| entry.unwrap().path)
            .collect()
    }

    #[test]
    fn directories_first_then_depth_first() {
        let mut store = store();
        assert_eq!(
            paths(&mut store, "/root", TraversalOptions::default()),
            vec![
                "/root/other/",
                "/root/sub/",
                "/root/a.json",
                "/root/b.json",
                "/root/other/e.json",
                "/root/sub/deep/",
                "/root/sub/c.json",
                "/root/sub/deep/d.json",
            ]
        );
    }

    #[test]
    fn depth_limits_recursion() {
        let mut store = store();
        let shallow = paths(&mut store, "/root", TraversalOptions::default().with_depth(1));
        assert_eq!(
            shallow,
            vec!["/root/other/", "/root/sub/", "/root/a.json", "/root/b.json"]
        );
        let two = paths(&mut store, "/root", TraversalOptions::default().with_depth(2));
        assert_eq!(two.len(), 7);
        assert!(!two.contains(&"/root/sub/deep/d.json".to_string()));
    }

    #[test]
    fn configured_options_apply_by_default() {
        let config = crate::StoreConfig::from_json(r#"{"traversal": {"depth": 1}}"#).unwrap();
        let mut store = DocumentStore::with_config(
            MemoryDriver::from_json(json!({"/root/a.json": 1, "/root/sub/c.json": 1})).unwrap(),
            config,
        );
        let paths: Vec<String> = store
            .read_dir_default("/root")
            .map(|entry| entry.unwrap().path)
            .collect();
        assert_eq!(paths, vec!["/root/sub/", "/root/a.json"]);
    }

    #[test]
    fn filter_prunes_subtrees() {
        let mut store = store();
        let options = TraversalOptions::default().with_filter(|p| !p.starts_with("/root/sub"));
        assert_eq!(
            paths(&mut store, "/root", options),
            vec!["/root/other/", "/root/a.json", "/root/b.json", "/root/other/e.json"]
        );
    }

    #[test]
    fn file_and_missing_roots() {
        let mut store = store();
        let entries: Vec<DocumentEntry> = store
            .read_dir("/root/a.json", TraversalOptions::default())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].depth, 0);
        assert_eq!(entries[0].name, "a.json");
        assert_eq!(
            paths(&mut store, "/nowhere", TraversalOptions::default()),
            Vec::<String>::new()
        );
    }

    #[test]
    fn entries_carry_depth_and_parent() {
        let mut store = store();
        let deep = store
            .read_dir("/root", TraversalOptions::default())
            .map(Result::unwrap)
            .find(|e| e.name == "d.json")
            .unwrap();
        assert_eq!(deep.depth, 3);
        assert_eq!(deep.parent, "/root/sub/deep/");
        assert!(deep.is_file());
    }

    #[test]
    fn skip_stat_uses_listing_suffixes() {
        let mut store = store();
        let options = TraversalOptions {
            skip_stat: true,
            ..TraversalOptions::default()
        };
        let entries: Vec<DocumentEntry> = store
            .read_dir("/root", options)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 8);
        assert!(entries.iter().all(|e| e.stat.mtime.is_none()));
    }

    #[test]
    fn denied_listing_surfaces_error() {
        let mut driver = MemoryDriver::from_json(json!({"/d/a.json": 1})).unwrap();
        driver.deny("/d");
        let mut store = DocumentStore::new(driver);
        let first = store.read_dir("/d", TraversalOptions::default()).next();
        assert!(matches!(first, Some(Err(e)) if e.is_access_denied()));
    }
}
