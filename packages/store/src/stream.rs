//! Streaming file search with a progress estimate.
//!
//! Progress is the share of directories seen so far that are *fulfilled*. A
//! directory is fulfilled once one of its files is followed by a file from a
//! different directory, or once every directory recorded beneath it, at any
//! depth, is fulfilled. When the walk ends everything is fulfilled. The estimate never
//! decreases.

use std::collections::BTreeMap;
use std::ops::Bound;

use vdoc_core::{path, DocumentEntry};

use crate::error::{Result, StoreError};
use crate::options::{SortKey, SortOrder, TraversalOptions};
use crate::store::DocumentStore;
use crate::traversal::ReadDir;

/// One file yielded by [`FindStream`].
#[derive(Debug, Clone, PartialEq)]
pub struct FindEvent {
    pub entry: DocumentEntry,
    /// Position of `entry` in the sorted list of files found so far.
    pub index: usize,
    /// Fraction of known directories fulfilled, in `0.0..=1.0`.
    pub progress: f64,
}

/// Files beneath a directory, sorted as they arrive.
pub struct FindStream<'a> {
    walk: ReadDir<'a>,
    sort: SortKey,
    order: SortOrder,
    limit: Option<usize>,
    files: Vec<DocumentEntry>,
    /// Directories seen so far and whether each is fulfilled.
    dirs: BTreeMap<String, bool>,
    fulfilled: usize,
    last_parent: Option<String>,
    lookahead: Option<DocumentEntry>,
    deferred: Option<StoreError>,
    yielded: usize,
    progress: f64,
}

impl DocumentStore {
    /// Stream the files beneath `uri` with progress.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use vdoc_drivers::MemoryDriver;
    /// use vdoc_store::{DocumentStore, TraversalOptions};
    ///
    /// let driver = MemoryDriver::from_json(json!({"/d/a.json": 1, "/d/b.json": 2})).unwrap();
    /// let mut store = DocumentStore::new(driver);
    ///
    /// let events: Vec<_> = store
    ///     .find_stream("/d", TraversalOptions::default())
    ///     .collect::<Result<_, _>>()
    ///     .unwrap();
    /// assert_eq!(events.len(), 2);
    /// assert_eq!(events[1].progress, 1.0);
    /// ```
    pub fn find_stream(&mut self, uri: &str, options: TraversalOptions) -> FindStream<'_> {
        let sort = options.sort;
        let order = options.order;
        let limit = options.limit;
        FindStream {
            walk: self.read_dir(uri, options),
            sort,
            order,
            limit,
            files: Vec::new(),
            dirs: BTreeMap::new(),
            fulfilled: 0,
            last_parent: None,
            lookahead: None,
            deferred: None,
            yielded: 0,
            progress: 0.0,
        }
    }

    /// [`find_stream`](Self::find_stream) with the store's configured options.
    pub fn find_stream_default(&mut self, uri: &str) -> FindStream<'_> {
        let options = self.config.traversal.clone();
        self.find_stream(uri, options)
    }
}

impl FindStream<'_> {
    /// Files found so far, in sort order.
    pub fn files(&self) -> &[DocumentEntry] {
        &self.files
    }

    /// Progress reported with the latest event.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    fn ensure_dir(&mut self, dir: &str) {
        if !self.dirs.contains_key(dir) {
            self.dirs.insert(dir.to_string(), false);
        }
    }

    fn record_dir(&mut self, entry: &DocumentEntry) {
        self.ensure_dir(&entry.parent);
        self.ensure_dir(&entry.path);
    }

    fn mark(&mut self, dir: &str) {
        if let Some(fulfilled) = self.dirs.get_mut(dir) {
            if !*fulfilled {
                *fulfilled = true;
                self.fulfilled += 1;
            }
        }
    }

    /// Whether `dir` has recorded descendants and all of them are fulfilled.
    fn subtree_fulfilled(&self, dir: &str) -> bool {
        if !self.dirs.contains_key(dir) {
            return false;
        }
        let mut descendants = self
            .dirs
            .range::<str, _>((Bound::Excluded(dir), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(dir))
            .peekable();
        descendants.peek().is_some() && descendants.all(|(_, fulfilled)| *fulfilled)
    }

    /// Mark `dir` fulfilled, then every ancestor whose whole subtree is.
    fn fulfill(&mut self, dir: &str) {
        self.mark(dir);
        let mut current = dir.to_string();
        loop {
            let parent = path::dirname(&current);
            if parent == current || !self.subtree_fulfilled(&parent) {
                return;
            }
            self.mark(&parent);
            current = parent;
        }
    }

    fn fulfill_all(&mut self) {
        for fulfilled in self.dirs.values_mut() {
            *fulfilled = true;
        }
        self.fulfilled = self.dirs.len();
    }

    /// Pull the next file from the walk, recording directories on the way.
    fn pull(&mut self) -> Option<Result<DocumentEntry>> {
        loop {
            let entry = match self.walk.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.fulfill_all();
                    return None;
                }
            };
            if entry.is_dir() {
                self.record_dir(&entry);
                continue;
            }

            self.ensure_dir(&entry.parent);
            if let Some(previous) = self.last_parent.take() {
                if previous != entry.parent {
                    self.fulfill(&previous);
                }
            }
            self.last_parent = Some(entry.parent.clone());
            return Some(Ok(entry));
        }
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }
}

impl Iterator for FindStream<'_> {
    type Item = Result<FindEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit_reached() {
            return None;
        }
        if let Some(e) = self.deferred.take() {
            return Some(Err(e));
        }

        let mut entry = match self.lookahead.take() {
            Some(entry) => entry,
            None => match self.pull()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            },
        };

        self.yielded += 1;
        // One file of lookahead tells whether this file closed its directory,
        // also for the last file a limit allows.
        match self.pull() {
            Some(Ok(next)) => self.lookahead = Some(next),
            Some(Err(e)) => self.deferred = Some(e),
            None => {}
        }

        entry.fulfilled = self.dirs.get(&entry.parent).copied().unwrap_or(false);
        if !self.dirs.is_empty() {
            let ratio = self.fulfilled as f64 / self.dirs.len() as f64;
            self.progress = self.progress.max(ratio);
        }

        let index = self
            .files
            .partition_point(|f| self.sort.compare(f, &entry, self.order).is_lt());
        self.files.insert(index, entry.clone());

        Some(Ok(FindEvent {
            entry,
            index,
            progress: self.progress,
        }))
    }
}
