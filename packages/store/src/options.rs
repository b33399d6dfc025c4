//! Per-call options for fetching and traversal.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vdoc_core::{DocumentEntry, Value};

/// How `fetch` assembles a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    /// Merge values from reserved globals directories up the ancestor chain.
    pub globals: bool,
    /// Merge the shared-settings document of each ancestor directory.
    pub inherit: bool,
    /// Resolve `$ref` markers.
    pub refs: bool,
    /// Returned when nothing can be loaded.
    #[serde(with = "json_value", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Let an extension-less address resolve to a directory's index document.
    pub allow_dirs: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            globals: true,
            inherit: true,
            refs: true,
            default_value: None,
            allow_dirs: true,
        }
    }
}

impl FetchOptions {
    /// Load the document alone: no inheritance, globals or references.
    pub fn raw() -> Self {
        Self {
            globals: false,
            inherit: false,
            refs: false,
            ..Self::default()
        }
    }

    /// Value returned when nothing loads.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

mod json_value {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use vdoc_core::Value;
    use vdoc_serde::{json_to_value, value_to_json};

    pub fn serialize<S: Serializer>(value: &Option<Value>, serializer: S) -> Result<S::Ok, S::Error> {
        value.as_ref().map(value_to_json).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
        Ok(Option::<serde_json::Value>::deserialize(deserializer)?.map(json_to_value))
    }
}

/// Sort key for streamed file lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Mtime,
    Size,
}

/// Direction of a [`SortKey`] comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortKey {
    /// Compare two entries by this key, falling back to path for ties.
    pub fn compare(&self, a: &DocumentEntry, b: &DocumentEntry, order: SortOrder) -> Ordering {
        let primary = match self {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Mtime => a.stat.mtime.cmp(&b.stat.mtime),
            SortKey::Size => a.stat.size.cmp(&b.stat.size),
        };
        let ordering = primary.then_with(|| a.path.cmp(&b.path));
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Predicate over full paths, evaluated before any work on a path.
#[derive(Clone)]
pub struct PathFilter(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl PathFilter {
    /// Wrap a predicate over absolute paths.
    pub fn new(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        PathFilter(Arc::new(f))
    }

    /// Whether `path` passes.
    pub fn matches(&self, path: &str) -> bool {
        (self.0)(path)
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PathFilter(..)")
    }
}

/// How `read_dir` and `find_stream` walk a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraversalOptions {
    /// Deepest entry depth to yield, unlimited when negative.
    pub depth: i32,
    /// Derive kinds from listing names instead of stat calls.
    pub skip_stat: bool,
    pub skip_symbolic_link: bool,
    #[serde(skip)]
    pub filter: Option<PathFilter>,
    pub sort: SortKey,
    pub order: SortOrder,
    /// Stop a stream after this many files.
    pub limit: Option<usize>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            depth: -1,
            skip_stat: false,
            skip_symbolic_link: false,
            filter: None,
            sort: SortKey::Name,
            order: SortOrder::Asc,
            limit: None,
        }
    }
}

impl TraversalOptions {
    /// Limit how deep the walk goes.
    #[must_use]
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Keep only paths `f` accepts; rejected directories are not entered.
    #[must_use]
    pub fn with_filter(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(PathFilter::new(f));
        self
    }

    /// Order the files a find stream collects.
    #[must_use]
    pub fn with_sort(mut self, sort: SortKey, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    /// Stop after `limit` files.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether entries at `depth` may be expanded further.
    pub(crate) fn descends_below(&self, depth: usize) -> bool {
        self.depth < 0 || depth < self.depth as usize
    }

    pub(crate) fn accepts(&self, path: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(path))
    }
}
