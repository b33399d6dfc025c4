//! Store configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vdoc_core::path;
use vdoc_core::{DataConfig, Format, REFERENCE_KEY};

use crate::error::Result;
use crate::options::{FetchOptions, TraversalOptions};

/// Everything a [`DocumentStore`](crate::DocumentStore) can be tuned with.
///
/// Loadable from JSON; every field has a default:
///
/// ```rust
/// use vdoc_store::StoreConfig;
///
/// let config = StoreConfig::from_json(r#"{"globalsDir": "_shared", "cacheTtlMs": 500}"#).unwrap();
/// assert_eq!(config.globals_dir, "_shared");
/// assert_eq!(config.index_name, "index");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Extensions tried, in order, when fetching an extension-less address.
    pub data_extensions: Vec<String>,
    /// Extension to format mapping used to pick a codec.
    pub formats: BTreeMap<String, Format>,
    /// Stem of a directory's shared-settings document.
    pub index_name: String,
    /// Reserved directory holding global values.
    pub globals_dir: String,
    /// Key marking a reference inside a document.
    pub reference_key: String,
    /// Cached content and stats go stale after this many milliseconds.
    pub cache_ttl_ms: Option<u64>,
    pub data: DataConfig,
    /// Options used by `fetch_default`.
    pub fetch: FetchOptions,
    /// Options used by `read_dir_default` and `find_stream_default`.
    pub traversal: TraversalOptions,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let mut formats = BTreeMap::new();
        formats.insert(".json".to_string(), Format::JSON);
        formats.insert(".txt".to_string(), Format::TEXT);
        formats.insert(".md".to_string(), Format::from_static("text/markdown"));
        Self {
            data_extensions: vec![".json".to_string()],
            formats,
            index_name: "index".to_string(),
            globals_dir: "_".to_string(),
            reference_key: REFERENCE_KEY.to_string(),
            cache_ttl_ms: None,
            data: DataConfig::default(),
            fetch: FetchOptions::default(),
            traversal: TraversalOptions::default(),
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Cache expiry, `None` meaning entries never go stale by age.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_ms.map(Duration::from_millis)
    }

    /// Format for a document, by extension. Unknown extensions are opaque.
    pub fn format_for(&self, uri: &str) -> Format {
        self.formats
            .get(&path::extname(uri))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `uri` is a shared-settings document (`index.json` and friends).
    pub fn is_index_document(&self, uri: &str) -> bool {
        let ext = path::extname(uri);
        self.data_extensions.contains(&ext) && path::basename_without(uri, &ext) == self.index_name
    }

    /// Whether `uri` lies inside a reserved globals directory.
    pub fn in_globals_dir(&self, uri: &str) -> bool {
        let segments = path::segments(uri);
        segments
            .split_last()
            .is_some_and(|(_, dirs)| dirs.iter().any(|s| *s == self.globals_dir))
    }
}
