//! Materialized reads: address resolution, directory inheritance and globals.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use vdoc_core::flat::merge;
use vdoc_core::{path, Value};

use crate::cache::Lookup;
use crate::error::Result;
use crate::options::FetchOptions;
use crate::store::{canonical, dir_path, DocumentStore};

/// Documents currently being assembled up one fetch call tree.
///
/// `cuts` counts the cycles left unresolved so far. A value computed while
/// it grew depends on the call tree and must not be memoized.
#[derive(Debug, Default)]
pub(crate) struct Visited {
    active: HashSet<String>,
    cuts: usize,
}

impl Visited {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn enter(&mut self, uri: &str) -> bool {
        self.active.insert(uri.to_string())
    }

    fn leave(&mut self, uri: &str) {
        self.active.remove(uri);
    }

    pub(crate) fn contains(&self, uri: &str) -> bool {
        self.active.contains(uri)
    }

    /// Record a cycle left unresolved.
    pub(crate) fn cut(&mut self) {
        self.cuts += 1;
    }

    pub(crate) fn cuts(&self) -> usize {
        self.cuts
    }
}

impl DocumentStore {
    /// Fetch a fully assembled document.
    ///
    /// An extension-less `uri` is tried, in order, as a directory index
    /// (`uri/index.json`, when `allow_dirs`), as `uri` plus each data
    /// extension, then literally. The found document is merged over its
    /// ancestors' shared settings and the globals above it, then its
    /// references are resolved. When nothing loads, `default_value` is
    /// returned.
    pub fn fetch(&mut self, uri: &str, opts: &FetchOptions) -> Result<Option<Value>> {
        let resolved = self.resolve_document(uri, opts)?;
        let value = self.fetch_merged(&resolved, opts, &mut Visited::new())?;
        Ok(value.or_else(|| opts.default_value.clone()))
    }

    /// [`fetch`](Self::fetch) with the store's configured options.
    pub fn fetch_default(&mut self, uri: &str) -> Result<Option<Value>> {
        let opts = self.config.fetch.clone();
        self.fetch(uri, &opts)
    }

    /// Fetch and deserialize into `T`.
    pub fn fetch_as<T: DeserializeOwned>(
        &mut self,
        uri: &str,
        opts: &FetchOptions,
    ) -> Result<Option<T>> {
        match self.fetch(uri, opts)? {
            Some(value) => Ok(Some(vdoc_serde::from_value(&value)?)),
            None => Ok(None),
        }
    }

    /// Pick the address `fetch` will load for `uri`.
    pub(crate) fn resolve_document(
        &mut self,
        uri: &str,
        opts: &FetchOptions,
    ) -> Result<String> {
        let literal = canonical(uri);
        if !path::extname(&literal).is_empty() {
            return Ok(literal);
        }

        let extensions = self.config.data_extensions.clone();
        let mut candidates = Vec::new();
        if opts.allow_dirs {
            let dir = dir_path(&literal);
            for ext in &extensions {
                candidates.push(format!("{}{}{}", dir, self.config.index_name, ext));
            }
        }
        if !path::is_dir(uri) && literal != "/" {
            for ext in &extensions {
                candidates.push(format!("{}{}", literal, ext));
            }
        }

        for candidate in candidates {
            if self.is_document(&candidate)? {
                trace!("Resolved {} to {}", uri, candidate);
                return Ok(candidate);
            }
        }
        Ok(literal)
    }

    /// Load `uri` and apply inheritance, globals and references.
    ///
    /// `visited` holds the documents currently being assembled up the call
    /// tree; meeting one again yields `None` instead of recursing.
    pub(crate) fn fetch_merged(
        &mut self,
        uri: &str,
        opts: &FetchOptions,
        visited: &mut Visited,
    ) -> Result<Option<Value>> {
        if !visited.enter(uri) {
            visited.cut();
            warn!(uri = %uri, "cyclic reference left unresolved");
            return Ok(None);
        }
        let result = self.assemble(uri, opts, visited);
        visited.leave(uri);
        result
    }

    fn assemble(
        &mut self,
        uri: &str,
        opts: &FetchOptions,
        visited: &mut Visited,
    ) -> Result<Option<Value>> {
        let mut value = match self.get(uri)? {
            Some(value) => value,
            None => return Ok(None),
        };

        if opts.inherit && value.is_container() {
            if let Some(settings) = self.inherited_settings(uri, opts, visited)? {
                value = merge(&settings, &value);
            }
        }

        if opts.globals && value.is_container() && !self.config.in_globals_dir(uri) {
            if let Some(globals) = self.globals_for(uri, opts, visited)? {
                value = merge(&globals, &value);
            }
        }

        if opts.refs {
            value = self.resolve_references(value, uri, opts, visited)?;
        }
        Ok(Some(value))
    }

    /// The shared-settings document governing `uri`: the nearest index
    /// document in its directory or above. An index document starts looking
    /// one level up.
    fn settings_document(&mut self, uri: &str) -> Result<Option<String>> {
        let mut dir = dir_path(&path::dirname(uri));
        if self.config.is_index_document(uri) {
            let parent = dir_path(&path::dirname(&dir));
            if parent == dir {
                return Ok(None);
            }
            dir = parent;
        }

        let extensions = self.config.data_extensions.clone();
        loop {
            for ext in &extensions {
                let candidate = format!("{}{}{}", dir, self.config.index_name, ext);
                if self.is_document(&candidate)? {
                    return Ok(Some(candidate));
                }
            }
            let parent = dir_path(&path::dirname(&dir));
            if parent == dir {
                return Ok(None);
            }
            dir = parent;
        }
    }

    /// Settings inherited by `uri`, already merged up to the root.
    fn inherited_settings(
        &mut self,
        uri: &str,
        opts: &FetchOptions,
        visited: &mut Visited,
    ) -> Result<Option<Value>> {
        let settings = match self.settings_document(uri)? {
            Some(settings) => settings,
            None => return Ok(None),
        };
        if visited.contains(&settings) {
            visited.cut();
            return Ok(None);
        }

        let key = memo_key("settings", &settings, opts);
        if let Lookup::Hit(memoized) = self.memo.lookup(&key) {
            return Ok(memoized);
        }
        debug!("Inheriting {} into {}", settings, uri);
        let cuts = visited.cuts();
        let merged = self
            .fetch_merged(&settings, opts, visited)?
            .filter(Value::is_container);
        if visited.cuts() == cuts {
            self.memo.insert(key, merged.clone());
        }
        Ok(merged)
    }

    /// Values from the globals directories above `uri`, nearest winning.
    ///
    /// Each ancestor `D` contributes `D/_/index.json` merged at the top level
    /// and every other data document `D/_/name.json` under the key `name`.
    pub fn get_globals(&mut self, uri: &str) -> Result<Option<Value>> {
        let opts = self.config.fetch.clone();
        self.globals_for(&canonical(uri), &opts, &mut Visited::new())
    }

    fn globals_for(
        &mut self,
        uri: &str,
        opts: &FetchOptions,
        visited: &mut Visited,
    ) -> Result<Option<Value>> {
        let mut chain = Vec::new();
        let mut dir = dir_path(&path::dirname(uri));
        loop {
            chain.push(dir.clone());
            let parent = dir_path(&path::dirname(&dir));
            if parent == dir {
                break;
            }
            dir = parent;
        }

        let mut globals: Option<Value> = None;
        for dir in chain.into_iter().rev() {
            if let Some(found) = self.globals_in(&dir, opts, visited)? {
                globals = Some(match globals {
                    Some(farther) => merge(&farther, &found),
                    None => found,
                });
            }
        }
        Ok(globals)
    }

    /// Globals declared directly in `dir`'s globals directory.
    fn globals_in(
        &mut self,
        dir: &str,
        opts: &FetchOptions,
        visited: &mut Visited,
    ) -> Result<Option<Value>> {
        let globals_dir = format!("{}{}", dir, self.config.globals_dir);
        let key = memo_key("globals", &globals_dir, opts);
        if let Lookup::Hit(memoized) = self.memo.lookup(&key) {
            return Ok(memoized);
        }
        if !self.stat(&globals_dir)?.is_dir() {
            self.memo.insert(key, None);
            return Ok(None);
        }

        let inner = FetchOptions {
            globals: false,
            inherit: false,
            ..opts.clone()
        };
        let cuts = visited.cuts();
        let mut index = Value::map();
        let mut named = Value::map();
        for name in self.list_dir(&globals_dir)? {
            let ext = path::extname(&name);
            if path::is_dir(&name) || !self.config.data_extensions.contains(&ext) {
                continue;
            }
            let document = format!("{}/{}", globals_dir, name);
            let value = match self.fetch_merged(&document, &inner, visited)? {
                Some(value) => value,
                None => continue,
            };
            let stem = path::basename_without(&name, &ext);
            if stem == self.config.index_name {
                index = merge(&index, &value);
            } else {
                named.insert(stem, value);
            }
        }

        let found = merge(&named, &index);
        let found = (!found.is_empty_container()).then_some(found);
        if visited.cuts() == cuts {
            self.memo.insert(key, found.clone());
        }
        Ok(found)
    }
}

fn memo_key(kind: &str, uri: &str, opts: &FetchOptions) -> String {
    format!("{}:{}:{}:{}", kind, opts.globals, opts.refs, uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use vdoc_drivers::MemoryDriver;

    fn store(docs: serde_json::Value) -> DocumentStore {
        DocumentStore::new(MemoryDriver::from_json(docs).unwrap())
    }

    fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
        vdoc_core::flat::find(key, value).and_then(Value::as_str)
    }

    #[test]
    fn resolves_extensionless_addresses() {
        let mut store = store(json!({
            "/site/index.json": {"kind": "dir"},
            "/page.json": {"kind": "page"},
        }));
        let opts = FetchOptions::raw();

        let dir = store.fetch("/site", &opts).unwrap().unwrap();
        assert_eq!(str_at(&dir, "kind"), Some("dir"));
        let page = store.fetch("/page", &opts).unwrap().unwrap();
        assert_eq!(str_at(&page, "kind"), Some("page"));

        let no_dirs = FetchOptions {
            allow_dirs: false,
            ..FetchOptions::raw()
        };
        assert_eq!(store.fetch("/site", &no_dirs).unwrap(), None);
        assert_eq!(store.fetch("/page/", &opts).unwrap(), None);
    }

    #[test]
    fn falls_back_to_default_value() {
        let mut store = store(json!({}));
        let opts = FetchOptions::default().with_default("fallback");
        assert_eq!(
            store.fetch("/missing.json", &opts).unwrap(),
            Some(Value::from("fallback"))
        );
        assert_eq!(store.fetch_default("/missing").unwrap(), None);
    }

    #[test]
    fn inherits_settings_up_to_the_root() {
        let mut store = store(json!({
            "/index.json": {"theme": "light", "lang": "en"},
            "/blog/index.json": {"theme": "dark"},
            "/blog/post.json": {"title": "hi"},
        }));
        let post = store.fetch_default("/blog/post.json").unwrap().unwrap();
        assert_eq!(str_at(&post, "title"), Some("hi"));
        assert_eq!(str_at(&post, "theme"), Some("dark"));
        assert_eq!(str_at(&post, "lang"), Some("en"));

        let blog = store.fetch_default("/blog").unwrap().unwrap();
        assert_eq!(str_at(&blog, "theme"), Some("dark"));
        assert_eq!(str_at(&blog, "lang"), Some("en"));
    }

    #[test]
    fn inheritance_skips_directories_without_settings() {
        let mut store = store(json!({
            "/index.json": {"lang": "en"},
            "/a/b/c/doc.json": {"title": "deep"},
            "/a/b/index.json": {"section": "b"},
        }));
        let doc = store.fetch_default("/a/b/c/doc").unwrap().unwrap();
        assert_eq!(str_at(&doc, "section"), Some("b"));
        assert_eq!(str_at(&doc, "lang"), Some("en"));
    }

    #[test]
    fn scalar_documents_do_not_inherit() {
        let mut store = store(json!({
            "/index.json": {"theme": "light"},
            "/name.json": "plain",
        }));
        assert_eq!(
            store.fetch_default("/name.json").unwrap(),
            Some(Value::from("plain"))
        );
    }

    #[test]
    fn globals_nearest_wins_and_document_wins_over_globals() {
        let mut store = store(json!({
            "/_/index.json": {"site": "root", "owner": "ops"},
            "/_/links.json": {"home": "/"},
            "/docs/_/index.json": {"site": "docs"},
            "/docs/page.json": {"owner": "me"},
        }));
        let page = store.fetch_default("/docs/page.json").unwrap().unwrap();
        assert_eq!(str_at(&page, "site"), Some("docs"));
        assert_eq!(str_at(&page, "owner"), Some("me"));
        assert_eq!(str_at(&page, "links/home"), Some("/"));

        let globals = store.get_globals("/docs/page.json").unwrap().unwrap();
        assert_eq!(str_at(&globals, "owner"), Some("ops"));
        assert!(store.get_globals("/elsewhere/x.json").unwrap().is_some());
    }

    #[test]
    fn options_switch_layers_off() {
        let mut store = store(json!({
            "/_/index.json": {"g": 1},
            "/index.json": {"i": 1},
            "/doc.json": {"d": 1},
        }));
        let opts = FetchOptions {
            globals: false,
            ..FetchOptions::default()
        };
        let doc = store.fetch("/doc.json", &opts).unwrap().unwrap();
        assert!(doc.get("g").is_none());
        assert!(doc.get("i").is_some());

        let raw = store.fetch("/doc.json", &FetchOptions::raw()).unwrap().unwrap();
        assert_eq!(raw.as_map().map(|m| m.len()), Some(1));
    }

    #[test]
    fn writes_refresh_inherited_settings() {
        let mut store = store(json!({
            "/index.json": {"theme": "light"},
            "/doc.json": {"d": 1},
        }));
        let before = store.fetch_default("/doc.json").unwrap().unwrap();
        assert_eq!(str_at(&before, "theme"), Some("light"));

        let settings: Value = [("theme", "dark")].into_iter().collect();
        store.set("/index.json", settings).unwrap();
        let after = store.fetch_default("/doc.json").unwrap().unwrap();
        assert_eq!(str_at(&after, "theme"), Some("dark"));
    }

    #[test]
    fn fetch_order_does_not_change_results() {
        let docs = json!({
            "/index.json": {"owner": {"$ref": "/people/a.json"}},
            "/people/a.json": {"name": "A"},
            "/x.json": {"k": 1},
        });
        let expected = json!({"k": 1, "owner": {"name": "A"}});

        let mut fresh = store(docs.clone());
        let x = fresh.fetch_default("/x.json").unwrap().unwrap();
        assert_eq!(vdoc_serde::value_to_json(&x), expected);

        // Assembling a.json cuts the cycle through /index.json; that partial
        // result must not be reused for x.json.
        let mut warmed = store(docs);
        let a = warmed.fetch_default("/people/a.json").unwrap().unwrap();
        assert_eq!(
            vdoc_serde::value_to_json(&a),
            json!({"name": "A", "owner": {"$ref": "/people/a.json"}})
        );
        let x = warmed.fetch_default("/x.json").unwrap().unwrap();
        assert_eq!(vdoc_serde::value_to_json(&x), expected);

        // And the other way round.
        let a_again = fresh.fetch_default("/people/a.json").unwrap().unwrap();
        assert_eq!(vdoc_serde::value_to_json(&a_again), vdoc_serde::value_to_json(&a));
    }

    #[test]
    fn cycle_free_settings_are_memoized() {
        let mut store = store(json!({
            "/index.json": {"theme": "light"},
            "/doc.json": {"d": 1},
        }));
        store.fetch_default("/doc.json").unwrap();
        let key = memo_key("settings", "/index.json", &store.config.fetch);
        assert!(store.memo.contains(&key));
    }

    #[test]
    fn typed_fetch() {
        #[derive(Deserialize)]
        struct Page {
            title: String,
            theme: String,
        }

        let mut store = store(json!({
            "/index.json": {"theme": "light"},
            "/page.json": {"title": "Hello"},
        }));
        let page: Page = store
            .fetch_as("/page", &FetchOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(page.title, "Hello");
        assert_eq!(page.theme, "light");
    }
}
