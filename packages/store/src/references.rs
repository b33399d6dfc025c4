//! `$ref` resolution.
//!
//! Markers are resolved deepest scope first against the flattened document.
//! A key marker replaces its enclosing object, merged under the marker's
//! siblings; an inline `"$ref:..."` value replaces just that value; a marker at
//! the top level extends the rest of the document. Targets that cannot be
//! loaded, and targets already being assembled up the call tree, leave the
//! marker in place.

use std::cmp::Reverse;

use tracing::{trace, warn};
use vdoc_core::flat::merge;
use vdoc_core::reference::find_markers;
use vdoc_core::{path, DataConfig, Flat, FlatEntry, MarkerSite, Value};

use crate::error::Result;
use crate::fetch::Visited;
use crate::options::FetchOptions;
use crate::store::DocumentStore;

/// Flatten `value` beneath `prefix`, keeping empty maps as leaves.
fn flatten_at(data: &DataConfig, prefix: &str, value: &Value) -> Flat {
    let flat = data.flatten(value);
    if flat.is_empty() {
        vec![(prefix.to_string(), Value::map())]
    } else {
        data.prefix_flat(prefix, flat)
    }
}

/// Key of `key` relative to `scope`.
fn rebase(data: &DataConfig, scope: &str, key: &str) -> String {
    key.strip_prefix(scope)
        .and_then(|rest| rest.strip_prefix(data.object_divider.as_str()))
        .unwrap_or(key)
        .to_string()
}

impl DocumentStore {
    /// Resolve every reference marker in `value`, a document loaded from
    /// `base`.
    pub(crate) fn resolve_references(
        &mut self,
        value: Value,
        base: &str,
        opts: &FetchOptions,
        visited: &mut Visited,
    ) -> Result<Value> {
        let data = self.config.data.clone();
        let ref_key = self.config.reference_key.clone();

        let mut flat = data.flatten(&value);
        let mut sites = find_markers(&data, &flat, &ref_key);
        if sites.is_empty() {
            return Ok(value);
        }
        sites.sort_by_key(|site| Reverse(data.split_key(&site.scope).len()));

        for site in sites {
            let still_marked = flat
                .iter()
                .any(|(key, v)| *key == site.key && v.as_str().is_some());
            if !still_marked {
                continue;
            }
            let resolved = match self.resolve_target(&site, base, &value, opts, visited)? {
                Some(resolved) => resolved,
                None => continue,
            };
            flat = match splice(&data, &flat, &site, resolved)? {
                Some(spliced) => spliced,
                None => {
                    warn!(base = %base, key = %site.key, "reference cannot extend a scalar");
                    continue;
                }
            };
        }
        Ok(data.unflatten(&flat)?)
    }

    /// Load what a marker points at, narrowed by its fragment.
    fn resolve_target(
        &mut self,
        site: &MarkerSite,
        base: &str,
        original: &Value,
        opts: &FetchOptions,
        visited: &mut Visited,
    ) -> Result<Option<Value>> {
        let target = &site.target;
        let loaded = if target.path.is_empty() {
            if target.fragment.is_none() {
                warn!(base = %base, "self reference left unresolved");
                return Ok(None);
            }
            Some(original.clone())
        } else {
            let absolute = path::absolute(&path::dirname(base), ".", &[&target.path]);
            let document = self.resolve_document(&absolute, opts)?;
            if visited.contains(&document) {
                visited.cut();
                warn!(base = %base, target = %document, "cyclic reference left unresolved");
                return Ok(None);
            }
            trace!("Resolving {} from {}", document, base);
            self.fetch_merged(&document, opts, visited)?
        };

        let loaded = match loaded {
            Some(loaded) => loaded,
            None => {
                warn!(base = %base, target = %target.path, "unresolvable reference left in place");
                return Ok(None);
            }
        };
        match &target.fragment {
            None => Ok(Some(loaded)),
            Some(fragment) => {
                let found = self.config.data.find(fragment, &loaded).cloned();
                if found.is_none() {
                    warn!(base = %base, fragment = %fragment, "reference fragment not found");
                }
                Ok(found)
            }
        }
    }
}

/// Substitute a resolved marker into `flat`. `None` when a top-level marker
/// resolves to a scalar but the document has other content.
fn splice(
    data: &DataConfig,
    flat: &[FlatEntry],
    site: &MarkerSite,
    resolved: Value,
) -> Result<Option<Flat>> {
    if site.is_top_level() {
        let rest: Flat = flat
            .iter()
            .filter(|(key, _)| *key != site.key)
            .cloned()
            .collect();
        if rest.is_empty() {
            return Ok(Some(data.flatten(&resolved)));
        }
        if !resolved.is_container() {
            return Ok(None);
        }
        let extended = merge(&resolved, &data.unflatten(&rest)?);
        return Ok(Some(data.flatten(&extended)));
    }

    let replacement = if site.inline || site.target.fragment.is_some() {
        resolved
    } else {
        let siblings: Flat = data
            .flat_siblings(flat, &site.key, Some(site.scope.as_str()))
            .into_iter()
            .map(|(key, value)| (rebase(data, &site.scope, &key), value))
            .collect();
        if siblings.is_empty() {
            resolved
        } else {
            merge(&resolved, &data.unflatten(&siblings)?)
        }
    };

    let mut out = Vec::with_capacity(flat.len());
    let mut inserted = false;
    for (key, value) in flat {
        if data.is_within(key, &site.scope) {
            if !inserted {
                out.extend(flatten_at(data, &site.scope, &replacement));
                inserted = true;
            }
        } else {
            out.push((key.clone(), value.clone()));
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vdoc_drivers::MemoryDriver;
    use vdoc_serde::{json_to_value, value_to_json};

    fn store(docs: serde_json::Value) -> DocumentStore {
        DocumentStore::new(MemoryDriver::from_json(docs).unwrap())
    }

    fn refs_only() -> FetchOptions {
        FetchOptions {
            refs: true,
            ..FetchOptions::raw()
        }
    }

    fn fetch(store: &mut DocumentStore, uri: &str) -> serde_json::Value {
        value_to_json(&store.fetch(uri, &refs_only()).unwrap().unwrap())
    }

    #[test]
    fn helpers() {
        let data = DataConfig::default();
        assert_eq!(rebase(&data, "a/b", "a/b/c/d"), "c/d");
        assert_eq!(
            flatten_at(&data, "k", &Value::map()),
            vec![("k".to_string(), Value::map())]
        );
        assert_eq!(
            flatten_at(&data, "k", &json_to_value(json!({"x": 1}))),
            vec![("k/x".to_string(), Value::Integer(1))]
        );
    }

    #[test]
    fn key_marker_merges_under_siblings() {
        let mut store = store(json!({
            "/shared/db.json": {"host": "db", "port": 5432},
            "/app.json": {"name": "app", "db": {"$ref": "shared/db.json", "port": 6543}},
        }));
        assert_eq!(
            fetch(&mut store, "/app.json"),
            json!({"name": "app", "db": {"host": "db", "port": 6543}})
        );
    }

    #[test]
    fn inline_marker_replaces_value() {
        let mut store = store(json!({
            "/lists/colors.json": ["red", "green"],
            "/conf/app.json": {"colors": "$ref:../lists/colors.json", "items": ["$ref:/lists/colors.json#[1]"]},
        }));
        assert_eq!(
            fetch(&mut store, "/conf/app.json"),
            json!({"colors": ["red", "green"], "items": ["green"]})
        );
    }

    #[test]
    fn fragment_narrows_target() {
        let mut store = store(json!({
            "/consts.json": {"limits": {"max": 10, "min": 1}},
            "/doc.json": {"max": {"$ref": "consts.json#limits/max"}, "min": "$ref:consts#/limits/min"},
        }));
        assert_eq!(fetch(&mut store, "/doc.json"), json!({"max": 10, "min": 1}));
    }

    #[test]
    fn same_document_fragment() {
        let mut store = store(json!({
            "/doc.json": {"base": {"a": 1}, "copy": {"$ref": "#base"}},
        }));
        assert_eq!(
            fetch(&mut store, "/doc.json"),
            json!({"base": {"a": 1}, "copy": {"a": 1}})
        );
    }

    #[test]
    fn top_level_marker_extends_document() {
        let mut store = store(json!({
            "/base.json": {"a": 1, "b": {"c": 2}},
            "/child.json": {"$ref": "base.json", "b": {"d": 3}},
        }));
        assert_eq!(
            fetch(&mut store, "/child.json"),
            json!({"a": 1, "b": {"c": 2, "d": 3}})
        );
    }

    #[test]
    fn keys_with_slashes_survive_resolution() {
        let mut store = store(json!({
            "/base.json": {"name": "base"},
            "/doc.json": {"$ref": "base.json", "routes": {"/home": "h"}},
            "/plain.json": {"routes": {"/home": "h"}},
        }));
        assert_eq!(
            fetch(&mut store, "/doc.json"),
            json!({"name": "base", "routes": {"/home": "h"}})
        );
        assert_eq!(fetch(&mut store, "/plain.json"), json!({"routes": {"/home": "h"}}));
    }

    #[test]
    fn missing_targets_keep_markers() {
        let mut store = store(json!({
            "/doc.json": {"x": {"$ref": "nope.json"}, "y": "$ref:gone.json"},
        }));
        assert_eq!(
            fetch(&mut store, "/doc.json"),
            json!({"x": {"$ref": "nope.json"}, "y": "$ref:gone.json"})
        );
    }

    #[test]
    fn cycles_terminate_with_markers_intact() {
        let mut store = store(json!({
            "/a.json": {"name": "a", "other": {"$ref": "b.json"}},
            "/b.json": {"name": "b", "other": {"$ref": "a.json"}},
        }));
        assert_eq!(
            fetch(&mut store, "/a.json"),
            json!({"name": "a", "other": {"name": "b", "other": {"$ref": "a.json"}}})
        );
        assert_eq!(
            fetch(&mut store, "/b.json"),
            json!({"name": "b", "other": {"name": "a", "other": {"$ref": "b.json"}}})
        );
    }

    #[test]
    fn nested_targets_resolve_transitively() {
        let mut store = store(json!({
            "/c.json": {"leaf": true},
            "/b.json": {"c": {"$ref": "c.json"}},
            "/a.json": {"b": {"$ref": "b.json"}},
        }));
        assert_eq!(
            fetch(&mut store, "/a.json"),
            json!({"b": {"c": {"leaf": true}}})
        );
    }

    #[test]
    fn refs_disabled_returns_markers() {
        let mut store = store(json!({
            "/t.json": 1,
            "/doc.json": {"x": "$ref:t.json"},
        }));
        let raw = store.fetch("/doc.json", &FetchOptions::raw()).unwrap().unwrap();
        assert_eq!(value_to_json(&raw), json!({"x": "$ref:t.json"}));
    }
}
