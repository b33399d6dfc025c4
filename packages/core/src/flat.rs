//! Flat-key data algebra.
//!
//! A nested [`Value`] is addressed leaf by leaf with flat keys: map keys are
//! joined with the object divider and array indices are wrapped in the array
//! wrapper, so `{"list": [{"name": "a"}]}` flattens to `[("list/[0]/name", "a")]`.
//! Empty containers are kept as leaves so the representation is lossless.
//! Map keys containing the divider are escaped the JSON Pointer way: `~`
//! becomes `~0` and the divider becomes `~1`.
//!
//! All operations take their separators from a [`DataConfig`]; the free
//! functions at the bottom of this module use [`DataConfig::default`].

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::Value;

/// One leaf of a flattened tree.
pub type FlatEntry = (String, Value);

/// A flattened tree, in traversal order.
pub type Flat = Vec<FlatEntry>;

/// Separators and limits for the flat-key algebra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataConfig {
    /// Joins map keys.
    pub object_divider: String,
    /// Two characters wrapping an array index.
    pub array_wrapper: String,
    /// Deepest nesting `unflatten` accepts.
    pub max_deep_unflatten: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            object_divider: "/".to_string(),
            array_wrapper: "[]".to_string(),
            max_deep_unflatten: 99,
        }
    }
}

const ESCAPE: &str = "~";

lazy_static! {
    static ref DEFAULT_CONFIG: DataConfig = DataConfig::default();
}

struct Row<'a> {
    segments: Vec<&'a str>,
    key: &'a str,
    value: &'a Value,
}

impl DataConfig {
    fn open(&self) -> &str {
        let end = self
            .array_wrapper
            .char_indices()
            .nth(1)
            .map_or(self.array_wrapper.len(), |(i, _)| i);
        &self.array_wrapper[..end]
    }

    fn close(&self) -> &str {
        let start = self
            .array_wrapper
            .char_indices()
            .nth(1)
            .map_or(self.array_wrapper.len(), |(i, _)| i);
        &self.array_wrapper[start..]
    }

    /// Render an array index as a key segment.
    pub fn index_segment(&self, index: usize) -> String {
        format!("{}{}{}", self.open(), index, self.close())
    }

    fn is_bracketed(&self, segment: &str) -> bool {
        !self.open().is_empty() && segment.starts_with(self.open())
    }

    /// Parse a bracketed segment. `None` for plain keys, `Some(Err)` for a
    /// bracketed segment that is not a valid index.
    fn parse_bracketed(&self, segment: &str) -> Option<Result<usize, ()>> {
        if !self.is_bracketed(segment) {
            return None;
        }
        let inner = segment[self.open().len()..].strip_suffix(self.close());
        Some(inner.and_then(|s| s.parse().ok()).ok_or(()))
    }

    /// Parse an array index given either bracketed or bare.
    pub fn parse_index(&self, segment: &str) -> Option<usize> {
        match self.parse_bracketed(segment) {
            Some(parsed) => parsed.ok(),
            None => segment.parse().ok(),
        }
    }

    /// Escape a map key for use as one key segment.
    pub fn escape_segment<'a>(&self, key: &'a str) -> Cow<'a, str> {
        let divider = self.object_divider.as_str();
        let has_divider = !divider.is_empty() && key.contains(divider);
        if !has_divider && !key.contains(ESCAPE) {
            return Cow::Borrowed(key);
        }
        let escaped = key.replace(ESCAPE, "~0");
        if divider.is_empty() {
            Cow::Owned(escaped)
        } else {
            Cow::Owned(escaped.replace(divider, "~1"))
        }
    }

    /// Inverse of [`escape_segment`](Self::escape_segment).
    pub fn unescape_segment<'a>(&self, segment: &'a str) -> Cow<'a, str> {
        if !segment.contains(ESCAPE) {
            return Cow::Borrowed(segment);
        }
        Cow::Owned(
            segment
                .replace("~1", &self.object_divider)
                .replace("~0", ESCAPE),
        )
    }

    /// Join a parent key and a child segment.
    pub fn join_key(&self, parent: &str, child: &str) -> String {
        if parent.is_empty() {
            child.to_string()
        } else if child.is_empty() {
            parent.to_string()
        } else {
            format!("{}{}{}", parent, self.object_divider, child)
        }
    }

    /// Split a key into segments. The empty key has none.
    pub fn split_key<'a>(&self, key: &'a str) -> Vec<&'a str> {
        if key.is_empty() {
            Vec::new()
        } else {
            key.split(self.object_divider.as_str()).collect()
        }
    }

    /// Key of the enclosing scope, empty at the top level.
    pub fn parent_key<'a>(&self, key: &'a str) -> &'a str {
        key.rfind(self.object_divider.as_str())
            .map_or("", |idx| &key[..idx])
    }

    /// Last segment of a key.
    pub fn last_segment<'a>(&self, key: &'a str) -> &'a str {
        key.rfind(self.object_divider.as_str())
            .map_or(key, |idx| &key[idx + self.object_divider.len()..])
    }

    /// Whether `key` is `scope` itself or lies beneath it.
    pub fn is_within(&self, key: &str, scope: &str) -> bool {
        scope.is_empty()
            || key == scope
            || key
                .strip_prefix(scope)
                .is_some_and(|rest| rest.starts_with(self.object_divider.as_str()))
    }

    /// Re-key every entry beneath `prefix`.
    pub fn prefix_flat(&self, prefix: &str, flat: Flat) -> Flat {
        flat.into_iter()
            .map(|(k, v)| (self.join_key(prefix, &k), v))
            .collect()
    }

    /// Flatten a tree into leaf entries.
    ///
    /// An empty map flattens to nothing; a scalar or an empty array at the
    /// root becomes a single entry with the empty key.
    pub fn flatten(&self, tree: &Value) -> Flat {
        let mut out = Vec::new();
        match tree {
            Value::Map(map) if map.is_empty() => {}
            Value::Map(_) | Value::Array(_) if !tree.is_empty_container() => {
                self.flatten_into("", tree, &mut out)
            }
            leaf => out.push((String::new(), leaf.clone())),
        }
        out
    }

    fn flatten_into(&self, prefix: &str, node: &Value, out: &mut Flat) {
        match node {
            Value::Map(map) if !map.is_empty() => {
                for (key, child) in map {
                    let segment = self.escape_segment(key);
                    self.flatten_into(&self.join_key(prefix, &segment), child, out);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (index, child) in items.iter().enumerate() {
                    self.flatten_into(&self.join_key(prefix, &self.index_segment(index)), child, out);
                }
            }
            leaf => out.push((prefix.to_string(), leaf.clone())),
        }
    }

    /// Rebuild a tree from leaf entries.
    ///
    /// A node becomes an array only when every child segment is a bracketed
    /// index; indices are sorted and compacted. When a key is both a leaf and
    /// the parent of other keys, the children win. Later duplicates overwrite
    /// earlier ones.
    pub fn unflatten(&self, flat: &[FlatEntry]) -> Result<Value, DataError> {
        let rows: Vec<Row<'_>> = flat
            .iter()
            .map(|(key, value)| Row {
                segments: self.split_key(key),
                key,
                value,
            })
            .collect();

        let (roots, nested): (Vec<Row<'_>>, Vec<Row<'_>>) =
            rows.into_iter().partition(|row| row.segments.is_empty());
        if nested.is_empty() {
            return Ok(roots.last().map_or_else(Value::map, |row| row.value.clone()));
        }
        self.build(nested, 0)
    }

    fn build(&self, rows: Vec<Row<'_>>, depth: usize) -> Result<Value, DataError> {
        if depth >= self.max_deep_unflatten {
            let key = rows.first().map_or("", |row| row.key);
            return Err(DataError::DepthExceeded {
                key: key.to_string(),
                max: self.max_deep_unflatten,
            });
        }

        let mut groups: BTreeMap<&str, (Option<&Value>, Vec<Row<'_>>)> = BTreeMap::new();
        for row in rows {
            let segment = row.segments[depth];
            let group = groups.entry(segment).or_default();
            if row.segments.len() == depth + 1 {
                group.0 = Some(row.value);
            } else {
                group.1.push(row);
            }
        }

        let mut indexed = Vec::with_capacity(groups.len());
        let mut all_indexed = true;
        for (segment, (_, deeper)) in &groups {
            match self.parse_bracketed(segment) {
                Some(Ok(index)) => indexed.push(index),
                Some(Err(())) => {
                    let key = deeper.first().map_or(*segment, |row| row.key);
                    return Err(DataError::MalformedPath {
                        key: key.to_string(),
                        segment: segment.to_string(),
                    });
                }
                None => all_indexed = false,
            }
        }

        let mut children = Vec::with_capacity(groups.len());
        for (segment, (leaf, deeper)) in groups {
            let child = if deeper.is_empty() {
                leaf.cloned().unwrap_or_default()
            } else {
                self.build(deeper, depth + 1)?
            };
            children.push((segment, child));
        }

        if all_indexed {
            let mut items: Vec<(usize, Value)> = indexed
                .into_iter()
                .zip(children.into_iter().map(|(_, child)| child))
                .collect();
            items.sort_by_key(|(index, _)| *index);
            Ok(Value::Array(items.into_iter().map(|(_, v)| v).collect()))
        } else {
            Ok(Value::Map(
                children
                    .into_iter()
                    .map(|(segment, child)| (self.unescape_segment(segment).into_owned(), child))
                    .collect(),
            ))
        }
    }

    /// Point lookup by flat key. Accepts `[i]` or bare `i` for array items
    /// and escaped map keys.
    pub fn find<'a>(&self, path: &str, tree: &'a Value) -> Option<&'a Value> {
        let segments: Vec<Cow<'_, str>> = self
            .split_key(path)
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| self.unescape_segment(s))
            .collect();
        self.find_value(&segments, tree, false)
    }

    /// Walk `segments` down `tree`. Segments are raw map keys, not escaped.
    ///
    /// Missing intermediates yield `None`. With `skip_scalar`, reaching a
    /// scalar yields the nearest container above it instead.
    pub fn find_value<'a, S: AsRef<str>>(
        &self,
        segments: &[S],
        tree: &'a Value,
        skip_scalar: bool,
    ) -> Option<&'a Value> {
        let mut current = tree;
        for segment in segments.iter().map(AsRef::as_ref) {
            let next = match current {
                Value::Map(map) => map.get(segment),
                Value::Array(items) => self.parse_index(segment).and_then(|i| items.get(i)),
                _ => None,
            }?;
            if skip_scalar && next.is_scalar() {
                return Some(current);
            }
            current = next;
        }
        if skip_scalar && current.is_scalar() {
            return None;
        }
        Some(current)
    }

    /// Expand inline `$ref:path` values into `key/$ref = path` entries.
    fn expand_inline_refs(&self, flat: Flat, ref_key: &str) -> Flat {
        let inline_prefix = format!("{}:", ref_key);
        flat.into_iter()
            .map(|(key, value)| {
                let target = value
                    .as_str()
                    .and_then(|s| s.strip_prefix(&inline_prefix))
                    .map(str::to_string);
                match target {
                    Some(target) => (self.join_key(&key, ref_key), Value::String(target)),
                    None => (key, value),
                }
            })
            .collect()
    }

    /// Merge two flat lists.
    ///
    /// Inline references on either side are first expanded into `$ref`
    /// subtrees, so a reference meeting a plain value merges as a subtree.
    /// Source entries win exact ties; then any key that is an ancestor of
    /// another key is dropped, so the most specific entry survives.
    pub fn merge_flat(&self, target: Flat, source: Flat, ref_key: &str) -> Flat {
        let target = self.expand_inline_refs(target, ref_key);
        let source = self.expand_inline_refs(source, ref_key);

        let mut merged: Flat = Vec::with_capacity(target.len() + source.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (key, value) in target.into_iter().chain(source) {
            match positions.get(&key) {
                Some(&pos) => merged[pos].1 = value,
                None => {
                    positions.insert(key.clone(), merged.len());
                    merged.push((key, value));
                }
            }
        }

        let mut ancestors: HashSet<&str> = HashSet::new();
        for (key, _) in &merged {
            let mut scope = self.parent_key(key);
            while !scope.is_empty() && ancestors.insert(scope) {
                scope = self.parent_key(scope);
            }
        }
        let shadowed: HashSet<String> = merged
            .iter()
            .filter(|(key, _)| ancestors.contains(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        merged.retain(|(key, _)| !shadowed.contains(key));
        merged
    }

    /// Entries sharing `key`'s scope, excluding `key` and anything beneath it.
    ///
    /// The scope defaults to `key`'s parent. At the top level the siblings are
    /// the entries after `key`'s position.
    pub fn flat_siblings(&self, flat: &[FlatEntry], key: &str, parent_key: Option<&str>) -> Flat {
        let parent = parent_key.unwrap_or_else(|| self.parent_key(key));
        if parent.is_empty() {
            let start = flat
                .iter()
                .position(|(k, _)| k == key)
                .map_or(0, |pos| pos + 1);
            return flat[start..]
                .iter()
                .filter(|(k, _)| !self.is_within(k, key))
                .cloned()
                .collect();
        }
        flat.iter()
            .filter(|(k, _)| k != parent && self.is_within(k, parent) && !self.is_within(k, key))
            .cloned()
            .collect()
    }
}

/// Structural merge of `source` over `target`.
///
/// Maps merge key by key; anything else (arrays included) is replaced
/// wholesale by the source. Inputs are untouched.
pub fn merge(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Map(base), Value::Map(over)) => {
            let mut out = base.clone();
            for (key, value) in over {
                let merged = match out.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Map(out)
        }
        (_, over) => over.clone(),
    }
}

/// [`DataConfig::flatten`] with the default separators.
pub fn flatten(tree: &Value) -> Flat {
    DEFAULT_CONFIG.flatten(tree)
}

/// [`DataConfig::unflatten`] with the default separators.
pub fn unflatten(flat: &[FlatEntry]) -> Result<Value, DataError> {
    DEFAULT_CONFIG.unflatten(flat)
}

/// [`DataConfig::find`] with the default separators.
pub fn find<'a>(path: &str, tree: &'a Value) -> Option<&'a Value> {
    DEFAULT_CONFIG.find(path, tree)
}

/// [`DataConfig::find_value`] with the default separators.
pub fn find_value<'a, S: AsRef<str>>(
    segments: &[S],
    tree: &'a Value,
    skip_scalar: bool,
) -> Option<&'a Value> {
    DEFAULT_CONFIG.find_value(segments, tree, skip_scalar)
}

/// [`DataConfig::merge_flat`] with the default separators.
pub fn merge_flat(target: Flat, source: Flat, ref_key: &str) -> Flat {
    DEFAULT_CONFIG.merge_flat(target, source, ref_key)
}

/// [`DataConfig::flat_siblings`] with the default separators.
pub fn flat_siblings(flat: &[FlatEntry], key: &str, parent_key: Option<&str>) -> Flat {
    DEFAULT_CONFIG.flat_siblings(flat, key, parent_key)
}
