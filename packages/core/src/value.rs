//! The Value type - the tree every document decodes into.
//!
//! Documents are JSON-shaped trees, but the tree is encoding-agnostic: text
//! and binary documents decode into `String` and `Bytes` leaves.

use std::collections::BTreeMap;

/// A tree-shaped document value.
///
/// - `BTreeMap` keeps keys sorted so flattening and merging are deterministic.
/// - `Bytes` carries binary documents that no codec parsed.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Whether this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Whether this is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Maps and arrays.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Array(_))
    }

    /// Everything that is not a container.
    pub fn is_scalar(&self) -> bool {
        !self.is_container()
    }

    /// Containers with no children.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Value::Map(m) => m.is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        }
    }

    /// The string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries of a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow the items of an array.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Look up a direct child of a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Insert a child into a map, turning a non-map value into an empty map first.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if !self.is_map() {
            *self = Value::map();
        }
        if let Value::Map(map) = self {
            map.insert(key.into(), value.into());
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_predicates() {
        assert!(Value::map().is_container());
        assert!(Value::array().is_empty_container());
        assert!(Value::from("x").is_scalar());
        assert!(!Value::from(vec![1i64]).is_empty_container());
        assert!(Value::Null.is_scalar());
    }

    #[test]
    fn insert_and_get() {
        let mut value = Value::Null;
        value.insert("name", "vdoc");
        value.insert("count", 3i64);

        assert_eq!(value.get("name").and_then(Value::as_str), Some("vdoc"));
        assert_eq!(value.get("count"), Some(&Value::Integer(3)));
        assert_eq!(value.get("missing"), None);
        assert_eq!(Value::from(1i64).get("x"), None);
    }

    #[test]
    fn collect_into_map() {
        let value: Value = [("a", 1i64), ("b", 2i64)].into_iter().collect();
        assert_eq!(value.as_map().map(BTreeMap::len), Some(2));
    }
}
