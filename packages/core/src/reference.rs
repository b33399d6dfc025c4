//! Reference markers embedded in documents.
//!
//! Two spellings point at another document, optionally narrowed by a
//! fragment after `#`:
//!
//! - a key literally named `$ref` whose string value is the target; the
//!   object holding the key is the subtree to substitute;
//! - a string value `"$ref:path#fragment"`, which stands in for that value.

use crate::flat::{DataConfig, FlatEntry};
use crate::Value;

/// Default marker key.
pub const REFERENCE_KEY: &str = "$ref";

/// A parsed reference target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Target document, empty when the fragment points into the same document.
    pub path: String,
    /// Flat key inside the target, if any.
    pub fragment: Option<String>,
}

impl Reference {
    /// Split `path#fragment`.
    pub fn parse(target: &str) -> Self {
        match target.split_once('#') {
            Some((path, fragment)) => Reference {
                path: path.to_string(),
                fragment: Some(fragment.trim_start_matches('/').to_string())
                    .filter(|f| !f.is_empty()),
            },
            None => Reference {
                path: target.to_string(),
                fragment: None,
            },
        }
    }
}

/// A marker located in a flattened document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSite {
    /// Flat key holding the marker.
    pub key: String,
    /// Flat key of the subtree the resolved value replaces. Empty for a
    /// top-level marker, which extends the whole document instead.
    pub scope: String,
    pub target: Reference,
    /// Whether the marker was a `$ref:` string value.
    pub inline: bool,
}

impl MarkerSite {
    /// Whether the marker sits at the document root.
    pub fn is_top_level(&self) -> bool {
        self.scope.is_empty()
    }
}

/// Locate every marker in `flat`, in order.
pub fn find_markers(config: &DataConfig, flat: &[FlatEntry], ref_key: &str) -> Vec<MarkerSite> {
    let inline_prefix = format!("{}:", ref_key);
    flat.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                _ => return None,
            };
            if config.last_segment(key) == ref_key {
                Some(MarkerSite {
                    key: key.clone(),
                    scope: config.parent_key(key).to_string(),
                    target: Reference::parse(text),
                    inline: false,
                })
            } else {
                text.strip_prefix(&inline_prefix).map(|target| MarkerSite {
                    key: key.clone(),
                    scope: key.clone(),
                    target: Reference::parse(target),
                    inline: true,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fragment() {
        assert_eq!(
            Reference::parse("shared.json#a/b"),
            Reference {
                path: "shared.json".to_string(),
                fragment: Some("a/b".to_string()),
            }
        );
        assert_eq!(Reference::parse("x.json").fragment, None);
        assert_eq!(Reference::parse("x.json#").fragment, None);
        assert_eq!(Reference::parse("#/local").path, "");
        assert_eq!(Reference::parse("#/local").fragment.as_deref(), Some("local"));
    }

    #[test]
    fn finds_key_and_inline_markers() {
        let config = DataConfig::default();
        let flat = vec![
            ("$ref".to_string(), Value::from("base.json")),
            ("a/$ref".to_string(), Value::from("x.json#k")),
            ("b".to_string(), Value::from("$ref:y.json")),
            ("c".to_string(), Value::from("plain")),
            ("d/$ref".to_string(), Value::from(1i64)),
        ];
        let sites = find_markers(&config, &flat, REFERENCE_KEY);
        assert_eq!(sites.len(), 3);
        assert!(sites[0].is_top_level());
        assert_eq!(sites[1].scope, "a");
        assert_eq!(sites[1].target.fragment.as_deref(), Some("k"));
        assert!(sites[2].inline);
        assert_eq!(sites[2].scope, "b");
        assert_eq!(sites[2].target.path, "y.json");
    }
}
