//! Access levels and the context handed to authorization checks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of access being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Write,
    List,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Read => f.write_str("read"),
            AccessLevel::Write => f.write_str("write"),
            AccessLevel::List => f.write_str("list"),
        }
    }
}

/// Who is asking, as far as the driver's policy is concerned.
///
/// The store never interprets this; it is passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub principal: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl AccessContext {
    /// Anonymous context with no attributes.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for a named principal.
    pub fn principal(name: impl Into<String>) -> Self {
        Self {
            principal: Some(name.into()),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
