//! Prefix routing to attached sub-stores.
//!
//! A delegate answers every primitive whose address lies at or below its
//! prefix, seeing the address with the prefix stripped. Delegates are matched
//! in attachment order and each keeps its own caches.

use tracing::debug;
use vdoc_core::path;

use crate::store::{canonical, DocumentStore};

pub(crate) struct Delegate {
    pub(crate) prefix: String,
    pub(crate) store: DocumentStore,
}

/// The part of `uri` below `prefix`, rooted at `/`.
fn strip_prefix(prefix: &str, uri: &str) -> Option<String> {
    if uri == prefix {
        return Some("/".to_string());
    }
    let rest = uri.strip_prefix(prefix)?.strip_prefix('/')?;
    Some(format!("/{}", rest))
}

impl DocumentStore {
    /// Mount `store` at `prefix`. Re-attaching a prefix replaces (and
    /// returns) the previous delegate.
    pub fn attach(&mut self, prefix: &str, store: DocumentStore) -> Option<DocumentStore> {
        let prefix = canonical(prefix);
        debug!("Attaching store at {}", prefix);
        let previous = self.detach(&prefix);
        self.delegates.push(Delegate { prefix, store });
        self.memo.clear();
        previous
    }

    /// Unmount the delegate at `prefix`, handing it back.
    pub fn detach(&mut self, prefix: &str) -> Option<DocumentStore> {
        let prefix = canonical(prefix);
        let position = self.delegates.iter().position(|d| d.prefix == prefix)?;
        self.memo.clear();
        Some(self.delegates.remove(position).store)
    }

    /// Prefixes of attached delegates, in matching order.
    pub fn mounts(&self) -> Vec<&str> {
        self.delegates.iter().map(|d| d.prefix.as_str()).collect()
    }

    /// First delegate handling `uri` and the address it sees.
    pub(crate) fn route(&self, uri: &str) -> Option<(usize, String)> {
        if self.delegates.is_empty() {
            return None;
        }
        let uri = canonical(uri);
        self.delegates
            .iter()
            .enumerate()
            .filter(|(_, d)| d.prefix != "/")
            .find_map(|(index, d)| strip_prefix(&d.prefix, &uri).map(|inner| (index, inner)))
    }

    /// Directory names contributed to a listing of `uri` by mount points
    /// beneath it.
    pub(crate) fn mount_names(&self, uri: &str) -> Vec<String> {
        let dir = canonical(uri);
        self.delegates
            .iter()
            .filter_map(|d| {
                let inner = strip_prefix(&dir, &d.prefix).or_else(|| {
                    (dir == "/").then(|| d.prefix.clone())
                })?;
                path::segments(&inner)
                    .first()
                    .map(|first| format!("{}/", first))
            })
            .collect()
    }

    /// Whether `uri` is an ancestor of some mount point.
    pub(crate) fn is_mount_parent(&self, uri: &str) -> bool {
        !self.mount_names(uri).is_empty()
    }
}
