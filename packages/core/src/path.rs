//! Path algebra over '/'-separated paths and remote URIs.
//!
//! Every function here is pure and works on plain strings, so the same rules
//! apply to local trees, in-memory maps and `scheme://` addresses.
//!
//! Conventions:
//! - a leading `/` makes a path absolute, a `letters://` prefix makes it remote
//!   (and therefore absolute too);
//! - a trailing `/` marks directory intent and survives the directory-aware
//!   transforms (`normalize`, `basename`, `relative`);
//! - normalized paths contain no `.`, no empty segments and no resolvable `..`.

use lazy_static::lazy_static;
use regex::Regex;

/// The segment separator.
pub const SEPARATOR: char = '/';

lazy_static! {
    static ref REMOTE_PREFIX: Regex = Regex::new(r"^[A-Za-z]+://").unwrap();
}

/// Check whether `uri` starts with a `scheme://` prefix.
pub fn is_remote(uri: &str) -> bool {
    REMOTE_PREFIX.is_match(uri)
}

/// Check whether `uri` is absolute (leading `/`) or remote.
pub fn is_absolute(uri: &str) -> bool {
    uri.starts_with(SEPARATOR) || is_remote(uri)
}

/// Check whether `uri` carries directory intent.
pub fn is_dir(uri: &str) -> bool {
    uri.ends_with(SEPARATOR)
}

/// Split a path into its root prefix (`scheme://`, `/` or nothing) and the rest.
pub fn split_root(uri: &str) -> (&str, &str) {
    if let Some(m) = REMOTE_PREFIX.find(uri) {
        (&uri[..m.end()], &uri[m.end()..])
    } else if uri.starts_with(SEPARATOR) {
        (&uri[..1], uri.trim_start_matches(SEPARATOR))
    } else {
        ("", uri)
    }
}

/// Non-empty segments below the root prefix.
pub fn segments(uri: &str) -> Vec<&str> {
    split_root(uri)
        .1
        .split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join segments on `/` and normalize.
///
/// Drops `.`, resolves `..` against the segments accumulated so far (an
/// unmatched `..` is dropped), collapses repeated slashes and keeps a single
/// trailing `/` iff the last non-empty input ended with one.
///
/// If the first segment is absolute and a later one is relative, the first
/// segment is ignored: an absolute working directory gives way to a relative
/// override. Use [`join`] to concatenate without that rule.
///
/// ```rust
/// use vdoc_core::path::normalize;
///
/// assert_eq!(normalize(&["a/b/../c"]), "a/c");
/// assert_eq!(normalize(&["a//b///c"]), "a/b/c");
/// assert_eq!(normalize(&["dir/sub/"]), "dir/sub/");
/// ```
pub fn normalize<S: AsRef<str>>(segments: &[S]) -> String {
    let mut parts: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
    if parts.len() > 1
        && parts[0].starts_with(SEPARATOR)
        && parts[1..].iter().any(|s| !s.is_empty() && !is_absolute(s))
    {
        parts.remove(0);
    }
    join(&parts)
}

/// Concatenate segments with `/` and normalize the result.
///
/// Unlike [`normalize`], an absolute first segment is always kept.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let non_empty: Vec<&str> = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect();
    let trailing = non_empty.last().is_some_and(|s| is_dir(s));
    let joined = non_empty.join("/");

    let (prefix, rest) = split_root(&joined);
    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return if prefix.is_empty() {
            ".".to_string()
        } else {
            prefix.to_string()
        };
    }

    let mut out = String::with_capacity(joined.len());
    out.push_str(prefix);
    out.push_str(&parts.join("/"));
    if trailing {
        out.push(SEPARATOR);
    }
    out
}

/// Last non-empty segment. Directory paths keep their trailing `/`.
///
/// ```rust
/// use vdoc_core::path::basename;
///
/// assert_eq!(basename("/dir/file.txt"), "file.txt");
/// assert_eq!(basename("/dir/"), "dir/");
/// ```
pub fn basename(uri: &str) -> String {
    let trimmed = uri.trim_end_matches(SEPARATOR);
    let (_, rest) = split_root(trimmed);
    let name = rest.rsplit(SEPARATOR).next().unwrap_or(rest);
    if name.is_empty() {
        return String::new();
    }
    if is_dir(uri) {
        format!("{}/", name)
    } else {
        name.to_string()
    }
}

/// Basename with `suffix` removed, unless the basename is exactly `suffix`.
pub fn basename_without(uri: &str, suffix: &str) -> String {
    let base = basename(uri);
    if !suffix.is_empty() && base != suffix {
        if let Some(stripped) = base.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    base
}

/// Basename with its extension (as reported by [`extname`]) removed.
pub fn stem(uri: &str) -> String {
    let base = basename(uri);
    match extension_start(&base) {
        Some(idx) if !is_dir(&base) => base[..idx].to_string(),
        _ => base,
    }
}

/// Parent directory with a trailing `/`.
///
/// A single absolute segment yields `/`, a single relative one yields `.`.
pub fn dirname(uri: &str) -> String {
    let (prefix, rest) = split_root(uri);
    let segs: Vec<&str> = rest.split(SEPARATOR).filter(|s| !s.is_empty()).collect();
    if segs.len() <= 1 {
        return match prefix {
            "" => ".".to_string(),
            "/" => "/".to_string(),
            remote => match segs.first() {
                Some(host) => format!("{}{}/", remote, host),
                None => remote.to_string(),
            },
        };
    }
    format!("{}{}/", prefix, segs[..segs.len() - 1].join("/"))
}

fn extension_start(name: &str) -> Option<usize> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(idx),
    }
}

/// Lower-cased extension of the last segment, including the dot.
///
/// Empty for directories, names without a dot and dot-files.
pub fn extname(uri: &str) -> String {
    if is_dir(uri) {
        return String::new();
    }
    let base = basename(uri);
    match extension_start(&base) {
        Some(idx) => base[idx..].to_lowercase(),
        None => String::new(),
    }
}

/// Path of `to` as seen from `from`.
///
/// Both paths must be absolute; otherwise `to` is returned unchanged. The base
/// for `from` is the path itself when it is a directory and its parent when it
/// is a file. When `to` is a directory that contains `from`, the result is the
/// part of `from` below `to`.
///
/// ```rust
/// use vdoc_core::path::relative;
///
/// assert_eq!(relative("/a/b", "/a/c"), "c");
/// assert_eq!(relative("/a/b/", "/a/c/d"), "../c/d");
/// assert_eq!(relative("/root/dir", "/root/"), "dir");
/// ```
pub fn relative(from: &str, to: &str) -> String {
    if !is_absolute(from) || !is_absolute(to) {
        return to.to_string();
    }
    let (from_prefix, _) = split_root(from);
    let (to_prefix, _) = split_root(to);
    if from_prefix != to_prefix {
        return to.to_string();
    }

    let from_segs = segments(from);
    let to_segs = segments(to);
    if is_remote(from) && from_segs.first() != to_segs.first() {
        return to.to_string();
    }

    if is_dir(to) && from_segs.len() > to_segs.len() && from_segs.starts_with(&to_segs) {
        let mut out = from_segs[to_segs.len()..].join("/");
        if is_dir(from) {
            out.push(SEPARATOR);
        }
        return out;
    }

    let base = if is_dir(from) {
        &from_segs[..]
    } else {
        &from_segs[..from_segs.len().saturating_sub(1)]
    };
    let common = base
        .iter()
        .zip(to_segs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat("..").take(base.len() - common).collect();
    parts.extend(&to_segs[common..]);
    if parts.is_empty() {
        return ".".to_string();
    }
    let mut out = parts.join("/");
    if is_dir(to) {
        out.push(SEPARATOR);
    }
    out
}

/// Resolve `root` and `segments` against `cwd` into an absolute path.
///
/// A remote `cwd` keeps its origin and path and gets the normalized
/// `root`+`segments` appended. Otherwise an absolute `root` replaces `cwd`, and
/// an absolute segment restarts the accumulation. The result always starts
/// with `/` (or is a remote URI).
pub fn absolute<S: AsRef<str>>(cwd: &str, root: &str, segments: &[S]) -> String {
    if is_remote(cwd) {
        let (prefix, rest) = split_root(cwd);
        let mut tail: Vec<&str> = vec![root];
        tail.extend(segments.iter().map(AsRef::as_ref));
        let appended = join(&[rest.to_string(), join(&tail)]);
        if appended == "." {
            return prefix.to_string();
        }
        return format!("{}{}", prefix, appended);
    }

    let mut parts: Vec<&str> = if is_absolute(root) {
        vec![root]
    } else {
        vec![cwd, root]
    };
    for segment in segments.iter().map(AsRef::as_ref) {
        if is_absolute(segment) {
            parts.clear();
        }
        parts.push(segment);
    }

    let joined = join(&parts);
    if is_absolute(&joined) {
        joined
    } else if joined == "." {
        "/".to_string()
    } else {
        format!("/{}", joined)
    }
}

/// Strip `base` from `path` when `path` lies strictly below it.
fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches(SEPARATOR);
    let rest = if base.is_empty() {
        path.strip_prefix(SEPARATOR)?
    } else {
        path.strip_prefix(base)?.strip_prefix(SEPARATOR)?
    };
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

fn same_path(a: &str, b: &str) -> bool {
    let a = if a.len() > 1 { a.trim_end_matches(SEPARATOR) } else { a };
    let b = if b.len() > 1 { b.trim_end_matches(SEPARATOR) } else { b };
    a == b
}

/// Resolve `segments` relative to the virtual root formed by `cwd` and `root`.
///
/// Segments accumulate left to right; an absolute segment restarts the
/// accumulation and forces a leading `/` on results that escape the root.
///
/// ```rust
/// use vdoc_core::path::resolve_sync;
///
/// assert_eq!(resolve_sync("/base", ".", &["a/b/../c"]), "a/c");
/// assert_eq!(resolve_sync("/base", ".", &["/base/x"]), "x");
/// assert_eq!(resolve_sync("/base", ".", &["/other/x"]), "/other/x");
/// ```
pub fn resolve_sync<S: AsRef<str>>(cwd: &str, root: &str, segments: &[S]) -> String {
    let mut acc: Vec<&str> = Vec::new();
    let mut saw_absolute = false;
    for segment in segments.iter().map(AsRef::as_ref) {
        if is_absolute(segment) {
            acc.clear();
            saw_absolute = true;
        }
        acc.push(segment);
    }
    let result = join(&acc);

    let cwd = join(&[cwd]);
    let root_norm = join(&[root]);
    let base = if is_absolute(root) {
        root_norm.clone()
    } else {
        join(&[cwd.as_str(), root])
    };

    if same_path(&result, &cwd) {
        return ".".to_string();
    }
    if cwd == "." && is_absolute(root) && !saw_absolute {
        return normalize(segments);
    }
    if cwd == "." && root_norm == "." {
        return match segments.iter().position(|s| !is_absolute(s.as_ref())) {
            Some(start) => join(&segments[start..]),
            None => ".".to_string(),
        };
    }
    if let Some(rest) = strip_base(&result, &base) {
        return rest.to_string();
    }
    if same_path(&result, &base) {
        return ".".to_string();
    }
    if let Some(rest) = strip_base(&result, &cwd) {
        return rest.to_string();
    }
    if saw_absolute && !is_absolute(&result) {
        return format!("/{}", result);
    }
    result
}
