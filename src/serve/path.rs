//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Outcome of mapping a request URL onto the served root.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Resolved {
    /// A readable file under the root.
    File(PathBuf),
    /// A directory requested without its trailing slash; the value is the
    /// slash-terminated location (query preserved).
    Redirect(String),
    Missing,
}

/// Resolve `url` under `serve_root`, handling `index.html` for directories.
pub(super) fn resolve_path(url: &str, serve_root: &Path) -> Resolved {
    let (path, query) = split_url(url);
    let Some(clean) = decode_path(path) else {
        return Resolved::Missing;
    };

    // Reject parent components early; canonicalization catches the rest.
    if clean.split('/').any(|seg| seg == "..") {
        return Resolved::Missing;
    }

    let local = serve_root.join(clean.trim_matches('/'));

    // Canonicalize to resolve symlinks and verify the path is under serve_root.
    let Ok(canonical) = local.canonicalize() else {
        return Resolved::Missing;
    };
    let Ok(root_canonical) = serve_root.canonicalize() else {
        return Resolved::Missing;
    };
    if !canonical.starts_with(&root_canonical) {
        return Resolved::Missing;
    }

    if canonical.is_file() {
        return Resolved::File(canonical);
    }

    if canonical.is_dir() {
        if !path.ends_with('/') {
            let location = match query {
                Some(q) => format!("{path}/?{q}"),
                None => format!("{path}/"),
            };
            return Resolved::Redirect(location);
        }
        let index = canonical.join("index.html");
        if index.is_file() {
            return Resolved::File(index);
        }
    }

    Resolved::Missing
}

/// Split off the query string and drop any fragment.
pub(super) fn split_url(url: &str) -> (&str, Option<&str>) {
    let url = url.split('#').next().unwrap_or(url);
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

/// Percent-decode a URL path. Invalid UTF-8 or embedded NULs resolve to nothing.
fn decode_path(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    if decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }
    Some(decoded.into_owned())
}
