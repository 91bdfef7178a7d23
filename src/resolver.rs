//! Local stub for the remote link resolver.
//!
//! Real resolution happens in a separate process; this side only hands the
//! URL through untouched so call sites stay stable.

/// Turns a share link into a downloadable one.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, url: &str) -> String;
}

/// Returns every URL unchanged. Never fails, never does I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughResolver;

impl LinkResolver for PassThroughResolver {
    fn resolve(&self, url: &str) -> String {
        url.to_string()
    }
}

pub fn resolve(url: &str) -> String {
    PassThroughResolver.resolve(url)
}

/// Filename a download of `url` should be saved under.
///
/// Takes the last path segment, ignoring any query or fragment, and falls
/// back to `"download"` when that segment is empty, as it is for a path
/// ending in `/`.
pub fn filename_hint(url: &str) -> String {
    let without_suffix = url.split(['?', '#']).next().unwrap_or("");
    let path = match without_suffix.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => without_suffix,
    };
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "download".to_string())
}
