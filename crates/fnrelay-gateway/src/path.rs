use fnrelay_core::inbound::PlatformRequest;

/// Canonical request path plus the raw query string, when one was present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    path: String,
    query: Option<String>,
}

impl ResolvedPath {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

/// Reconstruct the logical request path from whatever the platform delivered.
///
/// Sources, in order: a non-empty, non-root URL string; numeric-indexed
/// catch-all query keys (`"0"`, `"1"`, …); the bare root. The result always
/// begins with `mount_root`, prepended at most once — the check matches only
/// at the start of the path, never against an embedded occurrence. Never
/// fails: a request with no usable signal resolves to the mount root.
pub fn resolve_path(request: &PlatformRequest, mount_root: &str) -> ResolvedPath {
    let (mut path, query) = match request.url() {
        Some(url) if !url.is_empty() && url != "/" => split_url(url),
        _ => (reconstruct_from_segments(request), None),
    };

    if !path.starts_with(mount_root) {
        path = format!("{mount_root}{path}");
    }

    ResolvedPath { path, query }
}

fn split_url(url: &str) -> (String, Option<String>) {
    match url.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (url.to_string(), None),
    }
}

/// Catch-all routing may deliver path segments as query keys `"0"`, `"1"`, …
/// Scan in ascending order while each is defined and join them back into a
/// path.
fn reconstruct_from_segments(request: &PlatformRequest) -> String {
    let query = request.query();
    let mut segments = Vec::new();
    let mut index = 0usize;
    while let Some(segment) = query.get(&index.to_string()) {
        segments.push(segment.as_str());
        index += 1;
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}
