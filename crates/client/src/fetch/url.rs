//! URL canonicalization and resolution for cache keys and navigation.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string for consistent caching.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    canonical(parsed)
}

/// Canonicalize an already parsed URL.
pub fn canonical(mut url: url::Url) -> Result<url::Url, UrlError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = url.host_str() {
        let lower = host.to_lowercase();
        url.set_host(Some(&lower)).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    url.set_fragment(None);

    Ok(url)
}

/// Resolve a link target read from a page against the page's URL.
///
/// Fragments are kept: a navigation target like `ch2.html#note-3` must land
/// on the note.
pub fn resolve(base: &url::Url, target: &str) -> Result<url::Url, UrlError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(UrlError::Empty);
    }
    base.join(target).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

/// Scope of a worker script: the directory that contains it.
pub fn scope_of(script_url: &url::Url) -> url::Url {
    let mut scope = script_url.clone();
    scope.set_query(None);
    scope.set_fragment(None);
    if let Ok(mut segments) = scope.path_segments_mut() {
        segments.pop().push("");
    }
    scope
}
