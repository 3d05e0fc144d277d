//! URL normalization for matching requests against the manifest.
//!
//! A same-origin URL is reduced to scheme, host, port and path: its query
//! string and fragment are dropped. A cross-origin URL is left as is.

use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse `input` relative to `origin` and normalize it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve against `origin`, so `/app.css` becomes `{origin}/app.css`
/// 3. Reject anything but http and https
/// 4. Strip query and fragment when the result is same-origin
pub fn normalize(input: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    Ok(ignore_search(&parsed, origin))
}

/// Drop query and fragment from a same-origin URL; return other URLs unchanged.
pub fn ignore_search(url: &Url, origin: &Url) -> Url {
    if !is_same_origin(url, origin) {
        return url.clone();
    }

    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    stripped
}

pub fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}
