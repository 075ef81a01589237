//! URL canonicalization for consistent cache identity.

use ::url::Url;

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

/// Canonicalize a request URL against the app origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`/app.js`) against `base`
/// 3. Lowercase the host
/// 4. Remove fragment (#...), which never takes part in cache identity
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Path component of a URL string, falling back to the string without its
/// query when it does not parse as an absolute URL.
pub fn path_of(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.find("://") {
        Some(idx) => {
            let rest = &without_query[idx + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("/")
        }
        None => without_query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    #[test]
    fn test_canonicalize_relative() {
        let url = canonicalize("/app.js", &base()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/app.js");
    }

    #[test]
    fn test_canonicalize_absolute_keeps_other_origin() {
        let url = canonicalize("https://fonts.googleapis.com/css2?family=Poppins", &base()).unwrap();
        assert_eq!(url.host_str(), Some("fonts.googleapis.com"));
        assert_eq!(url.query(), Some("family=Poppins"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM/index.html", &base()).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("/index.html#records", &base()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/index.html");
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  /api/pharmacy  ", &base()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/pharmacy");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", &base());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("", &base()), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   ", &base()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_path_of() {
        assert_eq!(path_of("http://localhost:8080/api/pharmacy?q=1"), "/api/pharmacy");
        assert_eq!(path_of("https://example.com"), "/");
        assert_eq!(path_of("/styles.css?v=2"), "/styles.css");
    }
}
