//! Upstream reference normalisation.

use url::Url;

const HTTP_PREFIX: &str = "http://";
const HTTPS_PREFIX: &str = "https://";

/// Prefixes a bare `host[:port]` reference with `http://`.
///
/// References that already carry `http://` or `https://` are returned as-is.
pub fn with_protocol(reference: &str) -> String {
    if reference.starts_with(HTTP_PREFIX) || reference.starts_with(HTTPS_PREFIX) {
        reference.to_string()
    } else {
        format!("{}{}", HTTP_PREFIX, reference)
    }
}

/// Parses a reference into an origin URL (scheme and authority only).
pub fn parse_origin(reference: &str) -> Option<Url> {
    let has_http_scheme = reference.starts_with(HTTP_PREFIX) || reference.starts_with(HTTPS_PREFIX);
    if !has_http_scheme && reference.contains("://") {
        return None;
    }
    let url = Url::parse(&with_protocol(reference.trim_end_matches('/'))).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url)
}

/// `scheme://host[:port]` for a parsed origin, without a trailing slash.
pub fn origin_string(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hosts_default_to_http() {
        assert_eq!(with_protocol("localhost:3000"), "http://localhost:3000");
        assert_eq!(with_protocol("http://svc"), "http://svc");
        assert_eq!(with_protocol("https://svc"), "https://svc");
    }

    #[test]
    fn parses_origins() {
        let url = parse_origin("users:3001").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(origin_string(&url), "http://users:3001");

        let url = parse_origin("https://api.example.com/").unwrap();
        assert_eq!(origin_string(&url), "https://api.example.com");
    }

    #[test]
    fn rejects_unusable_references() {
        assert!(parse_origin("").is_none());
        assert!(parse_origin("http://").is_none());
        assert!(parse_origin("bad host:99999").is_none());
        assert!(parse_origin("ftp://files").is_none());
    }
}
