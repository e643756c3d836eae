use std::fmt;

use serde::Serialize;
use url::{Position, Url};

/// Href prefixes that never point at a crawlable page
const IGNORED_HREF_PREFIXES: [&str; 3] = ["mailto:", "tel:", "javascript:"];

/// Canonical string form of an http(s) URL, used as the frontier dedup key.
///
/// The form is `scheme://authority/path[?query]`: the path defaults to `/`,
/// a trailing slash on a non-root path is removed and the fragment is always
/// dropped. The authority is kept exactly as written in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `host[:port]` part of the URL
    pub fn origin(&self) -> &str {
        raw_authority(&self.0).unwrap_or("")
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<NormalizedUrl> for String {
    fn from(url: NormalizedUrl) -> Self {
        url.0
    }
}

/// Canonicalizes `url`, resolving it against `base` first when given.
///
/// Returns `None` for anything that does not resolve to an `http` or `https`
/// URL. The query string is kept only when `include_query` is set, so that
/// query variants of a page collapse to one entry during discovery.
pub fn normalize_url(url: &str, base: Option<&str>, include_query: bool) -> Option<NormalizedUrl> {
    let input = url.trim();
    let base = match base {
        Some(base) => Some((base.trim(), Url::parse(base.trim()).ok()?)),
        None => None,
    };
    let parsed = match &base {
        Some((_, base_url)) => base_url.join(input).ok()?,
        None => Url::parse(input).ok()?,
    };

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return None;
    }

    // The parser folds host case and drops default ports; the authority is
    // taken from the text the URL came from instead. The base text only
    // applies while the resolved URL still points at the base's host.
    let resolved_authority = &parsed[Position::BeforeUsername..Position::AfterPort];
    let authority = match raw_authority(input) {
        Some(authority) => authority,
        None => match &base {
            Some((base_text, base_url)) if same_host(base_url, &parsed) => {
                raw_authority(base_text).unwrap_or(resolved_authority)
            }
            _ => resolved_authority,
        },
    };
    if authority.is_empty() {
        return None;
    }

    let mut path = parsed.path();
    if path.is_empty() {
        path = "/";
    }
    if path != "/" && path.ends_with('/') {
        path = &path[..path.len() - 1];
    }

    let mut normalized = format!("{scheme}://{authority}{path}");
    if include_query {
        if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
            normalized.push('?');
            normalized.push_str(query);
        }
    }

    Some(NormalizedUrl(normalized))
}

/// Whether two URLs share the same network location (`host[:port]`).
///
/// The scheme is not compared. Host names are compared exactly as written,
/// without case folding, so `Example.com` and `example.com` are treated as
/// different origins.
pub fn same_origin(a: &str, b: &str) -> bool {
    raw_authority(a.trim()).unwrap_or("") == raw_authority(b.trim()).unwrap_or("")
}

fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Extracts the authority component of a URL string verbatim, if it has one.
fn raw_authority(input: &str) -> Option<&str> {
    let idx = input.find("//")?;
    let prefix = &input[..idx];
    if !prefix.is_empty() && !is_scheme_prefix(prefix) {
        return None;
    }

    let rest = &input[idx + 2..];
    let end = rest.find(['/', '\\', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Matches `scheme:` where scheme is `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_scheme_prefix(prefix: &str) -> bool {
    let Some(scheme) = prefix.strip_suffix(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Decides which discovered links may enter the frontier during a crawl
#[derive(Debug, Clone)]
pub struct UrlFilter {
    root: NormalizedUrl,
}

impl UrlFilter {
    /// Create a filter bounded to the origin of `root`
    pub fn new(root: NormalizedUrl) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &NormalizedUrl {
        &self.root
    }

    /// Determine if a normalized URL is inside the crawl boundary
    pub fn should_crawl(&self, url: &NormalizedUrl) -> bool {
        same_origin(url.as_str(), self.root.as_str())
    }

    /// Whether a raw href is worth resolving at all
    pub fn is_followable_href(href: &str) -> bool {
        !href.is_empty()
            && !IGNORED_HREF_PREFIXES
                .iter()
                .any(|prefix| href.starts_with(prefix))
    }

    /// Resolve a raw href found on `page` into a frontier candidate.
    ///
    /// Returns `None` for ignored schemes, unparsable links and links that
    /// leave the crawl origin. The query string is always dropped.
    pub fn resolve_link(&self, href: &str, page: &NormalizedUrl) -> Option<NormalizedUrl> {
        if !Self::is_followable_href(href) {
            return None;
        }
        let candidate = normalize_url(href, Some(page.as_str()), false)?;
        if !self.should_crawl(&candidate) {
            ::log::debug!("URL filter rejected off-origin link: {}", candidate);
            return None;
        }
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(url: &str) -> String {
        normalize_url(url, None, false).unwrap().to_string()
    }

    #[test]
    fn test_root_and_trailing_slash() {
        assert_eq!(norm("https://example.com"), "https://example.com/");
        assert_eq!(norm("https://example.com/"), "https://example.com/");
        assert_eq!(norm("https://example.com/about/"), "https://example.com/about");
        assert_eq!(norm("https://example.com/a/b/"), "https://example.com/a/b");
    }

    #[test]
    fn test_fragment_and_query() {
        assert_eq!(norm("https://example.com/about#team"), "https://example.com/about");
        assert_eq!(norm("https://example.com/list?page=2"), "https://example.com/list");

        let with_query = normalize_url("https://example.com/list/?page=2#x", None, true).unwrap();
        assert_eq!(with_query.as_str(), "https://example.com/list?page=2");

        let empty_query = normalize_url("https://example.com/list?", None, true).unwrap();
        assert_eq!(empty_query.as_str(), "https://example.com/list");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(normalize_url("mailto:x@y.com", None, false).is_none());
        assert!(normalize_url("ftp://example.com/file", None, false).is_none());
        assert!(normalize_url("javascript:void(0)", Some("https://example.com/"), false).is_none());
        assert!(normalize_url("not a url", None, false).is_none());
        assert!(normalize_url("/relative", None, false).is_none());
    }

    #[test]
    fn test_relative_resolution() {
        let base = "https://example.com/docs/intro";
        let resolve = |href| normalize_url(href, Some(base), false).unwrap().to_string();

        assert_eq!(resolve("/about/"), "https://example.com/about");
        assert_eq!(resolve("setup"), "https://example.com/docs/setup");
        assert_eq!(resolve("../blog/"), "https://example.com/blog");
        assert_eq!(resolve("#top"), "https://example.com/docs/intro");
        assert_eq!(resolve("//other.org/x"), "https://other.org/x");
        assert_eq!(resolve("http://example.com:8080/y"), "http://example.com:8080/y");

        // Hrefs that resolve to another host without a literal `//`
        assert_eq!(resolve("http:/evil.com/x"), "http://evil.com/x");
        assert_eq!(resolve("\\\\evil.com\\x"), "https://evil.com/x");
        assert_eq!(resolve("https:evil.com/x"), "https://example.com/docs/evil.com/x");
    }

    #[test]
    fn test_authority_kept_verbatim() {
        assert_eq!(norm("https://Example.COM/Path"), "https://Example.COM/Path");
        assert_eq!(norm("https://example.com:443/a"), "https://example.com:443/a");

        let relative = normalize_url("/x", Some("https://Example.com/"), false).unwrap();
        assert_eq!(relative.as_str(), "https://Example.com/x");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "https://example.com",
            "https://example.com/about/",
            "http://example.com:8080/a/b/?q=1#frag",
            "https://Example.com/%7Euser/",
            "https://example.com/a/./b/../c/",
            "https://user:pw@example.com/x",
        ];
        for input in inputs {
            for include_query in [false, true] {
                let once = normalize_url(input, None, include_query).unwrap();
                let twice = normalize_url(once.as_str(), None, include_query).unwrap();
                assert_eq!(once, twice, "not idempotent for {input}");
            }
        }
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin("https://example.com/a", "http://example.com/b"));
        assert!(!same_origin("https://example.com/a", "https://other.com/a"));
        assert!(!same_origin("https://example.com/", "https://example.com:8080/"));
        assert!(!same_origin("https://example.com/", "https://sub.example.com/"));
        // Host case is compared as written
        assert!(!same_origin("https://Example.com/", "https://example.com/"));
    }

    #[test]
    fn test_filter_resolve_link() {
        let root = normalize_url("https://example.com/", None, false).unwrap();
        let filter = UrlFilter::new(root.clone());

        assert_eq!(
            filter.resolve_link("/about/", &root).unwrap().as_str(),
            "https://example.com/about"
        );
        assert!(filter.resolve_link("mailto:x@y.com", &root).is_none());
        assert!(filter.resolve_link("tel:+123", &root).is_none());
        assert!(filter.resolve_link("javascript:void(0)", &root).is_none());
        assert!(filter.resolve_link("https://other.com/", &root).is_none());
        assert!(filter.resolve_link("http:/evil.com/x", &root).is_none());
        assert!(filter.resolve_link("\\\\evil.com\\x", &root).is_none());
        assert!(filter.resolve_link("", &root).is_none());
    }

    #[test]
    fn test_origin_accessor() {
        let url = normalize_url("http://example.com:8080/a", None, false).unwrap();
        assert_eq!(url.origin(), "example.com:8080");
    }
}
