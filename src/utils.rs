use regex::Regex;
use std::sync::LazyLock;

/// Longest slug used in a screenshot file name
pub const MAX_SLUG_LEN: usize = 120;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\-]").expect("valid regex"));
static HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// Convert a page name to a file-name safe slug
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let hyphenated = WHITESPACE.replace_all(lower.trim(), "-");
    let cleaned = DISALLOWED.replace_all(&hyphenated, "");
    let collapsed = HYPHENS.replace_all(&cleaned, "-");

    let slug: String = collapsed.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug
    }
}

/// Screenshot file name for the `index`-th capture, e.g. `007-about-us.png`
pub fn screenshot_filename(index: usize, page_name: &str) -> String {
    format!("{:03}-{}.png", index, slugify(page_name))
}
