use crate::filter::UrlFilter;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Extracts the `href` of every anchor in a rendered document.
///
/// Links using `mailto:`, `tel:` or `javascript:` are dropped; everything else
/// is returned as written, in document order, for the caller to resolve.
pub fn extract_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    let links = doc
        .select(&LINK_SELECTOR)
        .filter_map(|e| e.value().attr("href"))
        .map(str::trim)
        .filter(|href| UrlFilter::is_followable_href(href))
        .map(|s| s.to_string())
        .collect::<Vec<String>>();

    ::log::debug!("HTML parser found {} links", links.len());
    if !links.is_empty() {
        ::log::trace!(
            "First few links: {:?}",
            links.iter().take(5).collect::<Vec<_>>()
        );
    }

    links
}
