//! Link extraction and classification

use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Path segments that mark a link as documentation-relevant.
const PRIORITY_SEGMENTS: [&str; 7] = [
    "docs",
    "doc",
    "guide",
    "tutorial",
    "api",
    "reference",
    "getting-started",
];

/// Extract same-origin links from a page.
///
/// Relative hrefs resolve against `base` (the crawl's start URL, not the
/// page they appear on). Fragment-only, `mailto:` and `tel:` links are
/// skipped, as is anything on a different origin. Each kept link is
/// normalized to origin + path, dropping query strings and fragments, and
/// deduplicated in first-seen order.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let origin = base.origin();

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("tel:") {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.origin() != origin {
            continue;
        }

        let normalized = format!("{}{}", origin.ascii_serialization(), resolved.path());
        if seen.insert(normalized.clone()) {
            links.push(normalized);
        }
    }

    links
}

/// Whether a link looks like documentation based on its path segments.
pub fn is_priority(link: &str) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };

    url.path_segments()
        .map(|mut segments| segments.any(|segment| PRIORITY_SEGMENTS.contains(&segment)))
        .unwrap_or(false)
}
