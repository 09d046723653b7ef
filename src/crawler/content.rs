//! Readable-text extraction from crawled HTML

use once_cell::sync::Lazy;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};

use crate::text::collapse_whitespace;

/// Elements whose subtrees are page chrome, not content.
const CHROME_TAGS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];

/// Class names that mark an element as chrome regardless of its tag.
const CHROME_CLASSES: [&str; 3] = ["sidebar", "nav", "menu"];

/// Content containers tried in order; the first selector with a match wins.
static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["main", "article", ".content", ".documentation", ".docs", "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

/// Extract the readable text of a page.
///
/// Picks the most specific content container present (`main` before
/// `article` before common content classes before `body`), drops
/// navigation and other chrome subtrees, and collapses all whitespace
/// runs to single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let container = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next());

    let Some(container) = container else {
        return String::new();
    };

    let mut raw = String::new();
    collect_text(container, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if is_chrome(el) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

fn is_chrome(element: &Element) -> bool {
    if CHROME_TAGS.contains(&element.name()) {
        return true;
    }
    element
        .classes()
        .any(|class| CHROME_CLASSES.contains(&class))
}
