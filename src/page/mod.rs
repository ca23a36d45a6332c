//! HTML anchor extraction.
//!
//! Pages are reduced to a list of [`Anchor`]s (`href` plus visible text) in
//! document order. Discovery and resolution only ever look at this
//! abstraction, never at the DOM.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").unwrap_or_else(|e| panic!("invalid static selector: {e}"))
});

/// An `<a href>` element reduced to what link heuristics need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// The raw `href` attribute, as written in the page.
    pub href: String,
    /// Visible text with runs of whitespace collapsed to single spaces.
    pub text: String,
}

impl Anchor {
    /// Creates an anchor from raw parts. Mostly useful in tests.
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }

    /// Resolves the `href` against the page it was found on.
    #[must_use]
    pub fn absolute_url(&self, page_url: &Url) -> Option<Url> {
        page_url.join(self.href.trim()).ok()
    }
}

/// Parses `html` and returns every anchor with a non-empty `href`, in document order.
#[must_use]
pub fn extract_anchors(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let text = element
                .text()
                .flat_map(|chunk| chunk.split_whitespace())
                .collect::<Vec<_>>()
                .join(" ");
            Some(Anchor::new(href, text))
        })
        .collect()
}

/// Case-insensitive substring test used by every link heuristic.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(needle.to_lowercase().as_str())
}
