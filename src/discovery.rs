//! Link discovery over a set of seed pages.
//!
//! Each seed page is fetched once; anchors whose URL or visible text mention
//! one of the configured keywords, and whose absolute URL contains the domain
//! filter, become candidate links. The seeds themselves are always part of
//! the result so a seed that is already a direct PDF link is not lost.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::discovery::LinkDiscovery;
//! use harvester_core::session::Session;
//!
//! # async fn example() {
//! let session = Session::new();
//! let discovery = LinkDiscovery::new(&session, "https://www.example.org");
//! let links = discovery
//!     .discover(&["https://www.example.org/research".to_string()])
//!     .await;
//! println!("{} candidate links", links.len());
//! # }
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::page::{Anchor, contains_ignore_case, extract_anchors};
use crate::session::{FetchError, Session};

/// Keywords that mark a link as worth following when none are configured.
pub const DEFAULT_DISCOVERY_KEYWORDS: &[&str] = &["poll", "report", "research", "study", "findings"];

/// Default pause between two seed page fetches.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Scrapes seed pages for candidate links on a single domain.
#[derive(Debug, Clone)]
pub struct LinkDiscovery<'a> {
    session: &'a Session,
    domain_filter: String,
    keywords: Vec<String>,
    page_delay: Duration,
}

impl<'a> LinkDiscovery<'a> {
    /// Creates a discovery pass with the default keywords and page delay.
    #[must_use]
    pub fn new(session: &'a Session, domain_filter: impl Into<String>) -> Self {
        Self {
            session,
            domain_filter: domain_filter.into(),
            keywords: DEFAULT_DISCOVERY_KEYWORDS
                .iter()
                .map(|k| (*k).to_string())
                .collect(),
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Replaces the keyword set. Empty keywords are dropped.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();
        self
    }

    /// Sets the pause inserted between seed page fetches.
    #[must_use]
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Returns the configured keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Fetches every seed and returns the union of candidates plus the seeds.
    ///
    /// A seed that cannot be fetched is logged and contributes nothing; it
    /// never aborts the pass.
    #[instrument(skip(self, seed_urls), fields(seeds = seed_urls.len(), domain = %self.domain_filter))]
    pub async fn discover(&self, seed_urls: &[String]) -> BTreeSet<String> {
        let mut links = BTreeSet::new();

        for (index, seed) in seed_urls.iter().enumerate() {
            if index > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            match self.scan_page(seed).await {
                Ok(found) => {
                    debug!(seed = %seed, candidates = found.len(), "scanned seed page");
                    links.extend(found);
                }
                Err(error) => {
                    warn!(seed = %seed, kind = error.kind(), error = %error, "failed to scan seed page");
                }
            }
        }

        links.extend(seed_urls.iter().cloned());
        info!(links = links.len(), "discovery complete");
        links
    }

    async fn scan_page(&self, seed: &str) -> Result<Vec<String>, FetchError> {
        let page_url = Url::parse(seed).map_err(|_| FetchError::invalid_url(seed))?;
        let response = self.session.get(seed).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(seed, e))?;

        let anchors = extract_anchors(&body);
        Ok(candidate_links(
            &page_url,
            &anchors,
            &self.domain_filter,
            &self.keywords,
        ))
    }
}

/// Selects the anchors of one page that are worth following.
///
/// An anchor qualifies when its absolute URL or its text contains any
/// keyword (case-insensitive) and its absolute URL contains `domain_filter`.
#[must_use]
pub fn candidate_links(
    page_url: &Url,
    anchors: &[Anchor],
    domain_filter: &str,
    keywords: &[String],
) -> Vec<String> {
    anchors
        .iter()
        .filter_map(|anchor| {
            let absolute = anchor.absolute_url(page_url)?.to_string();
            let mentions_keyword = keywords.iter().any(|keyword| {
                contains_ignore_case(&absolute, keyword) || contains_ignore_case(&anchor.text, keyword)
            });
            if mentions_keyword && absolute.contains(domain_filter) {
                debug!(url = %absolute, "found candidate link");
                Some(absolute)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn default_keywords() -> Vec<String> {
        DEFAULT_DISCOVERY_KEYWORDS
            .iter()
            .map(|k| (*k).to_string())
            .collect()
    }

    #[test]
    fn test_candidate_links_match_href_or_text() {
        let page = Url::parse("https://www.example.org/").unwrap();
        let anchors = vec![
            Anchor::new("/national-polling", "Polls"),
            Anchor::new("/page-42", "Key Findings 2024"),
            Anchor::new("/contact", "Contact us"),
        ];

        let links = candidate_links(&page, &anchors, "https://www.example.org", &default_keywords());
        assert_eq!(
            links,
            vec![
                "https://www.example.org/national-polling".to_string(),
                "https://www.example.org/page-42".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidate_links_apply_domain_filter() {
        let page = Url::parse("https://www.example.org/").unwrap();
        let anchors = vec![
            Anchor::new("https://twitter.com/share?research", "Share research"),
            Anchor::new("/research-briefs", "Briefs"),
        ];

        let links = candidate_links(&page, &anchors, "https://www.example.org", &default_keywords());
        assert_eq!(links, vec!["https://www.example.org/research-briefs".to_string()]);
    }

    #[test]
    fn test_candidate_links_keyword_match_is_case_insensitive() {
        let page = Url::parse("https://example.org/").unwrap();
        let anchors = vec![Anchor::new("/a", "ANNUAL REPORT")];
        let links = candidate_links(&page, &anchors, "example.org", &["report".to_string()]);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_with_keywords_drops_blank_entries() {
        let session = Session::new();
        let discovery = LinkDiscovery::new(&session, "example.org").with_keywords(["pdf", " ", ""]);
        assert_eq!(discovery.keywords(), &["pdf".to_string()]);
    }
}
