//! arXiv Atom API client.

use std::sync::LazyLock;

use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{Article, CatalogError};
use crate::session::{FetchError, Session};

/// Public arXiv query endpoint.
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Base URL PDF links are built from.
pub const ARXIV_PDF_BASE_URL: &str = "https://arxiv.org/pdf";

/// Recent AI/ML/NLP/speech/statistical-ML submissions.
pub const DEFAULT_ARXIV_QUERY: &str =
    "(cat:cs.AI OR cat:cs.LG OR cat:cs.CL OR cat:eess.AS OR cat:stat.ML)";

/// Default number of entries requested from arXiv.
pub const DEFAULT_MAX_RESULTS: u32 = 50;

/// New-style (`2401.01234v2`) and old-style (`hep-th/9901001`) identifiers.
static ARXIV_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{4}\.\d{4,5}|[a-z][a-z\-]*(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?$")
        .unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    #[serde(default)]
    published: String,
}

/// Searches arXiv for recently updated papers.
#[derive(Debug, Clone)]
pub struct ArxivClient<'a> {
    session: &'a Session,
    api_url: String,
    pdf_base_url: String,
}

impl<'a> ArxivClient<'a> {
    /// Creates a client against the public arXiv endpoints.
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            api_url: ARXIV_API_URL.to_string(),
            pdf_base_url: ARXIV_PDF_BASE_URL.to_string(),
        }
    }

    /// Overrides the query endpoint.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Overrides the base that PDF URLs are built from.
    #[must_use]
    pub fn with_pdf_base_url(mut self, pdf_base_url: impl Into<String>) -> Self {
        self.pdf_base_url = pdf_base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the newest `max_results` entries for `query`, sorted by last update.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn search_recent(&self, query: &str, max_results: u32) -> Vec<Article> {
        match self.try_search_recent(query, max_results).await {
            Ok(articles) => articles,
            Err(error) => {
                warn!(error = %error, "error searching arXiv");
                Vec::new()
            }
        }
    }

    /// Like [`search_recent`](Self::search_recent) but reports failures.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the request fails and
    /// [`CatalogError::Parse`] if the feed is not valid Atom.
    #[instrument(skip(self), fields(api_url = %self.api_url))]
    pub async fn try_search_recent(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<Article>, CatalogError> {
        let max_results = max_results.to_string();
        let url = Url::parse_with_params(
            &self.api_url,
            [
                ("search_query", query),
                ("sortBy", "lastUpdatedDate"),
                ("sortOrder", "descending"),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ],
        )
        .map_err(|_| FetchError::invalid_url(&self.api_url))?;

        let response = self.session.get(url.as_str()).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let articles = self.parse_feed(&body)?;
        info!(count = articles.len(), "found articles from arXiv");
        Ok(articles)
    }

    /// Converts an Atom feed into articles, skipping entries without an arXiv id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] if the document cannot be deserialized.
    pub fn parse_feed(&self, xml: &str) -> Result<Vec<Article>, CatalogError> {
        let feed: Feed = from_str(xml).map_err(|e| CatalogError::parse(format!("arXiv feed: {e}")))?;

        let articles = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let Some(arxiv_id) = arxiv_id_from_entry_id(&entry.id) else {
                    warn!(entry_id = %entry.id, "skipping entry without arXiv id");
                    return None;
                };
                let title = collapse_whitespace(&entry.title);
                debug!(arxiv_id, title = %title, "found article");
                Some(Article {
                    title,
                    url: format!("{}/{arxiv_id}.pdf", self.pdf_base_url),
                    published: entry.published.trim().to_string(),
                    citations: 0,
                })
            })
            .collect();

        Ok(articles)
    }
}

/// Extracts the identifier after `abs/` in an Atom entry id.
///
/// ```
/// use harvester_core::catalog::arxiv_id_from_entry_id;
///
/// assert_eq!(
///     arxiv_id_from_entry_id("http://arxiv.org/abs/2401.01234v2"),
///     Some("2401.01234v2")
/// );
/// assert_eq!(arxiv_id_from_entry_id("http://arxiv.org/api/errors#x"), None);
/// ```
#[must_use]
pub fn arxiv_id_from_entry_id(entry_id: &str) -> Option<&str> {
    let candidate = entry_id.trim().rsplit("abs/").next()?;
    ARXIV_ID_PATTERN.is_match(candidate).then_some(candidate)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
