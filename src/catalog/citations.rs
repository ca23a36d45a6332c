//! Semantic Scholar citation lookups.

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::CatalogError;
use crate::session::{FetchError, Session};

/// Semantic Scholar Graph API root.
pub const SEMANTIC_SCHOLAR_API_URL: &str = "https://api.semanticscholar.org/graph/v1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PaperHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperHit {
    #[serde(default)]
    citation_count: Option<u64>,
}

/// Looks up citation counts by paper title.
#[derive(Debug, Clone)]
pub struct CitationClient<'a> {
    session: &'a Session,
    api_url: String,
}

impl<'a> CitationClient<'a> {
    /// Creates a client against the public Semantic Scholar API.
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            api_url: SEMANTIC_SCHOLAR_API_URL.to_string(),
        }
    }

    /// Overrides the API root.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Citation count of the best title match, or 0 when the lookup fails
    /// or finds nothing.
    pub async fn citation_count(&self, title: &str) -> u64 {
        match self.try_citation_count(title).await {
            Ok(count) => count,
            Err(error) => {
                warn!(title, error = %error, "error getting citation data");
                0
            }
        }
    }

    /// Like [`citation_count`](Self::citation_count) but reports failures.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the request fails and
    /// [`CatalogError::Parse`] if the response is not the expected JSON.
    #[instrument(skip(self))]
    pub async fn try_citation_count(&self, title: &str) -> Result<u64, CatalogError> {
        let endpoint = format!("{}/paper/search", self.api_url);
        let url = Url::parse_with_params(
            &endpoint,
            [
                ("query", title),
                ("fields", "citationCount,title"),
                ("limit", "1"),
            ],
        )
        .map_err(|_| FetchError::invalid_url(&endpoint))?;

        let response = self.session.get(url.as_str()).await?;
        let parsed = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| CatalogError::parse(format!("citation search response: {e}")))?;

        let count = parsed
            .data
            .first()
            .and_then(|hit| hit.citation_count)
            .unwrap_or(0);
        debug!(count, "citation count");
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_tolerates_null_and_missing() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"total":1,"data":[{"paperId":"x","title":"T","citationCount":null}]}"#)
                .unwrap();
        assert_eq!(parsed.data[0].citation_count, None);

        let empty: SearchResponse = serde_json::from_str(r#"{"total":0,"offset":0}"#).unwrap();
        assert!(empty.data.is_empty());
    }
}
