//! Resolution of article pages to verified PDF URLs.
//!
//! A page is fetched once and its anchors are matched against an ordered list
//! of [`LinkStrategy`] predicates. The first strategy with matches has its
//! candidates probed in document order with a single HEAD request each; the
//! first candidate whose `content-type` mentions `pdf` wins.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::resolver::PdfResolver;
//! use harvester_core::session::Session;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new();
//! let resolver = PdfResolver::new(&session);
//! if let Some(pdf_url) = resolver.resolve_pdf_url("https://example.org/briefs/42").await? {
//!     println!("PDF at {pdf_url}");
//! }
//! # Ok(())
//! # }
//! ```

mod strategy;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::page::extract_anchors;
use crate::session::{FetchError, Session, is_pdf_response};

pub use strategy::{LinkStrategy, TEXT_TERMS};

/// Turns article page URLs into verified PDF URLs.
#[derive(Debug, Clone)]
pub struct PdfResolver<'a> {
    session: &'a Session,
    strategies: Vec<LinkStrategy>,
}

impl<'a> PdfResolver<'a> {
    /// Creates a resolver using [`LinkStrategy::DEFAULT_ORDER`].
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            strategies: LinkStrategy::DEFAULT_ORDER.to_vec(),
        }
    }

    /// Finds a PDF linked from `page_url`.
    ///
    /// Returns `Ok(None)` when the page has no anchor that verifies as a PDF.
    /// If the page itself is served as a PDF, its own URL is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] only when the page itself cannot be fetched
    /// (after the session's retries). Probe failures are logged and skipped.
    #[instrument(skip(self), fields(page_url = %page_url))]
    pub async fn resolve_pdf_url(&self, page_url: &str) -> Result<Option<String>, FetchError> {
        let base = Url::parse(page_url).map_err(|_| FetchError::invalid_url(page_url))?;
        let response = self.session.get(page_url).await?;

        if is_pdf_response(&response) {
            info!("page is served as a PDF");
            return Ok(Some(page_url.to_string()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(page_url, e))?;
        let anchors = extract_anchors(&body);
        debug!(anchors = anchors.len(), "parsed page anchors");

        for strategy in &self.strategies {
            let matches: Vec<_> = anchors.iter().filter(|a| strategy.matches(a)).collect();
            if matches.is_empty() {
                continue;
            }
            debug!(strategy = strategy.name(), candidates = matches.len(), "strategy matched");

            for anchor in matches {
                let Some(candidate) = anchor.absolute_url(&base) else {
                    continue;
                };
                info!(candidate = %candidate, strategy = strategy.name(), "found potential PDF link");
                if self.verify_pdf(candidate.as_str()).await {
                    info!(pdf_url = %candidate, "resolved PDF link");
                    return Ok(Some(candidate.to_string()));
                }
            }
        }

        warn!("no PDF link found");
        Ok(None)
    }

    async fn verify_pdf(&self, candidate: &str) -> bool {
        match self.session.probe(candidate).await {
            Ok(response) => {
                let verified = is_pdf_response(&response);
                if !verified {
                    debug!(candidate, "candidate is not served as a PDF");
                }
                verified
            }
            Err(error) => {
                warn!(candidate, kind = error.kind(), error = %error, "error checking PDF link");
                false
            }
        }
    }
}
