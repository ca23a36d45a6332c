//! Best-effort batch processing of article links.
//!
//! Every link moves through `Pending → Resolving → Resolved → Downloading →
//! {Done, Failed}` or ends as `Unresolved`. One link's failure never aborts
//! the batch; the only propagated error is failing to create the output
//! directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::download::{FetchOutcome, PdfFetcher};
use crate::resolver::PdfResolver;
use crate::session::Session;

/// Default pause between resolving a link and downloading its PDF.
pub const DEFAULT_LINK_DELAY: Duration = Duration::from_secs(1);

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Terminal state of one link in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// A file was written or already present with the right size.
    Done(FetchOutcome),
    /// Resolution found no verifiable PDF.
    Unresolved,
    /// The page itself could not be fetched.
    PageFailed {
        /// Error kind label.
        kind: &'static str,
        /// Rendered error.
        message: String,
    },
    /// A PDF URL was resolved but the download failed.
    DownloadFailed {
        /// The PDF URL that failed.
        pdf_url: String,
        /// Error kind label.
        kind: &'static str,
        /// Rendered error.
        message: String,
    },
}

/// Per-link results of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// `(link, terminal state)` pairs.
    pub links: Vec<(String, LinkState)>,
}

impl HarvestReport {
    /// Paths of every link that produced a file, in input order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.links
            .iter()
            .filter_map(|(_, state)| match state {
                LinkState::Done(outcome) => Some(outcome.file().path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of files transferred in this run.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.count(|s| matches!(s, LinkState::Done(FetchOutcome::Downloaded(_))))
    }

    /// Number of files skipped as already complete.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, LinkState::Done(FetchOutcome::Skipped(_))))
    }

    /// Number of links with no verifiable PDF.
    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.count(|s| matches!(s, LinkState::Unresolved))
    }

    /// Number of links whose page could not be fetched.
    #[must_use]
    pub fn page_failures(&self) -> usize {
        self.count(|s| matches!(s, LinkState::PageFailed { .. }))
    }

    /// Number of resolved PDFs that failed to download.
    #[must_use]
    pub fn download_failures(&self) -> usize {
        self.count(|s| matches!(s, LinkState::DownloadFailed { .. }))
    }

    fn count(&self, predicate: impl Fn(&LinkState) -> bool) -> usize {
        self.links.iter().filter(|(_, state)| predicate(state)).count()
    }
}

/// Resolves and downloads links sequentially over one session.
#[derive(Debug, Clone)]
pub struct Harvester<'a> {
    resolver: PdfResolver<'a>,
    fetcher: PdfFetcher<'a>,
    link_delay: Duration,
}

impl<'a> Harvester<'a> {
    /// Creates a harvester with default delays and no progress bars.
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self {
            resolver: PdfResolver::new(session),
            fetcher: PdfFetcher::new(session),
            link_delay: DEFAULT_LINK_DELAY,
        }
    }

    /// Replaces the fetcher, e.g. to change its delay or progress display.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: PdfFetcher<'a>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Sets the pause between resolution and download of each link.
    #[must_use]
    pub fn with_link_delay(mut self, link_delay: Duration) -> Self {
        self.link_delay = link_delay;
        self
    }

    /// Processes `links` and returns the paths of the files they produced.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::OutputDir`] if `output_dir` cannot be created.
    pub async fn process_links(
        &self,
        links: &[String],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, HarvestError> {
        Ok(self
            .process_links_with_report(links, output_dir)
            .await?
            .paths())
    }

    /// Processes `links` and returns the terminal state of every link.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::OutputDir`] if `output_dir` cannot be created.
    #[instrument(skip(self, links), fields(links = links.len(), output_dir = %output_dir.display()))]
    pub async fn process_links_with_report(
        &self,
        links: &[String],
        output_dir: &Path,
    ) -> Result<HarvestReport, HarvestError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| HarvestError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let mut report = HarvestReport::default();
        for (index, link) in links.iter().enumerate() {
            info!(index = index + 1, total = links.len(), link = %link, "processing link");
            let state = self.process_link(link, output_dir).await;
            report.links.push((link.clone(), state));
        }

        info!(
            downloaded = report.downloaded(),
            skipped = report.skipped(),
            unresolved = report.unresolved(),
            page_failures = report.page_failures(),
            download_failures = report.download_failures(),
            "batch complete"
        );
        Ok(report)
    }

    async fn process_link(&self, link: &str, output_dir: &Path) -> LinkState {
        let pdf_url = match self.resolver.resolve_pdf_url(link).await {
            Ok(Some(pdf_url)) => pdf_url,
            Ok(None) => {
                info!(link, "no PDF found, skipping");
                return LinkState::Unresolved;
            }
            Err(error) => {
                warn!(link, kind = error.kind(), error = %error, "error fetching page");
                return LinkState::PageFailed {
                    kind: error.kind(),
                    message: error.to_string(),
                };
            }
        };

        if !self.link_delay.is_zero() {
            tokio::time::sleep(self.link_delay).await;
        }

        match self.fetcher.fetch(&pdf_url, output_dir).await {
            Ok(outcome) => LinkState::Done(outcome),
            Err(error) => {
                warn!(pdf_url = %pdf_url, kind = error.kind(), error = %error, "error downloading PDF");
                LinkState::DownloadFailed {
                    pdf_url,
                    kind: error.kind(),
                    message: error.to_string(),
                }
            }
        }
    }
}
