//! Research-paper catalog: arXiv search ranked by citation count.
//!
//! [`update_catalog`] searches arXiv for recent papers, looks up each title on
//! Semantic Scholar, keeps the most cited ones, downloads their PDFs through a
//! [`Harvester`] and records the selection in `metadata.json`.

mod arxiv;
mod citations;
mod metadata;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::pipeline::{HarvestError, HarvestReport, Harvester};
use crate::session::FetchError;

pub use arxiv::{
    ARXIV_API_URL, ARXIV_PDF_BASE_URL, ArxivClient, DEFAULT_ARXIV_QUERY, DEFAULT_MAX_RESULTS,
    arxiv_id_from_entry_id,
};
pub use citations::{CitationClient, SEMANTIC_SCHOLAR_API_URL};
pub use metadata::{CatalogMetadata, METADATA_FILENAME};

/// Default number of articles kept after ranking.
pub const DEFAULT_TOP_N: usize = 20;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Paper title, whitespace collapsed.
    pub title: String,
    /// Direct PDF URL.
    pub url: String,
    /// Publication timestamp as reported by arXiv.
    pub published: String,
    /// Citation count at update time.
    pub citations: u64,
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An HTTP request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A response body could not be parsed.
    #[error("failed to parse {message}")]
    Parse {
        /// What failed to parse, and why.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The download batch could not start.
    #[error(transparent)]
    Harvest(#[from] HarvestError),
}

impl CatalogError {
    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Parameters of one catalog update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    /// arXiv `search_query` expression.
    pub query: String,
    /// Entries requested from arXiv.
    pub max_results: u32,
    /// Articles kept after ranking by citations.
    pub top_n: usize,
}

impl Default for CatalogRequest {
    fn default() -> Self {
        Self {
            query: DEFAULT_ARXIV_QUERY.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Result of [`update_catalog`].
#[derive(Debug, Clone)]
pub struct CatalogUpdate {
    /// The record that was written.
    pub metadata: CatalogMetadata,
    /// Where it was written.
    pub metadata_path: PathBuf,
    /// Per-article download results.
    pub report: HarvestReport,
}

/// Keeps the `top_n` most cited articles; ties keep their arXiv order.
#[must_use]
pub fn rank_by_citations(mut articles: Vec<Article>, top_n: usize) -> Vec<Article> {
    articles.sort_by(|a, b| b.citations.cmp(&a.citations));
    articles.truncate(top_n);
    articles
}

/// Runs a full catalog update into `output_dir`.
///
/// An unreachable arXiv yields an empty catalog; failed citation lookups
/// count as zero citations; failed downloads are reported, not fatal.
///
/// # Errors
///
/// Returns [`CatalogError::Harvest`] if `output_dir` cannot be created, or
/// [`CatalogError::Io`]/[`CatalogError::Json`] if `metadata.json` cannot be
/// written.
#[instrument(skip_all, fields(query = %request.query, top_n = request.top_n))]
pub async fn update_catalog(
    arxiv: &ArxivClient<'_>,
    citations: &CitationClient<'_>,
    harvester: &Harvester<'_>,
    request: &CatalogRequest,
    output_dir: &Path,
) -> Result<CatalogUpdate, CatalogError> {
    info!("starting catalog update");

    let mut articles = arxiv.search_recent(&request.query, request.max_results).await;
    for article in &mut articles {
        article.citations = citations.citation_count(&article.title).await;
    }

    let top = rank_by_citations(articles, request.top_n);
    let urls: Vec<String> = top.iter().map(|a| a.url.clone()).collect();
    let report = harvester.process_links_with_report(&urls, output_dir).await?;

    let metadata = CatalogMetadata::now(top);
    let metadata_path = metadata.write_to(output_dir).await?;
    info!(
        articles = metadata.articles.len(),
        path = %metadata_path.display(),
        "catalog updated"
    );

    Ok(CatalogUpdate {
        metadata,
        metadata_path,
        report,
    })
}
