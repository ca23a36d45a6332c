//! PDF Harvester Core Library
//!
//! This library turns seed web pages into a local collection of report PDFs:
//! candidate links are discovered on the seeds, each link is resolved to a
//! verified PDF URL, and the PDF is downloaded with skip-if-complete
//! semantics.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`session`] - Shared HTTP session with the transport retry policy
//! - [`page`] - HTML anchor extraction
//! - [`discovery`] - Keyword/domain link discovery over seed pages
//! - [`resolver`] - Ordered link strategies and PDF verification
//! - [`download`] - Filename derivation and streaming download
//! - [`pipeline`] - Best-effort batch processing
//! - [`catalog`] - arXiv search ranked by citation count

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod discovery;
pub mod download;
pub mod page;
pub mod pipeline;
pub mod resolver;
pub mod session;
pub mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use discovery::{DEFAULT_DISCOVERY_KEYWORDS, LinkDiscovery};
pub use download::{DownloadedFile, FetchOutcome, PdfFetcher, derive_pdf_filename};
pub use page::Anchor;
pub use pipeline::{HarvestError, HarvestReport, Harvester, LinkState};
pub use resolver::{LinkStrategy, PdfResolver};
pub use session::{
    DEFAULT_MAX_RETRIES, FailureType, FetchError, RetryDecision, RetryPolicy, Session,
    SessionConfig, classify_error,
};
