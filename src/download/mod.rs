//! PDF download: filename derivation and the streaming fetcher.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use harvester_core::download::PdfFetcher;
//! use harvester_core::session::Session;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new();
//! let fetcher = PdfFetcher::new(&session);
//! let outcome = fetcher
//!     .fetch("https://example.org/files/report.pdf", Path::new("./pdfs"))
//!     .await?;
//! println!("saved {}", outcome.file().path.display());
//! # Ok(())
//! # }
//! ```

mod fetcher;
mod filename;

pub use fetcher::{DEFAULT_DOWNLOAD_DELAY, DownloadedFile, FetchOutcome, PART_SUFFIX, PdfFetcher};
pub use filename::{FALLBACK_FILENAME, derive_pdf_filename};
