//! Streaming PDF download with skip-if-complete semantics.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Response;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::filename::derive_pdf_filename;
use crate::session::{FetchError, Session, header_content_length, header_str};

/// Default pause after each completed transfer.
pub const DEFAULT_DOWNLOAD_DELAY: Duration = Duration::from_millis(500);

/// Suffix of the temporary file a transfer is written to before rename.
pub const PART_SUFFIX: &str = ".part";

/// A PDF present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Final location inside the output directory.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub bytes: u64,
}

/// What [`PdfFetcher::fetch`] did for a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was transferred and written.
    Downloaded(DownloadedFile),
    /// A file with the server-reported size already existed; nothing was transferred.
    Skipped(DownloadedFile),
}

impl FetchOutcome {
    /// The file this outcome refers to.
    #[must_use]
    pub fn file(&self) -> &DownloadedFile {
        match self {
            Self::Downloaded(file) | Self::Skipped(file) => file,
        }
    }

    /// Consumes the outcome and returns the file path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        match self {
            Self::Downloaded(file) | Self::Skipped(file) => file.path,
        }
    }

    /// Returns true when no bytes were transferred.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Downloads verified PDF URLs into a directory.
#[derive(Debug, Clone)]
pub struct PdfFetcher<'a> {
    session: &'a Session,
    download_delay: Duration,
    show_progress: bool,
}

impl<'a> PdfFetcher<'a> {
    /// Creates a fetcher with the default post-download delay and no progress bar.
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            download_delay: DEFAULT_DOWNLOAD_DELAY,
            show_progress: false,
        }
    }

    /// Sets the pause inserted after each completed transfer.
    #[must_use]
    pub fn with_download_delay(mut self, download_delay: Duration) -> Self {
        self.download_delay = download_delay;
        self
    }

    /// Enables or disables the per-file progress bar on stderr.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Downloads `pdf_url` into `output_dir`.
    ///
    /// A HEAD request supplies the filename inputs and the expected size. When
    /// a file of exactly that size already exists the transfer is skipped. A
    /// missing `content-length` always leads to a fresh download.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the HEAD or GET request fails, the body
    /// cannot be written, or the written size disagrees with the GET
    /// `content-length`. No partial file is left behind on error.
    #[instrument(skip(self, output_dir), fields(pdf_url = %pdf_url))]
    pub async fn fetch(&self, pdf_url: &str, output_dir: &Path) -> Result<FetchOutcome, FetchError> {
        let head = self.session.head(pdf_url).await?;
        let content_disposition = header_str(head.headers(), &CONTENT_DISPOSITION);
        let filename = derive_pdf_filename(pdf_url, content_disposition);
        let expected_bytes = header_content_length(&head);
        drop(head);

        let target = output_dir.join(&filename);
        debug!(path = %target.display(), expected_bytes, "resolved target path");

        if let Some(existing) = existing_size(&target).await {
            match expected_bytes {
                Some(expected) if expected == existing => {
                    info!(filename = %filename, bytes = existing, "skipping, already exists with correct size");
                    return Ok(FetchOutcome::Skipped(DownloadedFile {
                        path: target,
                        bytes: existing,
                    }));
                }
                Some(expected) => {
                    info!(filename = %filename, existing, expected, "re-downloading, size mismatch");
                }
                None => {
                    info!(filename = %filename, existing, "re-downloading, server reports no size");
                }
            }
        }

        let response = self.session.get(pdf_url).await?;
        let bytes = self
            .write_atomically(response, pdf_url, &filename, &target)
            .await?;

        info!(filename = %filename, bytes, "successfully downloaded");
        if !self.download_delay.is_zero() {
            tokio::time::sleep(self.download_delay).await;
        }

        Ok(FetchOutcome::Downloaded(DownloadedFile {
            path: target,
            bytes,
        }))
    }

    async fn write_atomically(
        &self,
        response: Response,
        url: &str,
        filename: &str,
        target: &Path,
    ) -> Result<u64, FetchError> {
        let part_path = part_path_for(target);
        let expected = header_content_length(&response);
        let progress = self.progress_bar(filename, expected);

        let result = stream_to_file(response, url, &part_path, &progress).await;
        progress.finish_and_clear();

        let written = match result {
            Ok(written) => written,
            Err(error) => {
                debug!(path = %part_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(error);
            }
        };

        if let Some(expected) = expected
            && expected != written
        {
            warn!(filename, expected, written, "size mismatch after transfer");
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(FetchError::integrity(target, expected, written));
        }

        if let Err(e) = tokio::fs::rename(&part_path, target).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(FetchError::io(target, e));
        }

        Ok(written)
    }

    fn progress_bar(&self, filename: &str, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::no_length(),
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar.set_message(filename.to_string());
        bar
    }
}

/// Streams the response body into `path`, returning the bytes written.
async fn stream_to_file(
    response: Response,
    url: &str,
    path: &Path,
    progress: &ProgressBar,
) -> Result<u64, FetchError> {
    let file = File::create(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(path, e))?;

        bytes_written += chunk.len() as u64;
        progress.inc(chunk.len() as u64);
    }

    writer.flush().await.map_err(|e| FetchError::io(path, e))?;

    Ok(bytes_written)
}

async fn existing_size(path: &Path) -> Option<u64> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.is_file().then(|| metadata.len())
}

fn part_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(PART_SUFFIX);
    target.with_file_name(name)
}
