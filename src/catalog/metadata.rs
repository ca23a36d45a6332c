//! `metadata.json` written next to the catalog PDFs.

use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use super::{Article, CatalogError};

/// File name of the catalog record inside the output directory.
pub const METADATA_FILENAME: &str = "metadata.json";

/// The persisted catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    /// RFC 3339 timestamp of the update.
    pub last_updated: String,
    /// Selected articles, most cited first.
    pub articles: Vec<Article>,
}

impl CatalogMetadata {
    /// Stamps `articles` with the current local time.
    #[must_use]
    pub fn now(articles: Vec<Article>) -> Self {
        Self {
            last_updated: Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            articles,
        }
    }

    /// Writes the record as pretty JSON into `dir`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] or [`CatalogError::Io`].
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf, CatalogError> {
        let path = dir.join(METADATA_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Reads a record previously written by [`write_to`](Self::write_to).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] or [`CatalogError::Json`].
    pub async fn read_from(dir: &Path) -> Result<Self, CatalogError> {
        let path = dir.join(METADATA_FILENAME);
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|source| CatalogError::Io { path, source })?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
