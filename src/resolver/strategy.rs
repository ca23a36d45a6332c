//! Ordered link-matching heuristics.

use crate::page::{Anchor, contains_ignore_case};

/// Terms that qualify an anchor by its visible text.
pub const TEXT_TERMS: &[&str] = &["report", "download", "pdf"];

/// A predicate over a parsed anchor.
///
/// Strategies are tried in priority order; earlier variants express stronger
/// evidence that the link points at a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    /// `href` contains `pdf`.
    HrefMentionsPdf,
    /// `href` contains `download`.
    HrefMentionsDownload,
    /// `href` contains `report`.
    HrefMentionsReport,
    /// Visible text contains one of [`TEXT_TERMS`].
    TextMentionsDocument,
}

impl LinkStrategy {
    /// Priority order used by [`PdfResolver`](super::PdfResolver).
    pub const DEFAULT_ORDER: [Self; 4] = [
        Self::HrefMentionsPdf,
        Self::HrefMentionsDownload,
        Self::HrefMentionsReport,
        Self::TextMentionsDocument,
    ];

    /// Stable name for logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HrefMentionsPdf => "href_pdf",
            Self::HrefMentionsDownload => "href_download",
            Self::HrefMentionsReport => "href_report",
            Self::TextMentionsDocument => "text_terms",
        }
    }

    /// Returns true if `anchor` satisfies this strategy (case-insensitive).
    #[must_use]
    pub fn matches(self, anchor: &Anchor) -> bool {
        match self {
            Self::HrefMentionsPdf => contains_ignore_case(&anchor.href, "pdf"),
            Self::HrefMentionsDownload => contains_ignore_case(&anchor.href, "download"),
            Self::HrefMentionsReport => contains_ignore_case(&anchor.href, "report"),
            Self::TextMentionsDocument => TEXT_TERMS
                .iter()
                .any(|term| contains_ignore_case(&anchor.text, term)),
        }
    }
}
