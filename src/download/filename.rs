//! Target filename derivation for downloaded PDFs.

use url::Url;

/// Used when neither the header nor the URL yields a usable name.
pub const FALLBACK_FILENAME: &str = "download.pdf";

/// Derives the on-disk filename for `pdf_url`.
///
/// The `Content-Disposition` filename wins when present; otherwise the last
/// URL path segment is used. Any query string is dropped, and `.pdf` is
/// appended unless the name already ends with it (case-insensitive).
///
/// ```
/// use harvester_core::download::derive_pdf_filename;
///
/// assert_eq!(derive_pdf_filename("https://x.org/file.php?token=abc", None), "file.php.pdf");
/// assert_eq!(
///     derive_pdf_filename("https://x.org/file.php", Some("attachment; filename=\"report.pdf\"")),
///     "report.pdf"
/// );
/// ```
#[must_use]
pub fn derive_pdf_filename(pdf_url: &str, content_disposition: Option<&str>) -> String {
    let raw = content_disposition
        .and_then(parse_content_disposition)
        .or_else(|| last_path_segment(pdf_url))
        .unwrap_or_default();

    let without_query = raw.split('?').next().unwrap_or_default().trim();
    let name = sanitize_filename(without_query);
    if name.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{name}.pdf")
    }
}

fn last_path_segment(pdf_url: &str) -> Option<String> {
    match Url::parse(pdf_url) {
        Ok(parsed) => {
            let segment = parsed.path_segments()?.next_back()?;
            let decoded = urlencoding::decode(segment)
                .map_or_else(|_| segment.to_string(), std::borrow::Cow::into_owned);
            Some(decoded)
        }
        Err(_) => pdf_url.rsplit('/').next().map(str::to_string),
    }
}

/// Extracts the filename from a `Content-Disposition` header value.
///
/// Handles `filename*=UTF-8''...` (RFC 5987), quoted and unquoted `filename=`.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                let decoded = decoded.trim_matches(|c| c == '"' || c == '\'');
                if !decoded.is_empty() {
                    return Some(decoded.to_string());
                }
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim();
    let name = if let Some(stripped) = value.strip_prefix('"') {
        stripped.find('"').map_or(stripped, |end| &stripped[..end])
    } else {
        let end = value.find(';').unwrap_or(value.len());
        value[..end].trim().trim_matches('\'')
    };

    (!name.is_empty()).then(|| name.to_string())
}

/// Makes `name` safe as a single path component inside the output directory.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Separators are gone, so only `.`/`..`-style names could escape the directory.
    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        return String::new();
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_is_dropped_and_suffix_added() {
        assert_eq!(
            derive_pdf_filename("https://x.org/file.php?token=abc", None),
            "file.php.pdf"
        );
    }

    #[test]
    fn test_content_disposition_wins_over_url() {
        assert_eq!(
            derive_pdf_filename(
                "https://x.org/file.php?token=abc",
                Some("attachment; filename=\"report.pdf\"")
            ),
            "report.pdf"
        );
    }

    #[test]
    fn test_existing_pdf_suffix_is_case_insensitive() {
        assert_eq!(
            derive_pdf_filename("https://x.org/docs/Annual.PDF", None),
            "Annual.PDF"
        );
    }

    #[test]
    fn test_arxiv_style_url_gets_suffix() {
        assert_eq!(
            derive_pdf_filename("https://arxiv.org/pdf/2401.01234v2", None),
            "2401.01234v2.pdf"
        );
    }

    #[test]
    fn test_trailing_slash_falls_back() {
        assert_eq!(derive_pdf_filename("https://x.org/", None), FALLBACK_FILENAME);
        assert_eq!(derive_pdf_filename("https://x.org/reports/", None), FALLBACK_FILENAME);
    }

    #[test]
    fn test_percent_encoded_segment_is_decoded() {
        assert_eq!(
            derive_pdf_filename("https://x.org/files/Q3%20Poll.pdf", None),
            "Q3 Poll.pdf"
        );
    }

    #[test]
    fn test_parse_content_disposition_variants() {
        assert_eq!(
            parse_content_disposition("attachment; filename=study.pdf; size=10"),
            Some("study.pdf".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"),
            Some("résumé.pdf".to_string())
        );
        assert_eq!(
            parse_content_disposition("inline; filename='brief'"),
            Some("brief".to_string())
        );
        assert_eq!(parse_content_disposition("inline"), None);
    }

    #[test]
    fn test_header_path_traversal_is_neutralized() {
        let name = derive_pdf_filename(
            "https://x.org/a",
            Some("attachment; filename=\"../../etc/passwd\""),
        );
        assert!(!name.contains('/'), "got: {name}");
        assert!(name.ends_with(".pdf"));

        assert_eq!(
            derive_pdf_filename("https://x.org/a", Some("attachment; filename=\"..\"")),
            FALLBACK_FILENAME
        );
    }

    #[test]
    fn test_sanitize_filename_keeps_inner_dots() {
        assert_eq!(sanitize_filename("v1.2..final"), "v1.2..final");
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("./"), "");
        assert_eq!(sanitize_filename("._."), "");
    }
}
