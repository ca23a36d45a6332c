//! Integration tests for the PDF fetcher.
//!
//! These tests verify skip/re-download decisions and on-disk naming against
//! mock HTTP servers.

use std::path::Path;
use std::time::Duration;

use harvester_core::download::{FetchOutcome, PdfFetcher};
use harvester_core::{FetchError, RetryPolicy, Session, SessionConfig};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::{bind_local_listener_or_skip, start_mock_server_or_skip};

fn test_session() -> Session {
    Session::with_config(SessionConfig {
        retry_policy: RetryPolicy::new(2, Duration::ZERO, Duration::ZERO, 2.0),
        ..SessionConfig::default()
    })
    .expect("session should build")
}

async fn mount_head(server: &MockServer, route: &str, content_length: Option<usize>, disposition: Option<&str>) {
    let mut template = ResponseTemplate::new(200).insert_header("content-type", "application/pdf");
    if let Some(len) = content_length {
        template = template.insert_header("content-length", len.to_string().as_str());
    }
    if let Some(value) = disposition {
        template = template.insert_header("content-disposition", value);
    }
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn fetch(server: &MockServer, route: &str, dir: &Path) -> Result<FetchOutcome, FetchError> {
    let session = test_session();
    PdfFetcher::new(&session)
        .with_download_delay(Duration::ZERO)
        .fetch(&format!("{}{route}", server.uri()), dir)
        .await
}

#[tokio::test]
async fn test_existing_file_with_matching_size_is_skipped_without_get() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let existing = temp_dir.path().join("report.pdf");
    std::fs::write(&existing, b"%PDF-existing").expect("seed existing file");

    mount_head(&mock_server, "/files/report.pdf", Some(13), None).await;
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-different".to_vec()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let outcome = fetch(&mock_server, "/files/report.pdf", temp_dir.path())
        .await
        .expect("fetch should succeed");

    assert!(outcome.is_skipped(), "expected skip, got {outcome:?}");
    assert_eq!(outcome.file().path, existing);
    assert_eq!(outcome.file().bytes, 13);
    assert_eq!(std::fs::read(&existing).expect("read"), b"%PDF-existing");
}

#[tokio::test]
async fn test_size_mismatch_triggers_full_redownload() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let existing = temp_dir.path().join("study.pdf");
    std::fs::write(&existing, b"trunc").expect("seed truncated file");

    let body = b"%PDF-1.7 complete study body".to_vec();
    mount_head(&mock_server, "/study.pdf", Some(body.len()), None).await;
    Mock::given(method("GET"))
        .and(path("/study.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = fetch(&mock_server, "/study.pdf", temp_dir.path())
        .await
        .expect("fetch should succeed");

    assert!(matches!(outcome, FetchOutcome::Downloaded(_)));
    assert_eq!(outcome.file().bytes, body.len() as u64);
    let on_disk = std::fs::read(&existing).expect("read");
    assert_eq!(on_disk.len(), body.len());
    assert_eq!(on_disk, body);
}

#[tokio::test]
async fn test_missing_content_length_always_redownloads() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    std::fs::write(temp_dir.path().join("brief.pdf"), b"12345").expect("seed file");

    mount_head(&mock_server, "/brief.pdf", None, None).await;
    Mock::given(method("GET"))
        .and(path("/brief.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"12345".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = fetch(&mock_server, "/brief.pdf", temp_dir.path())
        .await
        .expect("fetch should succeed");
    assert!(!outcome.is_skipped());
}

#[tokio::test]
async fn test_query_string_is_stripped_and_pdf_suffix_appended() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let body = b"%PDF-php".to_vec();

    mount_head(&mock_server, "/file.php", Some(body.len()), None).await;
    Mock::given(method("GET"))
        .and(path("/file.php"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&mock_server)
        .await;

    let outcome = fetch(&mock_server, "/file.php?token=abc", temp_dir.path())
        .await
        .expect("fetch should succeed");
    assert_eq!(outcome.file().path, temp_dir.path().join("file.php.pdf"));
    assert!(outcome.file().path.exists());
}

#[tokio::test]
async fn test_content_disposition_names_the_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let body = b"%PDF-cd".to_vec();

    mount_head(
        &mock_server,
        "/download",
        Some(body.len()),
        Some("attachment; filename=\"report.pdf\""),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&mock_server)
        .await;

    let outcome = fetch(&mock_server, "/download", temp_dir.path())
        .await
        .expect("fetch should succeed");
    assert_eq!(outcome.file().path, temp_dir.path().join("report.pdf"));
}

#[tokio::test]
async fn test_head_is_retried_on_503() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let body = b"%PDF-retry".to_vec();

    Mock::given(method("HEAD"))
        .and(path("/busy.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_head(&mock_server, "/busy.pdf", Some(body.len()), None).await;
    Mock::given(method("GET"))
        .and(path("/busy.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&mock_server)
        .await;

    let outcome = fetch(&mock_server, "/busy.pdf", temp_dir.path())
        .await
        .expect("fetch should succeed after retry");
    assert!(!outcome.is_skipped());
}

#[tokio::test]
async fn test_failed_redownload_keeps_no_part_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    mount_head(&mock_server, "/broken.pdf", Some(100), None).await;
    Mock::given(method("GET"))
        .and(path("/broken.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let result = fetch(&mock_server, "/broken.pdf", temp_dir.path()).await;
    assert!(matches!(
        result,
        Err(FetchError::HttpStatus { status: 500, .. })
    ));

    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .collect();
    assert!(leftovers.is_empty(), "found: {leftovers:?}");
}

/// Serves a PDF that announces 100 bytes but closes after sending 10.
async fn serve_truncated_pdf(listener: TcpListener) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(async move {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let headers = "HTTP/1.1 200 OK\r\ncontent-type: application/pdf\r\n\
                           content-length: 100\r\nconnection: close\r\n\r\n";
            let _ = stream.write_all(headers.as_bytes()).await;
            if request.starts_with(b"GET") {
                let _ = stream.write_all(b"%PDF-trunc").await;
            }
            let _ = stream.shutdown().await;
        });
    }
}

#[tokio::test]
async fn test_interrupted_transfer_keeps_existing_file_and_no_part_file() {
    let Some(listener) = bind_local_listener_or_skip().await else {
        return;
    };
    let origin = format!("http://{}", listener.local_addr().expect("local addr"));
    tokio::spawn(serve_truncated_pdf(listener));

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let existing = temp_dir.path().join("doc.pdf");
    std::fs::write(&existing, b"old-complete-but-wrong-size").expect("seed existing file");

    let session = test_session();
    let result = PdfFetcher::new(&session)
        .with_download_delay(Duration::ZERO)
        .fetch(&format!("{origin}/doc.pdf"), temp_dir.path())
        .await;

    assert!(
        matches!(result, Err(FetchError::Network { .. })),
        "expected network error, got {result:?}"
    );
    let names: Vec<String> = std::fs::read_dir(temp_dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["doc.pdf"]);
    assert_eq!(
        std::fs::read(&existing).expect("read"),
        b"old-complete-but-wrong-size"
    );
}
