//! Shared HTTP session with a transport-level retry policy.
//!
//! A [`Session`] is built once per run and passed by reference into discovery,
//! resolution, fetching and the catalog clients. It owns the pooled
//! `reqwest::Client` and the [`RetryPolicy`] applied to every GET and HEAD.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::session::Session;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new();
//! let response = session.get("https://example.com/reports").await?;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```

mod constants;
mod error;
mod retry;

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, RETRY_AFTER};
use reqwest::{Client, Method, Response};
use tracing::{debug, info, instrument};
use url::Url;

use crate::user_agent;

pub use constants::{CONNECT_TIMEOUT_SECS, MAX_RETRY_AFTER, READ_TIMEOUT_SECS};
pub use error::FetchError;
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    parse_retry_after, retry_after_delay,
};

/// Construction options for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Retry policy applied to GET and HEAD requests.
    pub retry_policy: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            user_agent: user_agent::default_user_agent(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// HTTP session reused across every request of a run.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    retry_policy: RetryPolicy,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session with default timeouts, User-Agent and retry policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static default
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a session from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest::Error` if the client cannot be built
    /// (e.g. the TLS backend fails to initialize).
    #[instrument(level = "debug", skip(config), fields(user_agent = %config.user_agent))]
    pub fn with_config(config: SessionConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .gzip(true)
            .user_agent(config.user_agent)
            .build()?;

        debug!(
            max_retries = config.retry_policy.max_retries(),
            connect_timeout_secs = config.connect_timeout_secs,
            read_timeout_secs = config.read_timeout_secs,
            "session created"
        );

        Ok(Self {
            client,
            retry_policy: config.retry_policy,
        })
    }

    /// Returns the retry policy applied to [`get`](Self::get) and [`head`](Self::head).
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Sends a GET request, retrying transient failures.
    ///
    /// The body is not read; callers stream or buffer it as needed.
    ///
    /// # Errors
    ///
    /// Returns the last [`FetchError`] once the request fails permanently or
    /// retries are exhausted. Non-2xx responses are errors.
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        self.send_with_retry(Method::GET, url, &self.retry_policy)
            .await
    }

    /// Sends a HEAD request (redirects followed), retrying transient failures.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn head(&self, url: &str) -> Result<Response, FetchError> {
        self.send_with_retry(Method::HEAD, url, &self.retry_policy)
            .await
    }

    /// Sends a single HEAD request with no retries.
    ///
    /// Used to verify candidate links, where a failing candidate is simply
    /// skipped.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), without the retry loop.
    pub async fn probe(&self, url: &str) -> Result<Response, FetchError> {
        self.send_with_retry(Method::HEAD, url, &RetryPolicy::no_retry())
            .await
    }

    #[instrument(level = "debug", skip(self, policy), fields(method = %method, url = %url))]
    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<Response, FetchError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "sending request");

            let error = match self.send_once(method.clone(), url).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            match policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay: backoff_delay,
                    attempt: next_attempt,
                } => {
                    let server_delay = retry_after_delay(&error);
                    let delay = server_delay.unwrap_or(backoff_delay);
                    info!(
                        url = %url,
                        attempt = next_attempt,
                        max_retries = policy.max_retries(),
                        delay_ms = delay.as_millis(),
                        using_retry_after = server_delay.is_some(),
                        error = %error,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, attempts = attempt, %reason, "not retrying request");
                    return Err(error);
                }
            }
        }
    }

    async fn send_once(&self, method: Method, url: &str) -> Result<Response, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        let response = self
            .client
            .request(method, parsed)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::timeout(url)
                } else {
                    FetchError::network(url, e)
                }
            })?;

        if !response.status().is_success() {
            let retry_after = header_str(response.headers(), &RETRY_AFTER).map(str::to_string);
            return Err(FetchError::http_status_with_retry_after(
                url,
                response.status().as_u16(),
                retry_after,
            ));
        }

        Ok(response)
    }
}

/// Returns a header value as `&str` when present and valid ASCII.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Returns the `content-type` header of a response, if any.
#[must_use]
pub fn content_type(response: &Response) -> Option<&str> {
    header_str(response.headers(), &CONTENT_TYPE)
}

/// Returns true if the response's `content-type` mentions `pdf` (case-insensitive).
#[must_use]
pub fn is_pdf_response(response: &Response) -> bool {
    content_type(response).is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"))
}

/// Returns the `content-length` header parsed as bytes.
///
/// Reads the raw header instead of `Response::content_length`, which reports
/// the body size hint (zero for HEAD responses).
#[must_use]
pub fn header_content_length(response: &Response) -> Option<u64> {
    header_str(response.headers(), &CONTENT_LENGTH).and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn fast_session(max_retries: u32) -> Session {
        Session::with_config(SessionConfig {
            retry_policy: RetryPolicy::new(max_retries, Duration::ZERO, Duration::ZERO, 2.0),
            ..SessionConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_retries_transient_status_then_succeeds() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = fast_session(5);
        let response = session
            .get(&format!("{}/flaky", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_get_gives_up_after_max_retries() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(502))
            .expect(4)
            .mount(&mock_server)
            .await;

        let session = fast_session(3);
        let result = session.get(&format!("{}/down", mock_server.uri())).await;
        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_does_not_retry_404() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = fast_session(5);
        let result = session.get(&format!("{}/missing", mock_server.uri())).await;
        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_never_retries() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("HEAD"))
            .and(path("/busy.pdf"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = fast_session(5);
        let result = session
            .probe(&format!("{}/busy.pdf", mock_server.uri()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_head_exposes_pdf_headers() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("HEAD"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .insert_header("content-length", "1234"),
            )
            .mount(&mock_server)
            .await;

        let session = fast_session(0);
        let response = session
            .head(&format!("{}/doc.pdf", mock_server.uri()))
            .await
            .unwrap();
        assert!(is_pdf_response(&response));
        assert_eq!(header_content_length(&response), Some(1234));
    }

    #[tokio::test]
    async fn test_invalid_url_and_scheme_rejected() {
        let session = fast_session(5);
        assert!(matches!(
            session.get("not-a-valid-url").await,
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            session.get("mailto:someone@example.com").await,
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_session_default_uses_default_retry_policy() {
        let session = Session::default();
        assert_eq!(session.retry_policy().max_retries(), DEFAULT_MAX_RETRIES);
    }
}
