//! Bounded-timeout HTTP acquisition with safe logging.
//!
//! - One GET per call, no retries
//! - Hard wall-clock deadline over send + body read, floored at
//!   [`MIN_TIMEOUT_SECS`]
//! - Caller cancellation via [`CancellationToken`], reported separately from
//!   the deadline
//! - Non-2xx statuses are *not* errors: they come back as a [`RawResponse`]
//!   so the caller can classify them and keep the body for diagnostics
//! - Redacts sensitive query params (`appid`, `api_key`, ...) and never logs
//!   secret values
//! - Optional *raw* request/response logging via `FETCHLOG_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), fetchlog_http::AcquireError> {
//! use tokio_util::sync::CancellationToken;
//!
//! let client = fetchlog_http::HttpClient::new()?;
//! let cancel = CancellationToken::new();
//! let resp = client.acquire("https://example.com/", 20, &cancel).await?;
//! println!("{} ({} bytes)", resp.status, resp.body.len());
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), cancellation, deadline expiry
//! and transport errors, plus raw request/response lines (target `http.raw`)
//! when `FETCHLOG_HTTP_RAW=1`.

use fetchlog_common::{Failure, FailureKind};
use reqwest::Client;
use reqwest::header::HeaderMap;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Smallest deadline ever applied, whatever the caller configured.
pub const MIN_TIMEOUT_SECS: u64 = 5;

const USER_AGENT: &str = concat!("fetchlog/", env!("CARGO_PKG_VERSION"));

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "FETCHLOG_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(url: &Url) -> String {
    let mut shown = url.clone();
    let (_, redacted) = redact_query(url);
    if redacted.is_empty() {
        shown.set_query(None);
    } else {
        shown.query_pairs_mut().clear().extend_pairs(redacted);
    }
    format!(
        "curl -XGET -H 'User-Agent: {}' '{}'",
        USER_AGENT,
        shown.as_str().replace('\'', r"'\''")
    )
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("set-cookie")
                || key.eq_ignore_ascii_case("authorization")
            {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

/// Transport-level failures of a single acquisition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquireError {
    #[error("invalid URL: {0}")]
    MalformedInput(String),
    #[error("deadline of {after_secs}s elapsed")]
    Timeout { after_secs: u64 },
    #[error("cancelled by caller")]
    Cancelled,
    #[error("network error: {cause}")]
    Network { cause: String },
    #[error("unclassified transport error: {0}")]
    Unclassified(String),
}

impl AcquireError {
    /// Position of this error in the flat failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            AcquireError::MalformedInput(_) => FailureKind::MalformedInput,
            AcquireError::Timeout { .. } => FailureKind::Timeout,
            AcquireError::Cancelled => FailureKind::Cancelled,
            AcquireError::Network { .. } => FailureKind::NetworkError,
            AcquireError::Unclassified(_) => FailureKind::UnclassifiedFailure,
        }
    }

    /// Classified failure with a message fit for the end user; transport
    /// detail only goes into `cause`.
    ///
    /// ```
    /// use fetchlog_common::FailureKind;
    /// use fetchlog_http::AcquireError;
    ///
    /// let f = AcquireError::Timeout { after_secs: 5 }.to_failure("the weather API");
    /// assert_eq!(f.kind, FailureKind::Timeout);
    /// assert!(f.message.contains("timeout"));
    /// ```
    pub fn to_failure(&self, target: &str) -> Failure {
        let failure = Failure::new(self.kind(), self.user_message(target));
        match self {
            AcquireError::MalformedInput(detail) | AcquireError::Unclassified(detail) => {
                failure.with_cause(detail.clone())
            }
            AcquireError::Network { cause } => failure.with_cause(cause.clone()),
            AcquireError::Timeout { .. } | AcquireError::Cancelled => failure,
        }
    }

    fn user_message(&self, target: &str) -> String {
        match self {
            AcquireError::MalformedInput(_) => {
                "invalid URL: only absolute http/https addresses are accepted".to_string()
            }
            AcquireError::Timeout { after_secs } => {
                format!("timeout: {target} did not answer within {after_secs}s")
            }
            AcquireError::Cancelled => "cancelled before completion".to_string(),
            AcquireError::Network { .. } => format!("network error while contacting {target}"),
            AcquireError::Unclassified(_) => format!("unexpected error while contacting {target}"),
        }
    }
}

// ==============================
// Response
// ==============================

/// What came back from the remote, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub reason: String,
    /// Body decoded lossily as UTF-8; empty string when the remote sent none.
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for an empty or whitespace-only body.
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// `"<code> <reason>"`, e.g. `404 Not Found`.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }
}

// ==============================
// Validation
// ==============================

/// Parse `raw` (trimmed) as an absolute `http`/`https` URL.
///
/// ```
/// use fetchlog_http::{parse_http_url, AcquireError};
///
/// assert!(parse_http_url(" https://example.com/a ").is_ok());
/// assert!(matches!(parse_http_url("ftp://example.com"), Err(AcquireError::MalformedInput(_))));
/// assert!(matches!(parse_http_url("/relative"), Err(AcquireError::MalformedInput(_))));
/// ```
pub fn parse_http_url(raw: &str) -> Result<Url, AcquireError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| AcquireError::MalformedInput(format!("{trimmed:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AcquireError::MalformedInput(format!(
            "unsupported scheme {other:?}"
        ))),
    }
}

/// The deadline actually applied for a configured number of seconds.
///
/// ```
/// use fetchlog_http::effective_timeout;
/// use std::time::Duration;
///
/// assert_eq!(effective_timeout(0), Duration::from_secs(5));
/// assert_eq!(effective_timeout(20), Duration::from_secs(20));
/// ```
pub fn effective_timeout(timeout_secs: u64) -> Duration {
    Duration::from_secs(timeout_secs.max(MIN_TIMEOUT_SECS))
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Construct a client with the fetchlog user agent.
    pub fn new() -> Result<Self, AcquireError> {
        let inner = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AcquireError::Unclassified(format!("client build failed: {e}")))?;
        Ok(Self { inner })
    }

    /// Validate `url` and perform one bounded GET.
    ///
    /// Invalid input fails with [`AcquireError::MalformedInput`] before any
    /// network access.
    pub async fn acquire(
        &self,
        url: &str,
        timeout_secs: u64,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, AcquireError> {
        let url = parse_http_url(url)?;
        self.acquire_url(&url, timeout_secs, cancel).await
    }

    /// Perform one bounded GET against an already validated URL.
    pub async fn acquire_url(
        &self,
        url: &Url,
        timeout_secs: u64,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, AcquireError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AcquireError::MalformedInput(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }
        if cancel.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }

        let deadline = effective_timeout(timeout_secs);
        let req_id = format!(
            "r{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let (host_path, redacted_q) = redact_query(url);

        tracing::debug!(
            req_id=%req_id,
            method="GET",
            host_path=%host_path,
            query=?redacted_q,
            timeout_ms=deadline.as_millis() as u64,
            "http.request.start"
        );
        if raw_enabled() {
            tracing::debug!(target: "http.raw", %req_id, curl=%make_curl(url), "request");
        }

        let t0 = std::time::Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(
                    req_id=%req_id,
                    elapsed_ms=t0.elapsed().as_millis() as u64,
                    "http.cancelled"
                );
                Err(AcquireError::Cancelled)
            }
            res = tokio::time::timeout(deadline, self.exchange(url, deadline, &req_id)) => {
                match res {
                    Ok(inner) => inner,
                    Err(_elapsed) => {
                        tracing::debug!(
                            req_id=%req_id,
                            timeout_ms=deadline.as_millis() as u64,
                            "http.timeout"
                        );
                        Err(AcquireError::Timeout { after_secs: deadline.as_secs() })
                    }
                }
            }
        };

        if let Err(err) = &outcome {
            tracing::debug!(
                req_id=%req_id,
                kind=%err.kind(),
                message=%err,
                "http.acquire.failed"
            );
        }
        outcome
    }

    async fn exchange(
        &self,
        url: &Url,
        deadline: Duration,
        req_id: &str,
    ) -> Result<RawResponse, AcquireError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(e, deadline))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|e| classify(e, deadline))?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            content_type=%content_type,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let truncated = bytes.len() > RAW_MAX_BODY;
            let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snip_body(&bytes),
            "http.response.body_snippet"
        );

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

// ==============================
// Helpers
// ==============================

fn classify(err: reqwest::Error, deadline: Duration) -> AcquireError {
    if err.is_timeout() {
        return AcquireError::Timeout {
            after_secs: deadline.as_secs(),
        };
    }
    if err.is_builder() {
        return AcquireError::MalformedInput(err.to_string());
    }
    if err.is_connect() || err.is_request() || err.is_body() || err.is_decode() {
        return AcquireError::Network {
            cause: error_chain(&err),
        };
    }
    AcquireError::Unclassified(error_chain(&err))
}

/// Flatten an error and its sources into one line; reqwest hides the useful
/// part (DNS, TLS, refused) in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut src = err.source();
    while let Some(s) = src {
        out.push_str(": ");
        out.push_str(&s.to_string());
        src = s.source();
    }
    out
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "appid"
            | "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "apikey"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
    )
}

/// Return "host + path" and the query list with secret values replaced.
fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}
