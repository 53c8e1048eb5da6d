//! Minimal async HTTP plumbing shared by the ebb workspace.
//!
//! One thin wrapper around `reqwest` with the cross-cutting concerns the
//! API crates should not re-implement: request signing, bounded retries
//! with `Retry-After` support, JSON decoding, and structured logs that
//! never echo credentials.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub mod oauth;

pub use oauth::OAuth1Token;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 2;
const BACKOFF_BASE_MS: u64 = 250;
const ERROR_SNIPPET_LEN: usize = 200;

// ===== errors =====

#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("invalid url: {0}")]
    Url(String),
    #[error("failed to build http client: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error(
        "api error: status {status}, message: {message}, request_id={}",
        .request_id.as_deref().unwrap_or("-")
    )]
    Api {
        status: u16,
        message: String,
        request_id: Option<String>,
    },
}

// ===== request options =====

/// How a single request authenticates.
#[derive(Clone, Copy, Debug, Default)]
pub enum Auth<'a> {
    /// Sign the request with OAuth 1.0a user credentials (HMAC-SHA1).
    OAuth1(&'a OAuth1Token),
    /// Send `Authorization: Bearer <token>`.
    Bearer(&'a str),
    #[default]
    None,
}

/// Per-request knobs. Anything left unset falls back to the client's
/// defaults.
///
/// ```
/// use ebb_http::{Auth, RequestOpts};
///
/// let opts = RequestOpts {
///     retries: Some(0),
///     query: Some(vec![("count", "200".into())]),
///     ..RequestOpts::default()
/// };
/// assert!(matches!(opts.auth, Auth::None));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub auth: Auth<'a>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

// ===== client =====

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base: Url,
    default_timeout: Duration,
    default_retries: u32,
}

impl HttpClient {
    /// Build a client rooted at `base`.
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use ebb_http::HttpClient;
    ///
    /// let client = HttpClient::new("https://api.twitter.com")
    ///     .expect("static url parses")
    ///     .with_timeout(Duration::from_secs(10))
    ///     .with_retries(0);
    /// ```
    pub fn new(base: impl AsRef<str>) -> Result<Self, HttpError> {
        // Url::join treats the last path segment as a file unless the base
        // ends with '/'.
        let mut base = base.as_ref().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| HttpError::Url(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            client,
            base,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_retries: DEFAULT_RETRIES,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.default_retries = retries;
        self
    }

    /// GET `path` relative to the base URL and decode the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError> {
        self.request_json(Method::GET, path, opts).await
    }

    /// POST to `path` and decode the JSON response. The request carries no
    /// body; endpoint parameters belong in [`RequestOpts::query`] so that
    /// signing sees them.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError> {
        self.request_json(Method::POST, path, opts).await
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError> {
        // `path` must not embed a query string: signing covers exactly the
        // pairs in `opts.query`, nothing parsed back out of the URL.
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let max_retries = opts.retries.unwrap_or(self.default_retries);
        let req_id = next_request_id();

        debug!(
            event = "http.request.start",
            req_id = %req_id,
            method = %method,
            url = %url,
            query = ?opts.query.as_deref().map(redacted_query),
            "http request"
        );

        let mut attempt: u32 = 0;
        loop {
            let started = Instant::now();
            let mut rb = self
                .client
                .request(method.clone(), url.clone())
                .timeout(timeout);
            if let Some(query) = opts.query.as_deref() {
                rb = rb.query(query);
            }
            rb = match opts.auth {
                Auth::OAuth1(token) => {
                    let header = oauth::authorization_header(
                        method.as_str(),
                        &url,
                        opts.query.as_deref().unwrap_or(&[]),
                        token,
                    );
                    rb.header(AUTHORIZATION, header)
                }
                Auth::Bearer(token) => rb.bearer_auth(sanitize_api_key(token)),
                Auth::None => rb,
            };

            let resp = rb.send().await?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = resp.bytes().await?;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            log_rate_limit(&req_id, &headers);

            if status.is_success() {
                debug!(
                    event = "http.response",
                    req_id = %req_id,
                    status = status.as_u16(),
                    elapsed_ms,
                    bytes = bytes.len(),
                    "http response"
                );
                return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    HttpError::Decode(format!(
                        "{e}; body: {}",
                        snip_body(&bytes, ERROR_SNIPPET_LEN)
                    ))
                });
            }

            let message = extract_error_message(&bytes);
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = retry_delay(attempt, status, &headers);
                warn!(
                    event = "http.retrying",
                    req_id = %req_id,
                    status = status.as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    message = %message,
                    "retrying http request"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            warn!(
                event = "http.error",
                req_id = %req_id,
                status = status.as_u16(),
                elapsed_ms,
                message = %message,
                "http request failed"
            );
            return Err(HttpError::Api {
                status: status.as_u16(),
                message,
                request_id: request_id_header(&headers),
            });
        }
    }
}

// ===== helpers =====

// FIXME(req-id): sub-second nanos can collide across tasks; fold in a counter.
fn next_request_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("{nanos:08x}")
}

/// Strip the whitespace and stray quotes that sneak in when a token is
/// pasted into an env file.
pub fn sanitize_api_key(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').trim().to_string()
}

fn is_secret_param(key: &str) -> bool {
    matches!(
        key,
        "key" | "api_key" | "apikey" | "token" | "access_token" | "secret" | "signature"
    )
}

fn redacted_query(query: &[(&str, Cow<'_, str>)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| {
            let shown = if is_secret_param(k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k.to_string(), shown)
        })
        .collect()
}

fn snip_body(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut snippet: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        snippet.push_str("...");
    }
    snippet
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

fn request_id_header(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-request-id").or_else(|| header_str(headers, "x-transaction-id"))
}

fn log_rate_limit(req_id: &str, headers: &HeaderMap) {
    let limit = header_str(headers, "x-rate-limit-limit");
    let remaining = header_str(headers, "x-rate-limit-remaining");
    let reset = header_str(headers, "x-rate-limit-reset");
    if limit.is_some() || remaining.is_some() || reset.is_some() {
        debug!(
            event = "http.rate_limit",
            req_id = %req_id,
            limit = ?limit,
            remaining = ?remaining,
            reset = ?reset,
            "rate limit headers"
        );
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    // Integer seconds only; the HTTP-date form does not show up on this API.
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

fn retry_delay(attempt: u32, status: StatusCode, headers: &HeaderMap) -> Duration {
    let exp = attempt.saturating_sub(1).min(5);
    let mut delay = Duration::from_millis(BACKOFF_BASE_MS << exp);
    if status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(secs) = retry_after_secs(headers) {
            delay = delay.max(Duration::from_secs(secs));
        }
    }
    delay
}

fn extract_error_message(bytes: &[u8]) -> String {
    #[derive(Deserialize)]
    struct ApiErrors {
        errors: Vec<ApiErrorEntry>,
    }
    #[derive(Deserialize)]
    struct ApiErrorEntry {
        code: Option<i64>,
        message: Option<String>,
    }
    #[derive(Deserialize)]
    struct Flat {
        message: Option<String>,
        error: Option<String>,
        detail: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_slice::<ApiErrors>(bytes) {
        if let Some(first) = parsed.errors.first() {
            let message = first
                .message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            return match first.code {
                Some(code) => format!("{message} (code {code})"),
                None => message,
            };
        }
    }
    if let Ok(flat) = serde_json::from_slice::<Flat>(bytes) {
        if let Some(message) = flat.message.or(flat.error).or(flat.detail) {
            return message;
        }
    }
    snip_body(bytes, ERROR_SNIPPET_LEN)
}

// ===== tests =====
