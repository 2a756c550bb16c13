//! Small HTTP client for the outbound calls the analysis pipeline makes.
//!
//! - Request options: headers, `Auth`, query params, timeout
//! - JSON helpers plus a bounded text download for fetched pages
//! - Redacts sensitive query params and never logs secret values
//! - Optional *raw* request/response logging via `TRUSTCHECK_HTTP_RAW=1`
//!
//! Every request is sent exactly once. Upstream services here are either
//! paid (the LLM) or best-effort (fact checks, arbitrary pages), so a failure
//! is reported to the caller instead of being retried.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), trustcheck_http::HttpError> {
//! let client = trustcheck_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", trustcheck_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated) and final errors. Raw lines
//! (target `http.raw`) are only emitted when `TRUSTCHECK_HTTP_RAW=1`.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

const RAW_ENV: &str = "TRUSTCHECK_HTTP_RAW";
const RAW_MAX_BODY: usize = 16 * 1024;
const SNIPPET_MAX: usize = 500;

const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str())
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// Status code for `Api` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authentication strategies supported by the client.
///
/// ```
/// use trustcheck_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Credential passed as a query parameter (e.g. Google `key=`).
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
    None,
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Query { .. } => "query",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs.
///
/// ```
/// use trustcheck_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(5)),
///     auth: Some(Auth::Query {
///         name: "key",
///         value: Cow::Borrowed("demo"),
///     }),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 5);
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

impl<'a> RequestOpts<'a> {
    /// Query pairs including a query-param credential, if any.
    fn query_pairs(&self) -> Vec<(&'a str, Cow<'a, str>)> {
        let mut pairs = self.query.clone().unwrap_or_default();
        if let Some(Auth::Query { name, value }) = &self.auth {
            pairs.push((*name, value.clone()));
        }
        pairs
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: Option<Url>,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use trustcheck_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        Ok(Self {
            base: Some(base),
            ..Self::detached()?
        })
    }

    /// A client without a base URL; every path must be absolute.
    pub fn detached() -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("trustcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base: None,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    /// Override the default per-request timeout.
    ///
    /// ```no_run
    /// use trustcheck_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::detached()?.with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json::<(), T>(Method::GET, path, None, opts)
            .await
    }

    /// POST a JSON body and decode a JSON reply.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts)
            .await
    }

    /// GET a document and return at most its first `max_bytes` bytes as text.
    ///
    /// The body is read chunk by chunk and the connection is dropped once the
    /// budget is reached, so large documents are never buffered whole. Invalid
    /// UTF-8 (including a code point cut at the budget boundary) is replaced.
    pub async fn get_text_prefix(
        &self,
        path: &str,
        max_bytes: usize,
        opts: RequestOpts<'_>,
    ) -> Result<String, HttpError> {
        let url = self.resolve_url(path, opts.allow_absolute)?;
        let (rb, req_id, timeout) = self.prepare(Method::GET, &url, None, &opts)?;
        let mut resp = self.send(rb, &req_id, &url, timeout).await?;
        let status = resp.status();
        let request_id = header_request_id(resp.headers());

        if !status.is_success() {
            let first = resp.chunk().await.ok().flatten().unwrap_or_default();
            return Err(self.api_error(&req_id, status, request_id, &first));
        }

        let mut buf: Vec<u8> = Vec::with_capacity(max_bytes.min(64 * 1024));
        while buf.len() < max_bytes {
            let chunk = resp.chunk().await.map_err(|e| {
                let message = e.to_string();
                tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
                HttpError::Network(message)
            })?;
            match chunk {
                Some(bytes) => {
                    let take = (max_bytes - buf.len()).min(bytes.len());
                    buf.extend_from_slice(&bytes[..take]);
                }
                None => break,
            }
        }

        tracing::debug!(
            req_id=%req_id,
            %status,
            prefix_len=buf.len(),
            max_bytes,
            "http.response.text_prefix"
        );
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve_url(path, opts.allow_absolute)?;
        let body_bytes = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| HttpError::Build(format!("request body serialization failed: {e}")))?;

        let (rb, req_id, timeout) = self.prepare(method, &url, body_bytes.as_deref(), &opts)?;
        let resp = self.send(rb, &req_id, &url, timeout).await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|e| {
            let message = e.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;

        if raw_enabled() {
            let mut body_snip = bytes.to_vec();
            let truncated = body_snip.len() > RAW_MAX_BODY;
            body_snip.truncate(RAW_MAX_BODY);
            tracing::debug!(
                target: "http.raw",
                %req_id,
                %status,
                headers=?redact_headers(&headers),
                body=%String::from_utf8_lossy(&body_snip),
                truncated,
                "response"
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(req_id=%req_id, body_snippet=%snippet, "http.response.body_snippet");

        if !status.is_success() {
            return Err(self.api_error(&req_id, status, header_request_id(&headers), &bytes));
        }

        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            tracing::warn!(
                req_id=%req_id,
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e,
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }

    fn resolve_url(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        match &self.base {
            Some(base) if !allow_absolute => {
                base.join(path).map_err(|e| HttpError::Url(e.to_string()))
            }
            Some(base) => Url::parse(path)
                .or_else(|_| base.join(path))
                .map_err(|e| HttpError::Url(e.to_string())),
            None => Url::parse(path).map_err(|e| HttpError::Url(e.to_string())),
        }
    }

    /// Build the request and emit the redacted `http.request.start` event.
    fn prepare(
        &self,
        method: Method,
        url: &Url,
        body: Option<&[u8]>,
        opts: &RequestOpts<'_>,
    ) -> Result<(RequestBuilder, String, Duration), HttpError> {
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);

        let pairs = opts.query_pairs();
        if !pairs.is_empty() {
            let flat: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_ref())).collect();
            rb = rb.query(&flat);
        }

        if let Some(bytes) = body {
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.to_vec());
        }

        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        if let Some(Auth::Bearer(tok)) = &opts.auth {
            rb = rb.bearer_auth(sanitize_api_key(tok)?);
        }

        let req_id = format!("r{}", Uuid::new_v4().simple());
        let redacted_q: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| {
                let shown = if is_secret_param(k) {
                    "<redacted>".to_string()
                } else {
                    v.to_string()
                };
                ((*k).to_string(), shown)
            })
            .collect();

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            query=?redacted_q,
            timeout_ms=timeout.as_millis() as u64,
            auth_kind=opts.auth.as_ref().map(Auth::kind).unwrap_or("none"),
            has_body=body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, url, &redacted_q, opts.headers.as_ref(), body);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        Ok((rb, req_id, timeout))
    }

    async fn send(
        &self,
        rb: RequestBuilder,
        req_id: &str,
        url: &Url,
        timeout: Duration,
    ) -> Result<Response, HttpError> {
        let t0 = Instant::now();
        match rb.send().await {
            Ok(resp) => {
                tracing::debug!(
                    req_id=%req_id,
                    status=%resp.status(),
                    duration_ms=t0.elapsed().as_millis() as u64,
                    content_length=?resp.content_length(),
                    x_request_id=%header_request_id(resp.headers()),
                    "http.response.headers"
                );
                Ok(resp)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    req_id=%req_id,
                    host=%url.host_str().unwrap_or("-"),
                    timed_out=err.is_timeout(),
                    timeout_ms=timeout.as_millis() as u64,
                    message=%message,
                    "http.network_error.send"
                );
                Err(HttpError::Network(message))
            }
        }
    }

    fn api_error(
        &self,
        req_id: &str,
        status: StatusCode,
        request_id: String,
        body: &[u8],
    ) -> HttpError {
        let message = extract_error_message(body);
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%message,
            x_request_id=%request_id,
            "http.error"
        );
        HttpError::Api {
            status,
            message,
            request_id,
        }
    }
}

fn header_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Render a best-effort curl command for repro/debug with secrets redacted.
fn make_curl(
    method: &Method,
    url: &Url,
    redacted_query: &[(String, String)],
    headers: Option<&HeaderMap>,
    body: Option<&[u8]>,
) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    if let Some(headers) = headers {
        for (name, val) in redact_headers(headers) {
            parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
        }
    }
    if let Some(bytes) = body {
        let mut s = String::from_utf8_lossy(bytes).into_owned();
        if s.len() > RAW_MAX_BODY {
            let cut = (0..=RAW_MAX_BODY)
                .rev()
                .find(|i| s.is_char_boundary(*i))
                .unwrap_or(0);
            s.truncate(cut);
            s.push('…');
        }
        parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
    }
    let mut shown = url.clone();
    shown.set_query(None);
    if !redacted_query.is_empty() {
        shown
            .query_pairs_mut()
            .extend_pairs(redacted_query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    parts.push(format!("'{}'", shown.as_str()));
    parts.join(" ")
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if key.eq_ignore_ascii_case("authorization") {
                "Bearer <redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"error":{"message":..}}` (OpenAI-compatible and Google) and
/// flat `{"message"|"detail"|"error": ..}` shapes; otherwise returns a
/// snippet of the raw body.
fn extract_error_message(body: &[u8]) -> String {
    let Ok(val) = serde_json::from_slice::<serde_json::Value>(body) else {
        return snip_body(body);
    };
    let nested = val
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str());
    let flat = ["message", "detail", "error"]
        .iter()
        .find_map(|k| val.get(*k).and_then(|m| m.as_str()));

    nested
        .or(flat)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| snip_body(body))
}

fn snip_body(body: &[u8]) -> String {
    let snip = String::from_utf8_lossy(body);
    let mut chars = snip.chars();
    let head: String = chars.by_ref().take(SNIPPET_MAX).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}
