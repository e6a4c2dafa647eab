//! HTTP transport boundary
//!
//! All network traffic flows through the [`Transport`] trait so callers can
//! swap the reqwest-backed default for a proxied, cached or mock
//! implementation. Response bodies are one-shot: they are either consumed
//! once or explicitly cancelled so connections are released as soon as a
//! short-circuit makes the body irrelevant.

use std::sync::LazyLock;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, redirect};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ResponseSnapshot;
use crate::metadata::ResponseInfo;
use crate::options::ResolveOptions;

/// Errors raised by transports and response-body consumption.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or completed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was cancelled before completion.
    #[error("request cancelled")]
    Cancelled,

    /// A network-level failure without an HTTP status.
    #[error("network error: {0}")]
    Network(String),
}

/// An outgoing request. The method defaults to GET; resolution never needs
/// anything else, but site-specific resolvers may.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub cancel: CancellationToken,
}

impl Request {
    /// A GET request with no headers.
    #[must_use]
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Adds a header, replacing any previous value under the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::get()
    }
}

/// A one-shot response body.
#[async_trait]
pub trait ResponseBody: Send {
    /// Reads the whole body. Consumes the body; it cannot be read twice.
    async fn bytes(self: Box<Self>) -> Result<Bytes, TransportError>;

    /// Discards the body without reading it.
    fn cancel(self: Box<Self>);
}

/// An in-memory body, used by tests and by transports that buffer upfront.
pub struct BufferedBody(Bytes);

impl BufferedBody {
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Bytes::new())
    }
}

#[async_trait]
impl ResponseBody for BufferedBody {
    async fn bytes(self: Box<Self>) -> Result<Bytes, TransportError> {
        Ok(self.0)
    }

    fn cancel(self: Box<Self>) {}
}

/// A response with its body still pending.
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: Url,
    body: Box<dyn ResponseBody>,
}

impl Response {
    pub fn new(status: u16, headers: HeaderMap, url: Url, body: Box<dyn ResponseBody>) -> Self {
        Self {
            status,
            headers,
            url,
            body,
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The raw `Content-Type` header value, if readable.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE)?.to_str().ok()
    }

    /// Status and headers, for attaching to a [`crate::ResolveResult`].
    #[must_use]
    pub fn info(&self) -> ResponseInfo {
        ResponseInfo {
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    /// Status, headers and URL, for attaching to a [`crate::ResolveError`].
    #[must_use]
    pub fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            status: self.status,
            headers: self.headers.clone(),
            url: Some(self.url.clone()),
        }
    }

    /// Reads the whole body.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails or is cancelled.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        self.body.bytes().await
    }

    /// Reads and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails, is cancelled, or the body is
    /// not valid JSON.
    pub async fn json(self) -> Result<serde_json::Value, TransportError> {
        Ok(serde_json::from_slice(&self.bytes().await?)?)
    }

    /// Discards the body without reading it.
    pub fn cancel(self) {
        self.body.cancel();
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

/// Pluggable HTTP client boundary.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a request and returns the response with its body pending.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures below the HTTP layer; responses
    /// with error statuses are returned as regular [`Response`]s.
    async fn fetch(&self, url: &Url, request: Request) -> Result<Response, TransportError>;
}

/// Default reqwest-backed transport. Follows up to ten redirects and races
/// every request and body read against the request's cancellation token.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::limited(10))
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    /// Creates a transport around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url, request: Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(request.method, url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = tokio::select! {
            () = request.cancel.cancelled() => return Err(TransportError::Cancelled),
            result = builder.send() => result?,
        };
        Ok(Response {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            url: response.url().clone(),
            body: Box::new(HttpBody {
                response,
                cancel: request.cancel,
            }),
        })
    }
}

struct HttpBody {
    response: reqwest::Response,
    cancel: CancellationToken,
}

#[async_trait]
impl ResponseBody for HttpBody {
    async fn bytes(self: Box<Self>) -> Result<Bytes, TransportError> {
        let Self { response, cancel } = *self;
        tokio::select! {
            () = cancel.cancelled() => Err(TransportError::Cancelled),
            result = response.bytes() => result.map_err(TransportError::Body),
        }
    }

    fn cancel(self: Box<Self>) {}
}

static DEFAULT_TRANSPORT: LazyLock<HttpTransport> = LazyLock::new(HttpTransport::new);

/// Performs a request through the transport selected by `options`, layering
/// headers in ascending precedence: the default `User-Agent`, then
/// `options.headers`, then the headers already on `request`, then
/// `options.override_headers`.
///
/// # Errors
///
/// Returns an error for network-level failures or cancellation.
pub async fn fetch(
    options: &ResolveOptions,
    url: &Url,
    mut request: Request,
) -> Result<Response, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(crate::USER_AGENT),
    );
    overlay(&mut headers, &options.headers);
    overlay(&mut headers, &request.headers);
    overlay(&mut headers, &options.override_headers);
    request.headers = headers;
    request.cancel = options.cancel.clone();

    tracing::debug!(url = %url, method = %request.method, "fetching");
    let transport: &dyn Transport = match &options.transport {
        Some(transport) => transport.as_ref(),
        None => &*DEFAULT_TRANSPORT,
    };
    transport.fetch(url, request).await
}

/// Replaces every header name present in `layer`, keeping multi-valued
/// entries within a single layer intact.
fn overlay(target: &mut HeaderMap, layer: &HeaderMap) {
    for name in layer.keys() {
        target.remove(name);
    }
    for (name, value) in layer {
        target.append(name, value.clone());
    }
}
