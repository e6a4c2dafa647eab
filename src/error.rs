//! Error types for resolution failures

use reqwest::header::HeaderMap;
use thiserror::Error;
use url::Url;

use crate::json_ld::JsonLdError;
use crate::transport::TransportError;

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// HTTP statuses worth retrying later.
///
/// Everything outside this set is treated as a permanent answer from the
/// remote host: the resolver degrades to "no metadata" instead of failing.
#[must_use]
pub const fn is_temporary_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504 | 507)
}

/// A transient resolution failure.
///
/// Raised only for conditions where retrying later could succeed: a
/// temporary HTTP status, a network-level failure, a cancelled request, or
/// a remote JSON-LD context that could not be loaded right now. Permanent
/// conditions (404s, unusable documents, malformed markup) never surface
/// here; they resolve to an empty value instead.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ResolveError {
    message: String,
    response: Option<ResponseSnapshot>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ResolveError {
    /// Creates an error with an explicit message and no response context.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
            source: None,
        }
    }

    /// Creates an error from the response that triggered it, deriving the
    /// message from its status when none fits better.
    #[must_use]
    pub fn from_status(response: ResponseSnapshot) -> Self {
        let message = response
            .default_message()
            .unwrap_or_else(|| format!("HTTP Error {}", response.status));
        Self {
            message,
            response: Some(response),
            source: None,
        }
    }

    /// Attaches the response that triggered the error.
    #[must_use]
    pub fn with_response(mut self, response: ResponseSnapshot) -> Self {
        self.response = Some(response);
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The response that triggered the error, if one was received.
    #[must_use]
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        self.response.as_ref()
    }
}

impl From<TransportError> for ResolveError {
    fn from(err: TransportError) -> Self {
        Self::new(err.to_string()).with_source(err)
    }
}

impl From<JsonLdError> for ResolveError {
    fn from(err: JsonLdError) -> Self {
        Self::new("Unable to resolve JSON-LD context(s)").with_source(err)
    }
}

/// Status line, headers and final URL of a response kept for error reporting
/// after the response itself has been consumed or discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL after redirects, when known.
    pub url: Option<Url>,
}

impl ResponseSnapshot {
    /// The ASCII origin of the response URL, when it has a meaningful one.
    #[must_use]
    pub fn origin(&self) -> Option<String> {
        let origin = self.url.as_ref()?.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }

    fn default_message(&self) -> Option<String> {
        let Some(origin) = self.origin() else {
            return (self.status >= 400).then(|| format!("HTTP Error {}", self.status));
        };
        if self.status == 429 {
            let mut message = format!("Too Many Requests to {origin}");
            if let Some(retry_after) = self
                .headers
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
            {
                message.push_str(&format!("; retry after {retry_after}"));
            }
            return Some(message);
        }
        if self.status >= 500 {
            return Some(format!("Server {origin} is unavailable (HTTP {})", self.status));
        }
        (self.status >= 400).then(|| format!("HTTP Error {}", self.status))
    }
}
