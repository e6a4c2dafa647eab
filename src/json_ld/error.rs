//! JSON-LD processing failures and their retry classification

use thiserror::Error;

use crate::error::is_temporary_status;
use crate::transport::TransportError;

/// Errors raised while loading contexts or compacting a document.
#[derive(Debug, Error)]
pub enum JsonLdError {
    /// A remote context answered with a non-success status.
    #[error("failed to load remote context {url} (HTTP {status})")]
    ContextStatus { url: String, status: u16 },

    /// A remote context could not be fetched at all.
    #[error("failed to load remote context {url}: {source}")]
    ContextFetch {
        url: String,
        #[source]
        source: TransportError,
    },

    /// A remote context loaded but did not contain an `@context` object.
    #[error("remote context {url} did not contain an @context entry")]
    ContextShape { url: String },

    /// A context entry that cannot be processed.
    #[error("invalid context entry: {0}")]
    InvalidContext(String),

    /// Context references or node nesting exceeded the recursion limit.
    #[error("recursion limit exceeded")]
    RecursionLimit,

    /// The document does not compact to a node object.
    #[error("document does not compact to a node object")]
    NotAnObject,
}

impl JsonLdError {
    /// Whether retrying later could succeed.
    ///
    /// Context loads that failed with a temporary HTTP status are
    /// retryable, as are bare network-level failures with no status at
    /// all. Everything else reflects the document or context itself and
    /// will not improve with time.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        match self {
            Self::ContextStatus { status, .. } => is_temporary_status(*status),
            Self::ContextFetch { .. } => true,
            _ => false,
        }
    }
}
