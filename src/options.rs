//! Caller-supplied knobs threaded through a resolution

use std::sync::Arc;

use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::transport::Transport;

/// Alternate representations that may be discovered while resolving and,
/// when listed in [`ResolveOptions::prefer_discovered`], followed instead of
/// the document at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveredAlternate {
    /// An `at://` URI advertised via a `Link: rel=alternate` header.
    AtUri,
    /// An Activity Streams representation advertised via a
    /// `Link: rel=alternate` header with an AS2 media type.
    ActivityStreams,
}

/// Options applying to a single resolution and everything it fetches.
#[derive(Clone)]
pub struct ResolveOptions {
    /// Transport performing all requests. `None` uses the shared
    /// reqwest-backed default.
    pub transport: Option<Arc<dyn Transport>>,
    /// Alternate representations to follow when discovered, in preference
    /// order. Empty means the fetched document itself is always used.
    pub prefer_discovered: Vec<DiscoveredAlternate>,
    /// Extra request headers. Override the default `User-Agent` but lose to
    /// headers a resolver sets for content negotiation.
    pub headers: HeaderMap,
    /// Headers that win over everything, including resolver-set `Accept`
    /// values. Use sparingly; overriding `Accept` can break negotiation.
    pub override_headers: HeaderMap,
    /// Token cancelling in-flight requests and body reads when triggered.
    pub cancel: CancellationToken,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            transport: None,
            prefer_discovered: Vec::new(),
            headers: HeaderMap::new(),
            override_headers: HeaderMap::new(),
            cancel: CancellationToken::new(),
        }
    }
}

impl std::fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("prefer_discovered", &self.prefer_discovered)
            .field("headers", &self.headers)
            .field("override_headers", &self.override_headers)
            .finish_non_exhaustive()
    }
}
