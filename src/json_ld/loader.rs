//! Context document loading
//!
//! The contexts that matter in practice (Activity Streams, the security and
//! identity vocabularies, Schema.org) are embedded and served from memory,
//! so ordinary documents compact without any context fetch. Anything else
//! is fetched through the configured transport.

use std::collections::HashMap;
use std::sync::LazyLock;

use reqwest::header::{self, HeaderValue};
use serde_json::Value;
use url::Url;

use super::error::JsonLdError;
use crate::options::ResolveOptions;
use crate::transport::{self, Request, TransportError};

/// `Accept` header for remote context fetches.
const ACCEPT: &str = "application/ld+json, application/json";

static ACTIVITY_STREAMS: LazyLock<Value> = LazyLock::new(|| {
    serde_json::from_str(include_str!("contexts/activitystreams.json"))
        .expect("embedded context is valid JSON")
});

static MISCELLANY: LazyLock<Value> = LazyLock::new(|| {
    serde_json::from_str(include_str!("contexts/miscellany.json"))
        .expect("embedded context is valid JSON")
});

static SECURITY_V1: LazyLock<Value> = LazyLock::new(|| {
    serde_json::from_str(include_str!("contexts/security-v1.json"))
        .expect("embedded context is valid JSON")
});

static IDENTITY_V1: LazyLock<Value> = LazyLock::new(|| {
    serde_json::from_str(include_str!("contexts/identity-v1.json"))
        .expect("embedded context is valid JSON")
});

static SCHEMA_ORG: LazyLock<Value> = LazyLock::new(|| {
    serde_json::from_str(include_str!("contexts/schemaorg.json"))
        .expect("embedded context is valid JSON")
});

// Both URL schemes appear in the wild for every one of these.
static PRELOADED: LazyLock<HashMap<&'static str, &'static Value>> = LazyLock::new(|| {
    HashMap::from([
        ("https://www.w3.org/ns/activitystreams", &*ACTIVITY_STREAMS),
        ("http://www.w3.org/ns/activitystreams", &*ACTIVITY_STREAMS),
        ("https://w3id.org/security/v1", &*SECURITY_V1),
        ("http://w3id.org/security/v1", &*SECURITY_V1),
        ("https://w3id.org/identity/v1", &*IDENTITY_V1),
        ("http://w3id.org/identity/v1", &*IDENTITY_V1),
        ("https://schema.org/", &*SCHEMA_ORG),
        ("http://schema.org/", &*SCHEMA_ORG),
        ("https://schema.org", &*SCHEMA_ORG),
        ("http://schema.org", &*SCHEMA_ORG),
    ])
});

/// The embedded Activity Streams context value, applied as the base context
/// when expanding AS2 documents. Servers routinely rely on the normative
/// context without declaring every term they use.
pub(crate) fn activity_streams_context() -> &'static Value {
    static CONTEXT: LazyLock<Value> = LazyLock::new(|| {
        ACTIVITY_STREAMS
            .get("@context")
            .cloned()
            .expect("embedded context has an @context entry")
    });
    &CONTEXT
}

/// Extension terms layered under the Activity Streams compaction stack:
/// `Hashtag` and the boolean-typed `sensitive`.
pub(crate) fn miscellany_context() -> &'static Value {
    static CONTEXT: LazyLock<Value> = LazyLock::new(|| {
        MISCELLANY
            .get("@context")
            .cloned()
            .expect("embedded context has an @context entry")
    });
    &CONTEXT
}

/// Loads context documents, preferring the embedded set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DocumentLoader<'a> {
    options: &'a ResolveOptions,
}

impl<'a> DocumentLoader<'a> {
    pub fn new(options: &'a ResolveOptions) -> Self {
        Self { options }
    }

    /// Loads the context document at `url`.
    pub async fn load(self, url: &str) -> Result<Value, JsonLdError> {
        if let Some(preloaded) = PRELOADED.get(url) {
            return Ok((*preloaded).clone());
        }
        tracing::debug!(url, "loading remote context");
        let parsed = Url::parse(url).map_err(|err| {
            JsonLdError::InvalidContext(format!("invalid context URL {url}: {err}"))
        })?;
        let request = Request::get().header(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        let response = transport::fetch(self.options, &parsed, request)
            .await
            .map_err(|source| JsonLdError::ContextFetch {
                url: url.to_owned(),
                source,
            })?;
        if !response.is_success() {
            let status = response.status;
            response.cancel();
            return Err(JsonLdError::ContextStatus {
                url: url.to_owned(),
                status,
            });
        }
        match response.json().await {
            Ok(document) => Ok(document),
            Err(TransportError::Decode(_)) => Err(JsonLdError::ContextShape {
                url: url.to_owned(),
            }),
            Err(source) => Err(JsonLdError::ContextFetch {
                url: url.to_owned(),
                source,
            }),
        }
    }
}
