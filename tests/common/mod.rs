//! Shared test transport
//!
//! `MockTransport` serves scripted responses keyed by URL and records every
//! request it is asked to perform. Each scripted body counts reads and
//! cancels, so tests can assert that short-circuited responses are released
//! without being consumed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use unfurl::{Request, ResolveOptions, Response, ResponseBody, Transport, TransportError};
use url::Url;

/// A canned response under construction.
pub struct Scripted {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    final_url: Option<Url>,
    reads: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
}

impl Scripted {
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            final_url: None,
            reads: Arc::new(AtomicUsize::new(0)),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn ok() -> Self {
        Self::status(200)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(
            name.parse::<HeaderName>().unwrap(),
            value.parse::<HeaderValue>().unwrap(),
        );
        self
    }

    #[must_use]
    pub fn content_type(self, value: &str) -> Self {
        self.header("content-type", value)
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.body(value.to_string())
    }

    /// Pretends the request was redirected and served from `url`.
    #[must_use]
    pub fn served_from(mut self, url: &str) -> Self {
        self.final_url = Some(Url::parse(url).unwrap());
        self
    }

    /// Counters observing what happens to this response's body.
    #[must_use]
    pub fn body_handle(&self) -> BodyHandle {
        BodyHandle {
            reads: Arc::clone(&self.reads),
            cancels: Arc::clone(&self.cancels),
        }
    }
}

/// Observers for a scripted body's fate.
pub struct BodyHandle {
    reads: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
}

impl BodyHandle {
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

struct CountingBody {
    data: Bytes,
    reads: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
}

#[async_trait]
impl ResponseBody for CountingBody {
    async fn bytes(self: Box<Self>) -> Result<Bytes, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.data)
    }

    fn cancel(self: Box<Self>) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// A request the transport was asked to perform.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub url: String,
    pub headers: HeaderMap,
}

/// Transport serving scripted responses. Panics on any request it has no
/// script for, so unexpected fetches fail tests loudly.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    log: Mutex<Vec<RequestRecord>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `url`. Repeated scripts for the same URL are
    /// served in order.
    pub fn script(&self, url: &str, response: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Every request served so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &Url, request: Request) -> Result<Response, TransportError> {
        self.log.lock().unwrap().push(RequestRecord {
            url: url.to_string(),
            headers: request.headers,
        });
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url.as_str())
            .and_then(VecDeque::pop_front);
        let Some(scripted) = scripted else {
            panic!("no scripted response for {url}");
        };
        let final_url = scripted.final_url.unwrap_or_else(|| url.clone());
        Ok(Response::new(
            scripted.status,
            scripted.headers,
            final_url,
            Box::new(CountingBody {
                data: scripted.body,
                reads: scripted.reads,
                cancels: scripted.cancels,
            }),
        ))
    }
}

/// Options wired to the given transport.
#[must_use]
pub fn options_with(transport: &Arc<MockTransport>) -> ResolveOptions {
    ResolveOptions {
        transport: Some(Arc::clone(transport) as Arc<dyn Transport>),
        ..ResolveOptions::default()
    }
}

/// Installs a log subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
