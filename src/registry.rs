//! Host-keyed dispatch table for site-specific resolvers
//!
//! Built once at startup and passed by reference into [`crate::resolve`];
//! lookups never mutate it, so shared use across tasks needs no locking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::metadata::ResolveResult;
use crate::options::ResolveOptions;

/// A site-specific resolver.
///
/// Implementations must not fail for "not my URL"; they return an empty
/// [`ResolveResult`] instead. Errors are reserved for transient conditions
/// worth retrying.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, url: &Url, options: &ResolveOptions) -> Result<ResolveResult>;
}

type Matcher = Box<dyn Fn(&Url) -> bool + Send + Sync>;

/// Dispatch table consulted before the generic HTTP resolver.
///
/// Exact host entries win over predicate matchers; matchers run in
/// registration order. For a fixed registry, `lookup` is a pure function
/// of the URL.
#[derive(Default)]
pub struct Registry {
    hosts: HashMap<String, Arc<dyn Resolver>>,
    matchers: Vec<(Matcher, Arc<dyn Resolver>)>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver for exact host matches. Hosts carry their port
    /// when it is not the scheme default, mirroring URL serialization.
    pub fn register_hosts<I, S>(&mut self, hosts: I, resolver: Arc<dyn Resolver>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for host in hosts {
            self.hosts.insert(host.into(), Arc::clone(&resolver));
        }
    }

    /// Appends a predicate matcher. Matchers are consulted only when no
    /// exact host entry applies.
    pub fn register_matcher<F>(&mut self, matcher: F, resolver: Arc<dyn Resolver>)
    where
        F: Fn(&Url) -> bool + Send + Sync + 'static,
    {
        self.matchers.push((Box::new(matcher), resolver));
    }

    /// The resolver registered for `url`, if any.
    #[must_use]
    pub fn lookup(&self, url: &Url) -> Option<&dyn Resolver> {
        if let Some(resolver) = host_key(url).and_then(|key| self.hosts.get(&key)) {
            return Some(resolver.as_ref());
        }
        self.matchers
            .iter()
            .find(|(matcher, _)| matcher(url))
            .map(|(_, resolver)| resolver.as_ref())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.matchers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len() + self.matchers.len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("hosts", &self.hosts.keys().collect::<Vec<_>>())
            .field("matchers", &self.matchers.len())
            .finish()
    }
}

fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_owned()),
    }
}
