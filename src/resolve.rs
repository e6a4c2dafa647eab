//! Entry point tying the registry to the generic HTTP resolver

use url::Url;

use crate::error::Result;
use crate::http;
use crate::metadata::ResolveResult;
use crate::options::ResolveOptions;
use crate::registry::Registry;

/// Resolves `url` to metadata.
///
/// A registry hit delegates to the site-specific resolver and returns its
/// result as-is, even when empty. Everything else goes through the generic
/// HTTP resolver.
///
/// # Errors
///
/// Returns [`crate::ResolveError`] when resolution hits a condition worth
/// retrying, such as a 5xx response or a failed connection. Anything
/// permanent resolves to a result without a value instead.
pub async fn resolve(
    url: &Url,
    registry: &Registry,
    options: &ResolveOptions,
) -> Result<ResolveResult> {
    if let Some(resolver) = registry.lookup(url) {
        tracing::debug!(%url, "dispatching to site-specific resolver");
        return resolver.resolve(url, options).await;
    }
    http::resolve(url, options).await
}
