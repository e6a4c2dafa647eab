//! Unfurl - Link-to-metadata resolution engine for rich previews
//!
//! This library resolves a URL into normalized metadata for link previews:
//! - Content negotiation across Activity Streams, HTML and raw media
//! - A small JSON-LD processor (expansion, compaction, embedded contexts)
//! - Open Graph, head metadata and Schema.org extraction
//! - Host-keyed registry for site-specific resolvers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     resolve()                        │
//! │        registry lookup  │  site resolvers            │
//! └────────────────────┬────────────────────────────────┘
//!                      │ no registry match
//! ┌────────────────────▼────────────────────────────────┐
//! │               generic HTTP resolver                  │
//! │   content negotiation  │  Link header alternates     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ classified Content-Type
//! ┌────────────────────▼────────────────────────────────┐
//! │   HTML head / Open Graph  │  Activity Streams        │
//! │   Schema.org (embedded JSON-LD)  │  raw media        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod activity_streams;
pub mod error;
pub mod html;
pub mod http;
pub mod json_ld;
pub mod media_type;
pub mod metadata;
pub mod options;
pub mod registry;
pub mod resolve;
pub mod schema_org;
pub mod transport;
pub mod util;

/// `User-Agent` sent with every request unless overridden via
/// [`ResolveOptions::headers`].
pub const USER_AGENT: &str = concat!("unfurl/", env!("CARGO_PKG_VERSION"));

pub use error::{ResolveError, ResponseSnapshot, Result};
pub use metadata::{
    AudioObject, Brand, CreativeWorkSeries, Creator, DefinedTerm, MediaObject, Metadata,
    Organization, Person, PronounceableText, Ratio, ResolveResult, ResolverExtensions,
    ResponseInfo, SelfLabel,
};
pub use options::{DiscoveredAlternate, ResolveOptions};
pub use registry::{Registry, Resolver};
pub use resolve::resolve;
pub use transport::{
    BufferedBody, HttpTransport, Request, Response, ResponseBody, Transport, TransportError,
};
