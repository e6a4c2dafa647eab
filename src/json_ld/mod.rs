//! A small JSON-LD processor: context handling, expansion and compaction
//!
//! This is not a general-purpose implementation. It covers the subset that
//! published Activity Streams and Schema.org documents exercise, embeds the
//! contexts those documents lean on, and decodes compaction output into a
//! typed value model so extraction code stays away from raw JSON.

mod compact;
mod context;
mod error;
mod loader;
mod value;

pub use error::JsonLdError;
pub use value::{
    JsonLdValue, LanguageEntry, NodeObject, Scalar, SetIter, first_of_language_map,
};

pub(crate) use compact::compact;
pub(crate) use loader::{DocumentLoader, activity_streams_context, miscellany_context};
