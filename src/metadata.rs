//! Normalized metadata model shared by every resolver
//!
//! Field names follow the Schema.org vocabulary so that extracted records
//! serialize into predictable JSON regardless of which source (Activity
//! Streams, Schema.org, Open Graph or plain HTML) produced them.

use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Metadata describing a single remote resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    /// Declared type of the resource, e.g. `Article` or `Note`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Canonical URL of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Display name or title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PronounceableText>,
    /// Source-specific identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// BCP 47 language tag of the primary text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_language: Option<String>,
    /// Plain-text description or summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Resources this one was derived from.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub is_based_on: Vec<Metadata>,
    /// Series or periodical this resource belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<CreativeWorkSeries>,
    /// People or organizations credited with authorship.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creator: Vec<Creator>,
    /// Brand associated with the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<Brand>,
    /// Publication timestamp as provided by the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    /// Last-modification timestamp as provided by the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    /// Attached or referenced images.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<MediaObject>,
    /// Attached or referenced videos.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub video: Vec<MediaObject>,
    /// Attached or referenced audio tracks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audio: Vec<AudioObject>,
    /// Tags and hashtags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<DefinedTerm>,
    /// Content labels such as sensitivity markers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<SelfLabel>,
    /// Raw per-source records, keyed by the resolver that produced them.
    #[serde(skip_serializing_if = "ResolverExtensions::is_empty")]
    pub resolver: ResolverExtensions,
}

/// Text with optional pronunciation and language hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PronounceableText {
    /// The text itself.
    pub text_value: String,
    /// Reading aid, e.g. furigana.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic_text: Option<String>,
    /// BCP 47 language tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_language: Option<String>,
}

impl PronounceableText {
    /// Wraps plain text without pronunciation or language hints.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text_value: text.into(),
            phonetic_text: None,
            in_language: None,
        }
    }
}

/// An image or video reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaObject {
    /// URL of the media file.
    pub content_url: String,
    /// Display name, e.g. alt text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PronounceableText>,
    /// MIME type of the media file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    /// Intrinsic dimensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<Ratio>,
    /// Content labels applying to this media only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<SelfLabel>,
}

/// An audio reference. Unlike [`MediaObject`] it carries no dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioObject {
    /// URL of the audio file.
    pub content_url: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PronounceableText>,
    /// MIME type of the audio file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    /// Content labels applying to this track only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<SelfLabel>,
}

/// Intrinsic width and height of a media object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub width: u32,
    pub height: u32,
}

/// A tag or category term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefinedTerm {
    /// Term text.
    pub name: PronounceableText,
}

/// A self-applied content label, e.g. `sexual` for age-restricted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfLabel {
    pub val: String,
}

impl SelfLabel {
    /// Label applied to content flagged as sexual or age-restricted.
    #[must_use]
    pub fn sexual() -> Self {
        Self {
            val: "sexual".into(),
        }
    }
}

/// A person or organization credited as creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Creator {
    Person(Person),
    Organization(Organization),
}

/// An individual creator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PronounceableText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaObject>,
}

/// An organizational creator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PronounceableText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaObject>,
}

/// A series or periodical a resource belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreativeWorkSeries {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PronounceableText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A brand associated with a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Brand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<PronounceableText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaObject>,
}

/// Per-source raw records attached to a [`Metadata`].
///
/// Keys identify the producing resolver (`html`, `activityStreams`,
/// `schemaOrg`, `at`, or a site-specific name). Entries are additive: once a
/// resolver has claimed a key it is never overwritten, so generic extraction
/// cannot clobber what a more specific resolver recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolverExtensions(IndexMap<String, serde_json::Value>);

impl ResolverExtensions {
    /// Key used by the HTML head extractor.
    pub const HTML: &'static str = "html";
    /// Key used by the Activity Streams extractor.
    pub const ACTIVITY_STREAMS: &'static str = "activityStreams";
    /// Key used by the Schema.org extractor.
    pub const SCHEMA_ORG: &'static str = "schemaOrg";
    /// Key carrying an AT Protocol URI hint.
    pub const AT: &'static str = "at";

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Inserts a record unless the key is already claimed.
    ///
    /// Returns whether the record was inserted. Payloads that fail to
    /// serialize are skipped.
    pub fn insert_once<T: Serialize>(&mut self, key: &str, payload: &T) -> bool {
        if self.0.contains_key(key) {
            return false;
        }
        let Ok(value) = serde_json::to_value(payload) else {
            return false;
        };
        self.0.insert(key.to_owned(), value);
        true
    }

    /// The raw record stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Deserializes the record stored under `key`.
    #[must_use]
    pub fn decode<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        serde_json::from_value(self.0.get(key)?.clone()).ok()
    }
}

/// Outcome of a resolution attempt.
///
/// `value` may be absent while `response` is present: the request succeeded
/// but the document yielded nothing usable.
#[derive(Debug, Clone, Default)]
pub struct ResolveResult {
    /// Extracted metadata, when any.
    pub value: Option<Metadata>,
    /// Status and headers of the response the metadata came from.
    pub response: Option<ResponseInfo>,
}

impl ResolveResult {
    /// A result carrying neither metadata nor a response.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Status and headers of a consumed response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
}
