//! Schema.org extraction from embedded JSON-LD
//!
//! Documents are compacted against the Schema.org context and read through
//! the typed value model. Extraction is tolerant: anything that does not
//! match the expected shape is skipped rather than failing the resolution.

use std::sync::LazyLock;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::json_ld::{self, DocumentLoader, JsonLdValue, NodeObject};
use crate::metadata::{
    AudioObject, Creator, DefinedTerm, MediaObject, Metadata, Organization, Person,
    PronounceableText, Ratio, ResolverExtensions,
};
use crate::options::ResolveOptions;

static COMPACT_CONTEXT: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!([
        "https://schema.org/",
        // Compact to the @id and @type keywords instead of these shorthand
        // terms; the keywords are more common in published documents and
        // carry better type information.
        { "id": null, "type": null }
    ])
});

/// Raw compacted record stored under the `schemaOrg` resolver key.
#[derive(Serialize)]
struct SchemaOrgRecord<'a> {
    #[serde(rename = "@context")]
    context: &'a str,
    #[serde(flatten)]
    node: &'a NodeObject,
}

/// Extracts metadata from a parsed JSON-LD document.
///
/// Returns `Ok(None)` when the document cannot be processed for a permanent
/// reason.
///
/// # Errors
///
/// Unresolvable remote contexts that may load later surface as errors.
pub async fn extract(json: &Value, options: &ResolveOptions) -> Result<Option<Metadata>> {
    let loader = DocumentLoader::new(options);
    let node = match json_ld::compact(json, &COMPACT_CONTEXT, loader, None).await {
        Ok(node) => node,
        Err(err) if err.is_temporary() => return Err(err.into()),
        Err(err) => {
            tracing::debug!(error = %err, "skipping unprocessable JSON-LD document");
            return Ok(None);
        }
    };
    Ok(Some(build(node)))
}

fn build(node: NodeObject) -> Metadata {
    let mut image: Vec<MediaObject> = node
        .values("image")
        .filter_map(|value| media_object(value, "ImageObject"))
        .collect();
    if image.is_empty() {
        if let Some(url) = thumbnail_url(&node) {
            image = vec![MediaObject {
                content_url: url.to_owned(),
                ..MediaObject::default()
            }];
        }
    }
    let video: Vec<MediaObject> = node
        .values("video")
        .filter_map(|value| media_object(value, "VideoObject"))
        .collect();
    let audio: Vec<AudioObject> = node.values("audio").filter_map(audio_object).collect();

    let mut metadata = Metadata {
        kind: node
            .first("@type")
            .and_then(JsonLdValue::as_str)
            .map(str::to_owned),
        url: node.first_str("url").map(str::to_owned),
        name: first_pronounceable(node.get("name")),
        in_language: node.first_str("inLanguage").map(str::to_owned),
        description: node.first_str("description").map(str::to_owned),
        creator: node.values("creator").filter_map(creator).collect(),
        date_published: node.first_str("datePublished").map(str::to_owned),
        date_modified: node.first_str("dateModified").map(str::to_owned),
        image,
        video,
        audio,
        keywords: node.values("keywords").filter_map(defined_term).collect(),
        ..Metadata::default()
    };
    metadata.resolver.insert_once(
        ResolverExtensions::SCHEMA_ORG,
        &SchemaOrgRecord {
            context: "https://schema.org/",
            node: &node,
        },
    );
    metadata
}

fn pronounceable_text(value: &JsonLdValue) -> Option<PronounceableText> {
    if let Some(text) = value.as_str() {
        return Some(PronounceableText::plain(text));
    }
    let node = value.as_node()?;
    let text_value = node
        .first_str("textValue")
        .filter(|text| !text.is_empty())?;
    Some(PronounceableText {
        text_value: text_value.to_owned(),
        phonetic_text: node.first_str("phoneticText").map(str::to_owned),
        in_language: node.first_str("inLanguage").map(str::to_owned),
    })
}

fn first_pronounceable(value: Option<&JsonLdValue>) -> Option<PronounceableText> {
    value?.iter().find_map(pronounceable_text)
}

fn creator(value: &JsonLdValue) -> Option<Creator> {
    let node = value.as_node()?;
    let kind = node
        .strings("@type")
        .find(|t| *t == "Person" || *t == "Organization")?;
    let url = node
        .first_str("url")
        .or_else(|| node.str_value("@id"))
        .or_else(|| node.first_str("sameAs"))
        .map(str::to_owned);
    let description = node.first_str("description").map(str::to_owned);
    let image = node
        .values("image")
        .find_map(|value| media_object(value, "ImageObject"));
    Some(if kind == "Organization" {
        Creator::Organization(Organization {
            name: None,
            url,
            description,
            image,
        })
    } else {
        Creator::Person(Person {
            name: None,
            url,
            description,
            image,
        })
    })
}

fn media_object(value: &JsonLdValue, expected: &str) -> Option<MediaObject> {
    let node = value.as_node()?;
    if !node.strings("@type").any(|t| t == expected) {
        return None;
    }
    let mut content_url = node.first_str("contentUrl").filter(|url| !url.is_empty());
    if content_url.is_none() && expected == "ImageObject" {
        content_url = thumbnail_url(node);
    }
    let content_url = content_url?.to_owned();

    let width = node.first("width").and_then(JsonLdValue::as_u32);
    let height = node.first("height").and_then(JsonLdValue::as_u32);
    let ratio = match (width, height) {
        (Some(width), Some(height)) => Some(Ratio { width, height }),
        _ => None,
    };
    Some(MediaObject {
        content_url,
        name: first_pronounceable(node.get("name")),
        encoding_format: node.first_str("encodingFormat").map(str::to_owned),
        ratio,
        labels: Vec::new(),
    })
}

fn audio_object(value: &JsonLdValue) -> Option<AudioObject> {
    let media = media_object(value, "AudioObject")?;
    Some(AudioObject {
        content_url: media.content_url,
        name: media.name,
        encoding_format: media.encoding_format,
        labels: Vec::new(),
    })
}

fn defined_term(value: &JsonLdValue) -> Option<DefinedTerm> {
    let node = value.as_node()?;
    // The name must sit directly under the key; a set of names does not
    // count as a term.
    let name = pronounceable_text(node.get("name")?)?;
    Some(DefinedTerm { name })
}

fn thumbnail_url(node: &NodeObject) -> Option<&str> {
    if let Some(url) = node.first_str("thumbnailUrl").filter(|url| !url.is_empty()) {
        return Some(url);
    }
    node.get("thumbnail")?.as_node()?.first_str("contentUrl")
}
