//! Activity Streams 2.0 resolution and extraction
//!
//! Objects are fetched with AS2 content negotiation, compacted against the
//! normative context plus the security vocabulary and a small extension
//! context, and read into the shared metadata model. The object's `id` must
//! sit on the same origin as the response URL; anything else is treated as
//! untrustworthy and dropped. Authors referenced by IRI are dereferenced
//! with the same origin discipline.

use std::sync::LazyLock;

use reqwest::header::{self, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{ResolveError, Result, is_temporary_status};
use crate::json_ld::{
    self, DocumentLoader, JsonLdValue, LanguageEntry, NodeObject, Scalar, first_of_language_map,
};
use crate::media_type::{self, MediaType};
use crate::metadata::{
    AudioObject, Creator, DefinedTerm, MediaObject, Metadata, Person, PronounceableText, Ratio,
    ResolveResult, ResolverExtensions, SelfLabel,
};
use crate::options::ResolveOptions;
use crate::transport::{self, Request, Response, TransportError};

/// `Accept` header for AS2 content negotiation.
const ACCEPT: &str =
    "application/ld+json;profile=\"https://www.w3.org/ns/activitystreams\",application/activity+json";

static COMPACT_CONTEXT: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!([
        json_ld::miscellany_context(),
        "https://w3id.org/security/v1",
        "https://www.w3.org/ns/activitystreams"
    ])
});

/// Raw record stored under the `activityStreams` resolver key.
#[derive(Debug, Serialize)]
pub struct ActivityStreamsRecord {
    /// The compacted object itself.
    pub object: NodeObject,
    /// The object's author: an embedded or dereferenced node, or the bare
    /// IRI when dereferencing was not possible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorRecord>,
}

/// An author reference in an [`ActivityStreamsRecord`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ActorRecord {
    Node(NodeObject),
    Iri(String),
}

/// Fetches `url` with AS2 content negotiation and extracts metadata.
///
/// Responses that are not successful AS2 documents resolve to an empty
/// value with the response attached.
///
/// # Errors
///
/// Returns an error for temporary HTTP statuses, network failures and
/// unresolvable remote contexts.
pub async fn resolve(url: &Url, options: &ResolveOptions) -> Result<ResolveResult> {
    let request = Request::get().header(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    let response = transport::fetch(options, url, request).await?;
    let info = response.info();

    if is_temporary_status(response.status) {
        let snapshot = response.snapshot();
        response.cancel();
        return Err(ResolveError::from_status(snapshot));
    }
    if !response.is_success() {
        response.cancel();
        return Ok(ResolveResult {
            value: None,
            response: Some(info),
        });
    }
    if response.content_type().and_then(media_type::classify) != Some(MediaType::ActivityStreams) {
        response.cancel();
        return Ok(ResolveResult {
            value: None,
            response: Some(info),
        });
    }

    let value = extract(response, options).await?;
    Ok(ResolveResult {
        value,
        response: Some(info),
    })
}

/// Extracts metadata from an AS2 response body.
///
/// # Errors
///
/// Returns an error when the body cannot be read or a remote context
/// cannot be resolved right now.
pub async fn extract(response: Response, options: &ResolveOptions) -> Result<Option<Metadata>> {
    let response_url = response.url.clone();
    let json = match response.json().await {
        Ok(json) => json,
        Err(TransportError::Decode(err)) => {
            tracing::debug!(url = %response_url, error = %err, "response body is not JSON");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let loader = DocumentLoader::new(options);
    let mut object = match json_ld::compact(
        &json,
        &COMPACT_CONTEXT,
        loader,
        Some(json_ld::activity_streams_context()),
    )
    .await
    {
        Ok(object) => object,
        Err(err) if err.is_temporary() => {
            return Err(ResolveError::new(format!(
                "Unable to resolve JSON-LD context(s) imported from {response_url}"
            ))
            .with_source(err));
        }
        Err(err) => {
            tracing::debug!(url = %response_url, error = %err, "not a usable AS2 document");
            return Ok(None);
        }
    };

    // The object only speaks for the origin it was served from.
    let Some(id) = object.str_value("id").map(str::to_owned) else {
        return Ok(None);
    };
    let Ok(id_url) = Url::parse(&id) else {
        return Ok(None);
    };
    if id_url.origin() != response_url.origin() {
        tracing::debug!(url = %response_url, id = %id, "object id is off-origin");
        return Ok(None);
    }

    let actor = hydrate_actor(&mut object, &response_url.origin(), options).await?;
    let creator = match &actor {
        Some(ActorRecord::Node(node)) => vec![Creator::Person(person_from_actor(node))],
        _ => Vec::new(),
    };

    let url = match parse_as_link(object.get("url")) {
        Some(link) => link.href,
        None => id,
    };

    let mut in_language = None;
    let mut description = None;
    // The summary conventionally carries a content warning; it is joined
    // with the content because the metadata is meant to be displayed in
    // contexts that are already gated.
    if let Some(entry) = first_lang_string(&object, "contentMap", "content") {
        in_language = entry.language.map(str::to_owned);
        description = Some(entry.value.to_owned());
    }
    if let Some(entry) = first_lang_string(&object, "summaryMap", "summary") {
        if in_language.is_none() {
            in_language = entry.language.map(str::to_owned);
        }
        description = Some(match description {
            Some(content) if !content.is_empty() => format!("{}\n\n{content}", entry.value),
            _ => entry.value.to_owned(),
        });
    }
    let mut name = None;
    if let Some(entry) = first_lang_string(&object, "nameMap", "name") {
        if in_language.is_none() {
            in_language = entry.language.map(str::to_owned);
        }
        if !entry.value.is_empty() {
            name = Some(PronounceableText::plain(entry.value));
        }
    }

    let date_published = object.str_value("published").map(str::to_owned);
    let date_modified = object.str_value("updated").map(str::to_owned);
    let keywords = keywords_from_hashtags(&object);
    let labels = if is_sensitive(&object) {
        vec![SelfLabel::sexual()]
    } else {
        Vec::new()
    };

    let mut image = Vec::new();
    let mut video = Vec::new();
    let mut audio = Vec::new();
    for attachment in object.values("attachment") {
        if let Some(node) = attachment.as_node() {
            process_attachment(node, &mut image, &mut video, &mut audio);
        }
    }

    let mut metadata = Metadata {
        url: Some(url),
        name,
        in_language,
        description,
        creator,
        date_published,
        date_modified,
        image,
        video,
        audio,
        keywords,
        labels,
        ..Metadata::default()
    };
    metadata.resolver.insert_once(
        ResolverExtensions::ACTIVITY_STREAMS,
        &ActivityStreamsRecord { object, actor },
    );
    Ok(Some(metadata))
}

/// Resolves the object's author from its first `attributedTo` value.
///
/// An embedded node is used as is, except that an `id` that is not a
/// same-origin string is removed in place. A bare IRI is dereferenced with
/// AS2 negotiation; a fetched node whose `id` does not sit on the IRI's own
/// origin keeps its fields but loses the `id`. When dereferencing hits a
/// permanent context failure the IRI itself is kept as the record.
async fn hydrate_actor(
    object: &mut NodeObject,
    origin: &url::Origin,
    options: &ResolveOptions,
) -> Result<Option<ActorRecord>> {
    let Some(value) = object.get_mut("attributedTo") else {
        return Ok(None);
    };
    let entry = match value {
        JsonLdValue::Set(items) => match items.first_mut() {
            Some(first) => first,
            None => return Ok(None),
        },
        other => other,
    };
    let id = match entry {
        JsonLdValue::Node(node) => {
            if node.contains_key("id") {
                let same_origin = node.str_value("id").is_some_and(|id| {
                    Url::parse(id).is_ok_and(|parsed| parsed.origin() == *origin)
                });
                if !same_origin {
                    node.remove("id");
                }
            }
            return Ok(Some(ActorRecord::Node(node.clone())));
        }
        JsonLdValue::Scalar(Scalar::String(id)) => id.clone(),
        _ => return Ok(None),
    };

    let Ok(actor_url) = Url::parse(&id) else {
        return Ok(None);
    };
    let request = Request::get().header(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    let response = transport::fetch(options, &actor_url, request).await?;
    if is_temporary_status(response.status) {
        let snapshot = response.snapshot();
        response.cancel();
        return Err(ResolveError::from_status(snapshot));
    }
    if !response.is_success() {
        response.cancel();
        return Ok(None);
    }
    if response.content_type().and_then(media_type::classify) != Some(MediaType::ActivityStreams) {
        response.cancel();
        return Ok(None);
    }
    let json = match response.json().await {
        Ok(json) => json,
        Err(TransportError::Decode(err)) => {
            tracing::debug!(id = %id, error = %err, "actor body is not JSON");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let loader = DocumentLoader::new(options);
    let mut node = match json_ld::compact(&json, &COMPACT_CONTEXT, loader, None).await {
        Ok(node) => node,
        Err(err) if err.is_temporary() => {
            return Err(ResolveError::new(format!(
                "Unable to resolve JSON-LD context(s) imported from {id}"
            ))
            .with_source(err));
        }
        Err(err) => {
            tracing::debug!(id = %id, error = %err, "not a usable actor document");
            return Ok(Some(ActorRecord::Iri(id)));
        }
    };

    let same_origin = node
        .str_value("id")
        .is_some_and(|node_id| Url::parse(node_id).is_ok_and(|parsed| parsed.origin() == actor_url.origin()));
    if !same_origin {
        tracing::debug!(id = %id, "stripping off-origin actor id");
        node.remove("id");
    }
    Ok(Some(ActorRecord::Node(node)))
}

fn person_from_actor(actor: &NodeObject) -> Person {
    let name = first_lang_string(actor, "nameMap", "name")
        .map(|entry| entry.value.to_owned())
        .filter(|name| !name.is_empty());
    let url = parse_as_link(actor.get("url"))
        .map(|link| link.href)
        .or_else(|| actor.str_value("id").map(str::to_owned));
    let description =
        first_lang_string(actor, "summaryMap", "summary").map(|entry| entry.value.to_owned());
    Person {
        name: name.map(PronounceableText::plain),
        url,
        description,
        image: None,
    }
}

fn keywords_from_hashtags(object: &NodeObject) -> Vec<DefinedTerm> {
    object
        .values("tag")
        .filter_map(|tag| {
            let node = tag.as_node()?;
            if !node.strings("type").any(|t| t == "Hashtag") {
                return None;
            }
            let name = node.str_value("name")?;
            Some(DefinedTerm {
                name: PronounceableText::plain(name),
            })
        })
        .collect()
}

fn process_attachment(
    node: &NodeObject,
    image: &mut Vec<MediaObject>,
    video: &mut Vec<MediaObject>,
    audio: &mut Vec<AudioObject>,
) {
    let Some(link) = parse_as_link(node.get("url")) else {
        return;
    };
    let name = node
        .str_value("name")
        .filter(|name| !name.is_empty())
        .map(PronounceableText::plain);

    let mut encoding_format = None;
    let kind = match link.media_type.as_deref().filter(|mt| !mt.is_empty()) {
        Some(mt) => {
            encoding_format = Some(mt.to_owned());
            media_type::classify(mt)
        }
        None => match node.str_value("type") {
            Some("Image") => Some(MediaType::Image),
            Some("Video") => Some(MediaType::Video),
            Some("Audio") => Some(MediaType::Audio),
            Some("Document") => {
                // Documents are only usable when they declare what they are.
                let Some(mt) = node.str_value("mediaType") else {
                    return;
                };
                encoding_format = Some(mt.to_owned());
                media_type::classify(mt)
            }
            _ => None,
        },
    };

    let ratio = link.ratio.or_else(|| {
        let width = node.get("width").and_then(JsonLdValue::as_u32)?;
        let height = node.get("height").and_then(JsonLdValue::as_u32)?;
        Some(Ratio { width, height })
    });
    let labels = if is_sensitive(node) {
        vec![SelfLabel::sexual()]
    } else {
        Vec::new()
    };

    match kind {
        Some(MediaType::Image) => image.push(MediaObject {
            content_url: link.href,
            name,
            encoding_format,
            ratio,
            labels,
        }),
        Some(MediaType::Video) => video.push(MediaObject {
            content_url: link.href,
            name,
            encoding_format,
            ratio,
            labels,
        }),
        Some(MediaType::Audio) => audio.push(AudioObject {
            content_url: link.href,
            name,
            encoding_format,
            labels,
        }),
        _ => {}
    }
}

/// A normalized `xsd:anyURI | as:Link` value.
struct AsLink {
    href: String,
    media_type: Option<String>,
    ratio: Option<Ratio>,
}

fn parse_as_link(value: Option<&JsonLdValue>) -> Option<AsLink> {
    let first = value?.first()?;
    if let Some(href) = first.as_str() {
        return Some(AsLink {
            href: href.to_owned(),
            media_type: None,
            ratio: None,
        });
    }
    let node = first.as_node()?;
    let href = node.str_value("href")?.to_owned();
    let media_type = node.str_value("mediaType").map(str::to_owned);
    let ratio = match (
        node.get("width").and_then(JsonLdValue::as_u32),
        node.get("height").and_then(JsonLdValue::as_u32),
    ) {
        (Some(width), Some(height)) => Some(Ratio { width, height }),
        _ => None,
    };
    Some(AsLink {
        href,
        media_type,
        ratio,
    })
}

/// Publishers spell the sensitivity flag three ways depending on how their
/// context declares (or forgets to declare) the term, so all three keys
/// that can come out of compaction are checked.
fn is_sensitive(object: &NodeObject) -> bool {
    ["sensitive", "as:sensitive", "_:sensitive"]
        .iter()
        .any(|key| object.first(key).and_then(JsonLdValue::as_bool) == Some(true))
}

/// First string from the language-map spelling of a property, falling back
/// to the plain spelling.
fn first_lang_string<'a>(
    node: &'a NodeObject,
    map_key: &str,
    plain_key: &str,
) -> Option<LanguageEntry<'a>> {
    if let Some(value) = node.get(map_key) {
        if let Some(entry) = first_of_language_map(value) {
            return Some(entry);
        }
    }
    let value = node.first(plain_key)?.as_str()?;
    Some(LanguageEntry {
        language: None,
        value,
    })
}
