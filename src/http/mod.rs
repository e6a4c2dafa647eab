//! Generic HTTP resolution
//!
//! The entry point for URLs no site-specific resolver claims. Negotiates
//! for AS2 first and markup second, honors alternate representations
//! advertised in the `Link` response header, and dispatches the response
//! to an extractor by its classified content type.

mod content_disposition;
mod link_header;

use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ResolveError, Result, is_temporary_status};
use crate::media_type::{self, MediaType};
use crate::metadata::{
    AudioObject, MediaObject, Metadata, PronounceableText, ResolveResult, ResolverExtensions,
};
use crate::options::{DiscoveredAlternate, ResolveOptions};
use crate::transport::{self, Request, Response};
use crate::{activity_streams, html};

/// `Accept` header for the initial request. `*/*` is deliberately absent;
/// Mastodon serves HTML instead of AS2 when it sees it.
const ACCEPT: &str = "application/ld+json;profile=\"https://www.w3.org/ns/activitystreams\",application/activity+json;q=0.9,text/html,application/xhtml+xml,application/xml;q=0.8";

/// AT Protocol URI hint stored under the `at` resolver key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtRecord {
    pub uri: String,
}

/// An alternate representation advertised via the `Link` header.
#[derive(Debug, Clone, PartialEq)]
enum AlternateLink {
    ActivityStreams(Url),
    AtUri(String),
}

/// Resolves a URL with content negotiation and extractor dispatch.
///
/// Non-`http(s)` URLs resolve to an empty result without any request.
///
/// # Errors
///
/// Returns an error for temporary HTTP statuses, network failures, and
/// temporary failures inside a delegated extractor.
pub async fn resolve(url: &Url, options: &ResolveOptions) -> Result<ResolveResult> {
    if !matches!(url.scheme(), "http" | "https") {
        return Ok(ResolveResult::empty());
    }

    let request = Request::get().header(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    let response = transport::fetch(options, url, request).await?;

    if is_temporary_status(response.status) {
        let snapshot = response.snapshot();
        response.cancel();
        return Err(ResolveError::from_status(snapshot));
    }

    let alternate = response
        .headers
        .get(header::LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| alternate_link(value, &response.url));

    for prefer in &options.prefer_discovered {
        match prefer {
            DiscoveredAlternate::ActivityStreams => {
                if let Some(AlternateLink::ActivityStreams(target)) = &alternate {
                    let target = target.clone();
                    tracing::debug!(url = %target, "following AS2 alternate");
                    response.cancel();
                    return activity_streams::resolve(&target, options).await;
                }
            }
            DiscoveredAlternate::AtUri => {
                if let Some(AlternateLink::AtUri(uri)) = &alternate {
                    let info = response.info();
                    let uri = uri.clone();
                    response.cancel();
                    let mut value = Metadata {
                        url: Some(uri.clone()),
                        ..Metadata::default()
                    };
                    value
                        .resolver
                        .insert_once(ResolverExtensions::AT, &AtRecord { uri });
                    return Ok(ResolveResult {
                        value: Some(value),
                        response: Some(info),
                    });
                }
            }
        }
    }

    let info = response.info();
    let content_type = response.content_type().map(str::to_owned);

    let mut value = None;
    match content_type.as_deref().and_then(media_type::classify) {
        Some(MediaType::Html | MediaType::Xml) => {
            let extraction = html::extract(response, options).await?;
            return Ok(ResolveResult {
                value: Some(extraction.value),
                response: Some(info),
            });
        }
        Some(MediaType::ActivityStreams) => {
            return Ok(ResolveResult {
                value: activity_streams::extract(response, options).await?,
                response: Some(info),
            });
        }
        Some(kind @ (MediaType::Image | MediaType::Video | MediaType::Audio)) => {
            value = Some(media_metadata(kind, response, content_type));
        }
        // TODO: sniff the body before giving up on unclassified types.
        None => response.cancel(),
    }

    if let Some(AlternateLink::AtUri(uri)) = alternate {
        value
            .get_or_insert_with(Metadata::default)
            .resolver
            .insert_once(ResolverExtensions::AT, &AtRecord { uri });
    }

    Ok(ResolveResult {
        value,
        response: Some(info),
    })
}

/// Builds the minimal metadata for a direct media response. The body is
/// never read; the display name comes from `Content-Disposition` or the
/// URL's last path segment.
fn media_metadata(kind: MediaType, response: Response, encoding_format: Option<String>) -> Metadata {
    let name = filename_for(&response).map(PronounceableText::plain);
    let content_url = response.url.to_string();
    response.cancel();

    let mut value = Metadata {
        name,
        ..Metadata::default()
    };
    match kind {
        MediaType::Video => value.video.push(MediaObject {
            content_url,
            encoding_format,
            ..MediaObject::default()
        }),
        MediaType::Audio => value.audio.push(AudioObject {
            content_url,
            encoding_format,
            ..AudioObject::default()
        }),
        _ => value.image.push(MediaObject {
            content_url,
            encoding_format,
            ..MediaObject::default()
        }),
    }
    value
}

fn filename_for(response: &Response) -> Option<String> {
    let declared = response
        .headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(content_disposition::filename)
        .filter(|name| !name.is_empty());
    if declared.is_some() {
        return declared;
    }
    response
        .url
        .path()
        .split('/')
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
}

/// First `rel=alternate` entry that is either an `at://` URI (kept as is)
/// or an AS2 representation (target resolved against the response URL).
fn alternate_link(header: &str, base: &Url) -> Option<AlternateLink> {
    for entry in link_header::parse(header) {
        if !entry.has_rel("alternate") {
            continue;
        }
        if entry.target.starts_with("at://") {
            return Some(AlternateLink::AtUri(entry.target));
        }
        let Some(declared) = entry.param("type") else {
            continue;
        };
        if media_type::classify(declared) == Some(MediaType::ActivityStreams) {
            if let Ok(target) = base.join(&entry.target) {
                return Some(AlternateLink::ActivityStreams(target));
            }
        }
    }
    None
}
