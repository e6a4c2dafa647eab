//! HTML head extraction
//!
//! Walks the direct children of `<head>` only; body scanning is left to
//! host-specific resolvers that need it. Discovered AS2 alternates are
//! resolved eagerly, JSON-LD script blocks go through the Schema.org
//! extractor, and everything merges under a fixed precedence: AS2 over
//! Schema.org over Open Graph over plain meta tags.

mod open_graph;

pub use open_graph::{OgAudio, OgLocale, OgMedia, OpenGraph};

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::error::Result;
use crate::media_type::{self, MediaType};
use crate::metadata::{
    AudioObject, Creator, MediaObject, Metadata, Person, PronounceableText, Ratio,
    ResolverExtensions, SelfLabel,
};
use crate::options::ResolveOptions;
use crate::transport::Response;
use crate::{activity_streams, schema_org, util};

/// Rating tokens that mark a page as adult content. The second is the
/// RTA label string published by rtalabel.org.
const ADULT_RATINGS: [&str; 2] = ["adult", "RTA-5042-1996-1400-1577-RTA"];

static HEAD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head").expect("static selector is valid"));

/// Plain `<meta name>` and `<link>` values from a document head, stored
/// under the `html` resolver key together with the Open Graph record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlHeadExt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og: Option<OpenGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creator: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
}

impl HtmlHeadExt {
    fn apply_meta_name(&mut self, name: &str, content: &str) {
        match name {
            "creator" => self.creator.push(content.to_owned()),
            "keywords" => self.keywords = content.split(',').map(str::to_owned).collect(),
            "author" => self.author = Some(content.to_owned()),
            "publisher" => self.publisher = Some(content.to_owned()),
            "robots" => self.robots = Some(content.to_owned()),
            "description" => self.description = Some(content.to_owned()),
            "rating" => self.rating = Some(content.to_owned()),
            _ => {}
        }
    }

    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.canonical.is_none()
            && self.og.is_none()
            && self.author.is_none()
            && self.creator.is_empty()
            && self.publisher.is_none()
            && self.robots.is_none()
            && self.description.is_none()
            && self.keywords.is_empty()
            && self.rating.is_none()
    }
}

/// Outcome of HTML extraction: the merged metadata plus the decoded body
/// for resolvers that scan beyond the head.
#[derive(Debug)]
pub struct HtmlExtraction {
    pub value: Metadata,
    pub body: String,
}

/// Extracts metadata from an HTML response.
///
/// # Errors
///
/// Returns an error when the body cannot be read, or when a discovered AS2
/// alternate or an embedded JSON-LD block fails for a temporary reason.
pub async fn extract(response: Response, options: &ResolveOptions) -> Result<HtmlExtraction> {
    let base_url = response.url.clone();
    let bytes = response.bytes().await?;
    let body = String::from_utf8_lossy(&bytes).into_owned();

    let HeadScan {
        mut head,
        og,
        title,
        as2_alternates,
        ld_json,
    } = scan_head(&body, &base_url);

    let mut as2_value = None;
    for alternate in &as2_alternates {
        tracing::debug!(url = %alternate, "resolving AS2 alternate");
        let result = activity_streams::resolve(alternate, options).await?;
        if result.value.is_some() {
            as2_value = result.value;
        }
    }

    let mut schema_org_value = None;
    for blob in &ld_json {
        let Some(json) = util::robust_parse_json(blob) else {
            continue;
        };
        if let Some(value) = schema_org::extract(&json, options).await? {
            schema_org_value = Some(value);
        }
    }

    let mut value = match as2_value {
        Some(mut value) => {
            // An independent Schema.org result contributes its raw record
            // only; it never overrides AS2 fields.
            if let Some(record) = schema_org_value
                .as_ref()
                .and_then(|meta| meta.resolver.get(ResolverExtensions::SCHEMA_ORG))
            {
                value
                    .resolver
                    .insert_once(ResolverExtensions::SCHEMA_ORG, record);
            }
            value
        }
        None => schema_org_value.unwrap_or_default(),
    };

    if let Some(title) = &og.title {
        if value.name.is_none() {
            value.name = Some(PronounceableText::plain(title));
        }
    }
    if value.image.is_empty() {
        value.image = og.image.iter().map(media_from_og).collect();
    }
    if value.video.is_empty() {
        value.video = og.video.iter().map(media_from_og).collect();
    }
    if value.audio.is_empty() {
        value.audio = og.audio.iter().map(audio_from_og).collect();
    }

    let og_url = og.url.clone();
    if !og.is_empty() {
        head.og = Some(og);
    }

    head.title = title.filter(|title| !title.is_empty());
    if let Some(title) = &head.title {
        if value.name.is_none() {
            value.name = Some(PronounceableText::plain(title));
        }
    }

    if head
        .rating
        .as_deref()
        .is_some_and(|rating| ADULT_RATINGS.contains(&rating))
    {
        value.labels.push(SelfLabel::sexual());
    }

    if !head.is_empty() {
        value.resolver.insert_once(ResolverExtensions::HTML, &head);
    }

    if value.url.as_deref().is_none_or(str::is_empty) {
        value.url = og_url.or_else(|| head.canonical.clone());
    }
    if value.description.as_deref().is_none_or(str::is_empty) {
        value.description = head.description.clone();
    }
    if value.creator.is_empty() {
        value.creator = head
            .creator
            .iter()
            .map(|name| {
                Creator::Person(Person {
                    name: Some(PronounceableText::plain(name)),
                    ..Person::default()
                })
            })
            .collect();
    }

    Ok(HtmlExtraction { value, body })
}

#[derive(Default)]
struct HeadScan {
    head: HtmlHeadExt,
    og: OpenGraph,
    title: Option<String>,
    as2_alternates: Vec<Url>,
    ld_json: Vec<String>,
}

/// Collects everything needed from the head in one synchronous pass. The
/// parsed document is not `Send`, so it must be dropped before any await;
/// only owned data leaves this function.
fn scan_head(html: &str, base: &Url) -> HeadScan {
    let document = Html::parse_document(html);
    let mut scan = HeadScan::default();
    let Some(head) = document.select(&HEAD_SELECTOR).next() else {
        return scan;
    };

    for child in head.children() {
        let Some(element) = ElementRef::wrap(child) else {
            continue;
        };
        match element.value().name() {
            "meta" => {
                let Some(content) = element.value().attr("content").filter(|c| !c.is_empty())
                else {
                    continue;
                };
                if let Some(name) = element.value().attr("name") {
                    scan.head.apply_meta_name(name, content);
                }
                if let Some(property) = element.value().attr("property") {
                    scan.og.apply(property, content);
                }
            }
            "link" => {
                let Some(href) = element.value().attr("href").filter(|h| !h.is_empty()) else {
                    continue;
                };
                let Ok(href) = base.join(href) else {
                    continue;
                };
                let rels = element.value().attr("rel").unwrap_or_default();
                for rel in rels.split_ascii_whitespace() {
                    match rel {
                        "alternate" => {
                            let declared = element.value().attr("type").unwrap_or_default();
                            if media_type::classify(declared) == Some(MediaType::ActivityStreams) {
                                scan.as2_alternates.push(href.clone());
                            }
                        }
                        "canonical" => scan.head.canonical = Some(href.to_string()),
                        _ => {}
                    }
                }
            }
            "script" => {
                if element.value().attr("type") == Some("application/ld+json") {
                    scan.ld_json.push(element.text().collect());
                }
            }
            "title" => {
                if scan.title.is_none() {
                    scan.title = Some(collapse_whitespace(&element.text().collect::<String>()));
                }
            }
            _ => {}
        }
    }
    scan
}

/// Strips and collapses ASCII whitespace the way `document.title` does.
fn collapse_whitespace(text: &str) -> String {
    text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

fn media_from_og(og: &OgMedia) -> MediaObject {
    let ratio = match (og.width, og.height) {
        (Some(width), Some(height)) => Some(Ratio { width, height }),
        _ => None,
    };
    MediaObject {
        content_url: og.secure_url.clone().unwrap_or_else(|| og.url.clone()),
        name: og.alt.clone().map(PronounceableText::plain),
        encoding_format: og.kind.clone(),
        ratio,
        labels: Vec::new(),
    }
}

fn audio_from_og(og: &OgAudio) -> AudioObject {
    AudioObject {
        content_url: og.secure_url.clone().unwrap_or_else(|| og.url.clone()),
        name: None,
        encoding_format: og.kind.clone(),
        labels: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{CONTENT_TYPE, HeaderMap};
    use serde_json::json;

    use super::*;
    use crate::transport::BufferedBody;

    fn html_response(url: &str, body: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "text/html; charset=utf-8".parse().unwrap());
        Response::new(
            200,
            headers,
            Url::parse(url).unwrap(),
            Box::new(BufferedBody::new(body.to_owned())),
        )
    }

    async fn extracted(body: &str) -> Metadata {
        let response = html_response("https://example.com/page", body);
        extract(response, &ResolveOptions::default())
            .await
            .unwrap()
            .value
    }

    // -- open graph ----------------------------------------------------------

    #[test]
    fn og_title_becomes_name() {
        tokio_test::block_on(async {
            let value = extracted(r#"<html><head><meta property="og:title" content="Foo"></head></html>"#).await;
            assert_eq!(value.name.unwrap().text_value, "Foo");
            let record = value.resolver.get(ResolverExtensions::HTML).unwrap();
            assert_eq!(record["og"]["title"], json!("Foo"));
        });
    }

    #[test]
    fn og_media_fills_empty_lists() {
        tokio_test::block_on(async {
            let value = extracted(concat!(
                r#"<head>"#,
                r#"<meta property="og:image" content="http://example.com/a.png">"#,
                r#"<meta property="og:image:secure_url" content="https://example.com/a.png">"#,
                r#"<meta property="og:image:width" content="800">"#,
                r#"<meta property="og:image:height" content="600">"#,
                r#"<meta property="og:image:alt" content="a drawing">"#,
                r#"<meta property="og:audio" content="https://example.com/a.mp3">"#,
                r#"<meta property="og:audio:type" content="audio/mpeg">"#,
                r#"</head>"#,
            ))
            .await;
            assert_eq!(value.image.len(), 1);
            assert_eq!(value.image[0].content_url, "https://example.com/a.png");
            assert_eq!(
                value.image[0].ratio,
                Some(Ratio {
                    width: 800,
                    height: 600
                })
            );
            assert_eq!(value.image[0].name.as_ref().unwrap().text_value, "a drawing");
            assert_eq!(value.audio.len(), 1);
            assert_eq!(value.audio[0].encoding_format.as_deref(), Some("audio/mpeg"));
        });
    }

    // -- title ---------------------------------------------------------------

    #[test]
    fn document_title_is_the_last_name_fallback() {
        tokio_test::block_on(async {
            let value = extracted("<head><title>\n  Hello   World\n</title></head>").await;
            assert_eq!(value.name.unwrap().text_value, "Hello World");

            let value = extracted(concat!(
                r#"<head><meta property="og:title" content="OGP wins">"#,
                "<title>Plain title</title></head>",
            ))
            .await;
            assert_eq!(value.name.unwrap().text_value, "OGP wins");
            let record = value.resolver.get(ResolverExtensions::HTML).unwrap();
            assert_eq!(record["title"], json!("Plain title"));
        });
    }

    // -- urls ----------------------------------------------------------------

    #[test]
    fn canonical_links_absolutize_and_fill_url() {
        tokio_test::block_on(async {
            let value = extracted(r#"<head><link rel="canonical" href="/canonical"></head>"#).await;
            assert_eq!(value.url.as_deref(), Some("https://example.com/canonical"));
        });
    }

    #[test]
    fn og_url_wins_over_canonical() {
        tokio_test::block_on(async {
            let value = extracted(concat!(
                r#"<head><meta property="og:url" content="https://example.com/og">"#,
                r#"<link rel="canonical" href="https://example.com/canonical"></head>"#,
            ))
            .await;
            assert_eq!(value.url.as_deref(), Some("https://example.com/og"));
        });
    }

    // -- meta names ----------------------------------------------------------

    #[test]
    fn meta_names_fill_the_head_record() {
        tokio_test::block_on(async {
            let value = extracted(concat!(
                r#"<head>"#,
                r#"<meta name="creator" content="Alice">"#,
                r#"<meta name="creator" content="Bob">"#,
                r#"<meta name="keywords" content="a,b, c">"#,
                r#"<meta name="description" content="about">"#,
                r#"<meta name="robots" content="noindex">"#,
                r#"<meta name="empty" content="">"#,
                r#"</head>"#,
            ))
            .await;
            assert_eq!(value.description.as_deref(), Some("about"));
            assert_eq!(value.creator.len(), 2);
            let Creator::Person(person) = &value.creator[0] else {
                panic!("expected a person");
            };
            assert_eq!(person.name.as_ref().unwrap().text_value, "Alice");

            let record = value.resolver.get(ResolverExtensions::HTML).unwrap();
            assert_eq!(record["keywords"], json!(["a", "b", " c"]));
            assert_eq!(record["robots"], json!("noindex"));
        });
    }

    #[test]
    fn adult_ratings_add_a_label() {
        tokio_test::block_on(async {
            for rating in ["adult", "RTA-5042-1996-1400-1577-RTA"] {
                let body = format!(r#"<head><meta name="rating" content="{rating}"></head>"#);
                let value = extracted(&body).await;
                assert_eq!(value.labels, vec![SelfLabel::sexual()], "{rating}");
            }
            let value =
                extracted(r#"<head><meta name="rating" content="general"></head>"#).await;
            assert!(value.labels.is_empty());
        });
    }

    // -- embedded json-ld ----------------------------------------------------

    #[test]
    fn ld_json_scripts_build_a_schema_org_base() {
        tokio_test::block_on(async {
            let value = extracted(concat!(
                r#"<head>"#,
                r#"<meta property="og:title" content="OGP title">"#,
                r#"<meta property="og:image" content="https://example.com/og.png">"#,
                r#"<script type="application/ld+json">"#,
                r#"{"@context": "https://schema.org", "@type": "NewsArticle", "#,
                r#""name": "Schema title", "#,
                r#""image": {"@type": "ImageObject", "contentUrl": "https://example.com/s.png"}}"#,
                r#"</script>"#,
                r#"</head>"#,
            ))
            .await;
            // The Schema.org base keeps its own fields; OGP fills gaps only.
            assert_eq!(value.kind.as_deref(), Some("NewsArticle"));
            assert_eq!(value.name.unwrap().text_value, "Schema title");
            assert_eq!(value.image.len(), 1);
            assert_eq!(value.image[0].content_url, "https://example.com/s.png");
            assert!(value.resolver.get(ResolverExtensions::SCHEMA_ORG).is_some());
            assert!(value.resolver.get(ResolverExtensions::HTML).is_some());
        });
    }

    #[test]
    fn raw_newlines_in_ld_json_are_repaired() {
        tokio_test::block_on(async {
            let value = extracted(concat!(
                r#"<head><script type="application/ld+json">"#,
                "{\"@context\": \"https://schema.org\", \"@type\": \"Article\", \"name\": \"line1\nline2\"}",
                r#"</script></head>"#,
            ))
            .await;
            assert_eq!(value.name.unwrap().text_value, "line1\nline2");
        });
    }

    #[test]
    fn unparseable_ld_json_is_skipped() {
        tokio_test::block_on(async {
            let value = extracted(concat!(
                r#"<head><script type="application/ld+json">not json</script>"#,
                r#"<meta property="og:title" content="fallback"></head>"#,
            ))
            .await;
            assert_eq!(value.name.unwrap().text_value, "fallback");
            assert!(value.resolver.get(ResolverExtensions::SCHEMA_ORG).is_none());
        });
    }

    // -- empty documents -----------------------------------------------------

    #[test]
    fn empty_heads_extract_nothing() {
        tokio_test::block_on(async {
            let response = html_response("https://example.com/", "<html><head></head><body><p>hi</p></body></html>");
            let extraction = extract(response, &ResolveOptions::default()).await.unwrap();
            assert_eq!(extraction.value, Metadata::default());
            assert!(extraction.body.contains("<p>hi</p>"));
        });
    }
}
