//! Open Graph protocol record
//!
//! Accumulates `og:*` meta properties in document order. Structured
//! properties (`og:image:width` and friends) patch the most recently
//! started entry of their list, which is how producers emit them; markup
//! that groups all base tags ahead of the modifiers gets every modifier
//! applied to the last entry.

use serde::Serialize;

/// Everything collected from a document's `og:*` meta properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<OgLocale>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<OgMedia>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub video: Vec<OgMedia>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audio: Vec<OgAudio>,
}

/// An `og:image` or `og:video` entry with its structured properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OgMedia {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// An `og:audio` entry. Audio carries no dimensions or alt text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OgAudio {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// An `og:locale` value with its declared alternates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OgLocale {
    pub locale: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate: Vec<String>,
}

impl OgMedia {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            ..Self::default()
        }
    }
}

impl OgAudio {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            ..Self::default()
        }
    }
}

impl OpenGraph {
    /// Applies one `og:*` property in document order. Unknown properties
    /// and modifiers without a preceding base tag are ignored; non-numeric
    /// widths and heights are ignored.
    pub(crate) fn apply(&mut self, property: &str, content: &str) {
        match property {
            "og:title" => self.title = Some(content.to_owned()),
            "og:type" => self.kind = Some(content.to_owned()),
            "og:url" => self.url = Some(content.to_owned()),
            "og:description" => self.description = Some(content.to_owned()),
            "og:site_name" => self.site_name = Some(content.to_owned()),
            "og:locale" => {
                self.locale = Some(OgLocale {
                    locale: content.to_owned(),
                    alternate: Vec::new(),
                });
            }
            "og:locale:alternate" => {
                if let Some(locale) = &mut self.locale {
                    locale.alternate.push(content.to_owned());
                }
            }
            "og:image" | "og:image:url" => self.image.push(OgMedia::new(content)),
            "og:image:type" => {
                if let Some(image) = self.image.last_mut() {
                    image.kind = Some(content.to_owned());
                }
            }
            "og:image:secure_url" => {
                if let Some(image) = self.image.last_mut() {
                    image.secure_url = Some(content.to_owned());
                }
            }
            "og:image:width" => {
                if let (Some(image), Ok(width)) = (self.image.last_mut(), content.parse()) {
                    image.width = Some(width);
                }
            }
            "og:image:height" => {
                if let (Some(image), Ok(height)) = (self.image.last_mut(), content.parse()) {
                    image.height = Some(height);
                }
            }
            "og:image:alt" => {
                if let Some(image) = self.image.last_mut() {
                    image.alt = Some(content.to_owned());
                }
            }
            "og:video" | "og:video:url" => self.video.push(OgMedia::new(content)),
            "og:video:type" => {
                if let Some(video) = self.video.last_mut() {
                    video.kind = Some(content.to_owned());
                }
            }
            "og:video:secure_url" => {
                if let Some(video) = self.video.last_mut() {
                    video.secure_url = Some(content.to_owned());
                }
            }
            "og:video:width" => {
                if let (Some(video), Ok(width)) = (self.video.last_mut(), content.parse()) {
                    video.width = Some(width);
                }
            }
            "og:video:height" => {
                if let (Some(video), Ok(height)) = (self.video.last_mut(), content.parse()) {
                    video.height = Some(height);
                }
            }
            "og:video:alt" => {
                if let Some(video) = self.video.last_mut() {
                    video.alt = Some(content.to_owned());
                }
            }
            "og:audio" | "og:audio:url" => self.audio.push(OgAudio::new(content)),
            "og:audio:type" => {
                if let Some(audio) = self.audio.last_mut() {
                    audio.kind = Some(content.to_owned());
                }
            }
            "og:audio:secure_url" => {
                if let Some(audio) = self.audio.last_mut() {
                    audio.secure_url = Some(content.to_owned());
                }
            }
            _ => {}
        }
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.kind.is_none()
            && self.url.is_none()
            && self.description.is_none()
            && self.site_name.is_none()
            && self.locale.is_none()
            && self.image.is_empty()
            && self.video.is_empty()
            && self.audio.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(properties: &[(&str, &str)]) -> OpenGraph {
        let mut og = OpenGraph::default();
        for (property, content) in properties {
            og.apply(property, content);
        }
        og
    }

    // -- scalar properties ---------------------------------------------------

    #[test]
    fn scalar_properties_take_the_last_value() {
        let og = applied(&[
            ("og:title", "First"),
            ("og:title", "Second"),
            ("og:type", "article"),
            ("og:url", "https://example.com/a"),
            ("og:site_name", "Example"),
            ("og:description", "about a thing"),
        ]);
        assert_eq!(og.title.as_deref(), Some("Second"));
        assert_eq!(og.kind.as_deref(), Some("article"));
        assert_eq!(og.url.as_deref(), Some("https://example.com/a"));
        assert_eq!(og.site_name.as_deref(), Some("Example"));
        assert_eq!(og.description.as_deref(), Some("about a thing"));
    }

    #[test]
    fn locale_collects_alternates() {
        let og = applied(&[
            ("og:locale", "ja_JP"),
            ("og:locale:alternate", "en_US"),
            ("og:locale:alternate", "fr_FR"),
        ]);
        let locale = og.locale.unwrap();
        assert_eq!(locale.locale, "ja_JP");
        assert_eq!(locale.alternate, ["en_US", "fr_FR"]);
    }

    #[test]
    fn locale_alternate_without_locale_is_dropped() {
        let og = applied(&[("og:locale:alternate", "en_US")]);
        assert!(og.locale.is_none());
    }

    // -- media lists ---------------------------------------------------------

    #[test]
    fn modifiers_patch_their_own_entry_in_document_order() {
        let og = applied(&[
            ("og:image", "https://example.com/a.png"),
            ("og:image:width", "800"),
            ("og:image:height", "600"),
            ("og:image:alt", "first"),
            ("og:image", "https://example.com/b.png"),
            ("og:image:type", "image/png"),
        ]);
        assert_eq!(og.image.len(), 2);
        assert_eq!(og.image[0].width, Some(800));
        assert_eq!(og.image[0].height, Some(600));
        assert_eq!(og.image[0].alt.as_deref(), Some("first"));
        assert!(og.image[0].kind.is_none());
        assert_eq!(og.image[1].kind.as_deref(), Some("image/png"));
        assert!(og.image[1].width.is_none());
    }

    // Modifiers are attributed by adjacency alone. A document that lists
    // every base tag first and the modifiers afterwards gets all modifiers
    // applied to the last entry, dimensions of the first image included.
    #[test]
    fn grouped_base_tags_misattribute_modifiers_to_the_last_entry() {
        let og = applied(&[
            ("og:image", "https://example.com/a.png"),
            ("og:image", "https://example.com/b.png"),
            ("og:image:width", "800"),
            ("og:image:height", "600"),
        ]);
        assert!(og.image[0].width.is_none());
        assert_eq!(og.image[1].width, Some(800));
        assert_eq!(og.image[1].height, Some(600));
    }

    #[test]
    fn url_alias_starts_a_new_entry() {
        let og = applied(&[
            ("og:image:url", "https://example.com/a.png"),
            ("og:image", "https://example.com/b.png"),
        ]);
        assert_eq!(og.image.len(), 2);
    }

    #[test]
    fn modifiers_without_a_base_tag_are_dropped() {
        let og = applied(&[
            ("og:image:width", "800"),
            ("og:video:alt", "nothing"),
            ("og:audio:type", "audio/ogg"),
        ]);
        assert!(og.is_empty());
    }

    #[test]
    fn non_numeric_dimensions_are_ignored() {
        let og = applied(&[
            ("og:image", "https://example.com/a.png"),
            ("og:image:width", "wide"),
            ("og:image:height", "600px"),
        ]);
        assert!(og.image[0].width.is_none());
        assert!(og.image[0].height.is_none());
    }

    #[test]
    fn secure_url_and_type_patch_audio() {
        let og = applied(&[
            ("og:audio", "http://example.com/a.mp3"),
            ("og:audio:secure_url", "https://example.com/a.mp3"),
            ("og:audio:type", "audio/mpeg"),
        ]);
        assert_eq!(og.audio[0].url, "http://example.com/a.mp3");
        assert_eq!(
            og.audio[0].secure_url.as_deref(),
            Some("https://example.com/a.mp3")
        );
        assert_eq!(og.audio[0].kind.as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn unknown_properties_are_ignored() {
        let og = applied(&[
            ("og:audio:alt", "audio has no alt"),
            ("og:determiner", "the"),
            ("fb:app_id", "12345"),
            ("twitter:card", "summary"),
        ]);
        assert!(og.is_empty());
    }

    // -- serialization -------------------------------------------------------

    #[test]
    fn serializes_with_camel_case_keys() {
        let og = applied(&[
            ("og:title", "Title"),
            ("og:site_name", "Example"),
            ("og:image", "https://example.com/a.png"),
            ("og:image:secure_url", "https://secure.example.com/a.png"),
            ("og:image:type", "image/png"),
        ]);
        let json = serde_json::to_value(&og).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "title": "Title",
                "siteName": "Example",
                "image": [{
                    "url": "https://example.com/a.png",
                    "secureUrl": "https://secure.example.com/a.png",
                    "type": "image/png"
                }]
            })
        );
    }
}
