//! Content-Type classification for dispatching responses to extractors

/// The JSON-LD profile IRI identifying Activity Streams 2.0 documents.
pub const ACTIVITY_STREAMS_PROFILE: &str = "https://www.w3.org/ns/activitystreams";

/// Coarse media classes the resolver knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Html,
    Xml,
    ActivityStreams,
    Image,
    Video,
    Audio,
}

/// Classifies a raw `Content-Type` header value.
///
/// `application/ld+json` counts as Activity Streams only when a parameter
/// carries the AS2 profile IRI; without it the value falls through to the
/// primary-type check like any other `application/*` type. Returns `None`
/// for anything the resolver has no handler for.
#[must_use]
pub fn classify(value: &str) -> Option<MediaType> {
    let mut params = value.split(';');
    let essence = params.next().unwrap_or_default().trim_end();
    match essence {
        "text/html" | "application/xhtml+xml" => return Some(MediaType::Html),
        "application/xml" | "text/xml" => return Some(MediaType::Xml),
        "application/activity+json" => return Some(MediaType::ActivityStreams),
        "application/ld+json" => {
            let profile = format!("profile=\"{ACTIVITY_STREAMS_PROFILE}\"");
            if params.any(|p| p.trim() == profile) {
                return Some(MediaType::ActivityStreams);
            }
        }
        _ => {}
    }
    match essence.split('/').next() {
        Some("image") => Some(MediaType::Image),
        Some("video") => Some(MediaType::Video),
        Some("audio") => Some(MediaType::Audio),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- markup --------------------------------------------------------------

    #[test]
    fn html_types() {
        assert_eq!(classify("text/html"), Some(MediaType::Html));
        assert_eq!(classify("text/html; charset=utf-8"), Some(MediaType::Html));
        assert_eq!(classify("application/xhtml+xml"), Some(MediaType::Html));
    }

    #[test]
    fn xml_types() {
        assert_eq!(classify("application/xml"), Some(MediaType::Xml));
        assert_eq!(classify("text/xml; charset=utf-8"), Some(MediaType::Xml));
    }

    // -- activity streams ----------------------------------------------------

    #[test]
    fn activity_json_is_activity_streams() {
        assert_eq!(
            classify("application/activity+json"),
            Some(MediaType::ActivityStreams)
        );
    }

    #[test]
    fn ld_json_requires_profile_parameter() {
        assert_eq!(
            classify("application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\""),
            Some(MediaType::ActivityStreams)
        );
        assert_eq!(
            classify("application/ld+json;profile=\"https://www.w3.org/ns/activitystreams\""),
            Some(MediaType::ActivityStreams)
        );
        assert_eq!(classify("application/ld+json"), None);
        assert_eq!(
            classify("application/ld+json; profile=\"https://schema.org\""),
            None
        );
    }

    // -- media ---------------------------------------------------------------

    #[test]
    fn media_primary_types() {
        assert_eq!(classify("image/png"), Some(MediaType::Image));
        assert_eq!(classify("image/svg+xml"), Some(MediaType::Image));
        assert_eq!(classify("video/mp4"), Some(MediaType::Video));
        assert_eq!(classify("audio/ogg; codecs=opus"), Some(MediaType::Audio));
    }

    #[test]
    fn unknown_types() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("application/json"), None);
        assert_eq!(classify("text/plain"), None);
        assert_eq!(classify("font/woff2"), None);
    }
}
