//! `Content-Disposition` filename extraction (RFC 6266 / RFC 5987 subset)

use super::link_header::parse_param_value;

/// Extracts the filename a `Content-Disposition` header declares.
///
/// The RFC 5987 `filename*` form wins over the plain `filename` parameter
/// regardless of their order in the header. Extended values are
/// percent-decoded using their declared charset; UTF-8 and ISO-8859-1 are
/// supported, and a `filename*` that fails to decode falls back to the
/// plain parameter.
pub(crate) fn filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for (name, value) in params(header) {
        if name.eq_ignore_ascii_case("filename*") {
            if extended.is_none() {
                extended = decode_ext_value(&value);
            }
        } else if name.eq_ignore_ascii_case("filename") && plain.is_none() {
            plain = Some(value);
        }
    }
    extended.or(plain)
}

/// Parameters after the disposition type, in header order.
fn params(header: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(type_end) = header.find(';') else {
        return out;
    };
    let mut rest = &header[type_end + 1..];
    loop {
        rest = rest.trim_start_matches([' ', '\t', ';']);
        if rest.is_empty() {
            break;
        }
        let name_end = rest.find(['=', ';']).unwrap_or(rest.len());
        let name = rest[..name_end].trim().to_owned();
        rest = &rest[name_end..];
        let value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let (value, remaining) = parse_param_value(after_eq.trim_start());
                rest = remaining;
                value
            }
            None => String::new(),
        };
        if !name.is_empty() {
            out.push((name, value));
        }
    }
    out
}

/// Decodes an RFC 5987 `charset'language'percent-encoded` value.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    let bytes = urlencoding::decode_binary(encoded.as_bytes());
    if charset.eq_ignore_ascii_case("utf-8") {
        String::from_utf8(bytes.into_owned()).ok()
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.iter().map(|&b| char::from(b)).collect())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- plain filenames -----------------------------------------------------

    #[test]
    fn quoted_filename() {
        assert_eq!(
            filename(r#"attachment; filename="pic.jpg""#),
            Some("pic.jpg".to_owned())
        );
    }

    #[test]
    fn token_filename() {
        assert_eq!(
            filename("attachment; filename=pic.jpg"),
            Some("pic.jpg".to_owned())
        );
    }

    #[test]
    fn escaped_quotes_inside_filename() {
        assert_eq!(
            filename(r#"attachment; filename="a\"b.jpg""#),
            Some(r#"a"b.jpg"#.to_owned())
        );
    }

    #[test]
    fn no_filename_parameter() {
        assert_eq!(filename("inline"), None);
        assert_eq!(filename("attachment; size=100"), None);
    }

    // -- extended filenames --------------------------------------------------

    #[test]
    fn utf8_extended_filename() {
        assert_eq!(
            filename("attachment; filename*=UTF-8''%E3%81%82.png"),
            Some("あ.png".to_owned())
        );
    }

    #[test]
    fn latin1_extended_filename() {
        assert_eq!(
            filename("attachment; filename*=iso-8859-1'en'%A3%20rates.pdf"),
            Some("£ rates.pdf".to_owned())
        );
    }

    #[test]
    fn extended_wins_regardless_of_order() {
        assert_eq!(
            filename(r#"attachment; filename="fallback.png"; filename*=UTF-8''real.png"#),
            Some("real.png".to_owned())
        );
        assert_eq!(
            filename(r#"attachment; filename*=UTF-8''real.png; filename="fallback.png""#),
            Some("real.png".to_owned())
        );
    }

    #[test]
    fn unsupported_charset_falls_back_to_plain() {
        assert_eq!(
            filename(r#"attachment; filename*=shift_jis''%82%A0.png; filename="fallback.png""#),
            Some("fallback.png".to_owned())
        );
    }

    #[test]
    fn malformed_extended_value_falls_back_to_plain() {
        assert_eq!(
            filename(r#"attachment; filename*=no-quotes-here; filename="fallback.png""#),
            Some("fallback.png".to_owned())
        );
    }

    #[test]
    fn language_tag_is_ignored() {
        assert_eq!(
            filename("attachment; filename*=UTF-8'ja'%E3%81%82.png"),
            Some("あ.png".to_owned())
        );
    }
}
