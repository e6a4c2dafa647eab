//! Small helpers shared across resolvers

use std::sync::LazyLock;

use regex::Regex;

static FILE_EXT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^./]+$").expect("valid regex"));

/// Guesses a MIME type from the file extension of a URL path.
///
/// Covers only the image formats commonly served with misleading or missing
/// `Content-Type` headers.
#[must_use]
pub fn encoding_format_from_file_ext(path: &str) -> Option<&'static str> {
    let ext = FILE_EXT_REGEX.find(path)?.as_str();
    match ext.to_ascii_lowercase().as_str() {
        ".gif" => Some("image/gif"),
        ".jpeg" | ".jpg" => Some("image/jpeg"),
        ".png" => Some("image/png"),
        ".webp" => Some("image/webp"),
        _ => None,
    }
}

/// Parses JSON, tolerating unescaped control characters inside string
/// literals.
///
/// Some sites emit `<script type="application/ld+json">` blocks with raw
/// newlines inside string values, which strict parsers reject. A repair pass
/// escapes those characters and tries again. Returns `None` when the input
/// is unparseable even after repair.
#[must_use]
pub fn robust_parse_json(input: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(input) {
        return Some(value);
    }
    serde_json::from_str(&escape_control_chars_in_strings(input)).ok()
}

fn escape_control_chars_in_strings(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if (c as u32) < 0x20 {
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push_str(&format!("\\u{:04x}", c as u32)),
                }
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}
