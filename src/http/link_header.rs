//! `Link` header parsing (RFC 8288 subset)
//!
//! Covers what alternate-representation discovery needs: angle-bracketed
//! targets, token and quoted-string parameter values, and multi-valued
//! headers. Anchors, extended parameters and star forms are not handled.

/// One `<target>; param=value` entry of a `Link` header.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkEntry {
    pub target: String,
    params: Vec<(String, String)>,
}

impl LinkEntry {
    /// Whether the `rel` parameter contains `token`, treating it as an
    /// ASCII case-insensitive space-separated list.
    pub fn has_rel(&self, token: &str) -> bool {
        self.param("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|t| t.eq_ignore_ascii_case(token))
        })
    }

    /// First parameter named `name` (ASCII case-insensitive).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parses a `Link` header into its entries.
///
/// Quoted parameter values may contain commas and semicolons; backslash
/// escapes inside quotes are honored. Malformed trailing input yields the
/// entries parsed up to that point.
pub(crate) fn parse(value: &str) -> Vec<LinkEntry> {
    let mut entries = Vec::new();
    let mut rest = value;
    loop {
        rest = rest.trim_start_matches([' ', '\t', ',']);
        let Some(after_open) = rest.strip_prefix('<') else {
            break;
        };
        let Some(end) = after_open.find('>') else {
            break;
        };
        let target = after_open[..end].trim().to_owned();
        rest = &after_open[end + 1..];

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start();
            let Some(after_semi) = rest.strip_prefix(';') else {
                break;
            };
            rest = after_semi.trim_start();
            let name_end = rest
                .find(|c: char| c == '=' || c == ';' || c == ',')
                .unwrap_or(rest.len());
            let name = rest[..name_end].trim().to_ascii_lowercase();
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
                params.push((name, value));
            }
        }
        entries.push(LinkEntry { target, params });
    }
    entries
}

/// Parses a parameter value, either a quoted string with backslash escapes
/// or a bare token ending at `;` or `,`. Returns the value and the
/// unconsumed remainder.
pub(super) fn parse_param_value(input: &str) -> (String, &str) {
    let Some(quoted) = input.strip_prefix('"') else {
        let end = input.find([';', ',']).unwrap_or(input.len());
        return (input[..end].trim_end().to_owned(), &input[end..]);
    };

    let mut out = String::new();
    let mut escaped = false;
    for (i, c) in quoted.char_indices() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return (out, &quoted[i + 1..]);
        } else {
            out.push(c);
        }
    }
    (out, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- parsing -------------------------------------------------------------

    #[test]
    fn single_entry_with_params() {
        let entries = parse(r#"<https://example.com/a>; rel="alternate"; type="text/html""#);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "https://example.com/a");
        assert!(entries[0].has_rel("alternate"));
        assert_eq!(entries[0].param("type"), Some("text/html"));
    }

    #[test]
    fn multiple_entries_split_on_commas() {
        let entries = parse(
            r#"<https://example.com/a>; rel="preconnect", <https://example.com/b>; rel="alternate""#,
        );
        assert_eq!(entries.len(), 2);
        assert!(entries[1].has_rel("alternate"));
    }

    #[test]
    fn quoted_values_may_contain_commas_and_escapes() {
        let entries = parse(concat!(
            r#"<https://example.com/as2>; rel="alternate"; "#,
            r#"type="application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"""#,
        ));
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].param("type"),
            Some(r#"application/ld+json; profile="https://www.w3.org/ns/activitystreams""#)
        );

        let entries = parse(r#"<https://example.com/a>; title="a, b; c""#);
        assert_eq!(entries[0].param("title"), Some("a, b; c"));
    }

    #[test]
    fn bare_token_values() {
        let entries = parse("<https://example.com/a>; rel=alternate; type=text/html");
        assert!(entries[0].has_rel("alternate"));
        assert_eq!(entries[0].param("type"), Some("text/html"));
    }

    #[test]
    fn rel_lists_match_any_token_case_insensitively() {
        let entries = parse(r#"<https://example.com/a>; rel="Alternate stylesheet""#);
        assert!(entries[0].has_rel("alternate"));
        assert!(entries[0].has_rel("stylesheet"));
        assert!(!entries[0].has_rel("canonical"));
    }

    #[test]
    fn params_without_values() {
        let entries = parse("<https://example.com/a>; rel=preload; crossorigin");
        assert_eq!(entries[0].param("crossorigin"), Some(""));
    }

    #[test]
    fn malformed_input_keeps_earlier_entries() {
        let entries = parse("<https://example.com/a>; rel=alternate, <unterminated");
        assert_eq!(entries.len(), 1);
        assert!(parse("garbage").is_empty());
        assert!(parse("").is_empty());
    }
}
