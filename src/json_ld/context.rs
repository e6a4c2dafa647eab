//! Active-context handling: term definitions, IRI expansion and the term
//! selection that drives compaction
//!
//! This is a focused subset of JSON-LD context processing sized for the
//! vocabularies resolution runs into (Activity Streams, security, Schema.org
//! and small inline extensions). Terms carry an IRI mapping, an optional
//! type coercion, a language-container flag and prefix capability; scoped
//! contexts, `@reverse` and index containers are out.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::error::JsonLdError;
use super::loader::DocumentLoader;

/// Maximum depth of remote context references before processing aborts.
pub const MAX_CONTEXT_RECURSION: usize = 8;

/// How a term coerces the values written under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeCoercion {
    /// `@type: @id`; string values are node references.
    Id,
    /// `@type: <iri>`; values carry the given datatype.
    Typed(String),
}

/// A processed term definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TermDefinition {
    /// IRI (or keyword, for aliases) the term maps to.
    pub iri: String,
    /// Type coercion applied to values.
    pub coercion: Option<TypeCoercion>,
    /// Whether values form a language map.
    pub language_container: bool,
    /// Whether the term may be used as a compact-IRI prefix.
    pub prefix: bool,
}

/// The active context built from one or more context values.
#[derive(Debug, Clone, Default)]
pub(crate) struct Context {
    terms: IndexMap<String, TermDefinition>,
    vocab: Option<String>,
}

impl Context {
    /// Merges a context value into the active context. Strings load remote
    /// (or preloaded) context documents; arrays merge left to right, so
    /// later entries override earlier ones.
    pub async fn process(
        &mut self,
        value: &Value,
        loader: DocumentLoader<'_>,
        depth: usize,
    ) -> Result<(), JsonLdError> {
        // Work stack, LIFO; array members are pushed reversed so merge
        // order is preserved.
        let mut pending = vec![(value.clone(), depth)];
        while let Some((entry, depth)) = pending.pop() {
            if depth > MAX_CONTEXT_RECURSION {
                return Err(JsonLdError::RecursionLimit);
            }
            match entry {
                Value::Null => {
                    self.terms.clear();
                    self.vocab = None;
                }
                Value::String(url) => {
                    let document = loader.load(&url).await?;
                    let Some(context) = document.get("@context").cloned() else {
                        return Err(JsonLdError::ContextShape { url });
                    };
                    pending.push((context, depth + 1));
                }
                Value::Array(items) => {
                    for item in items.into_iter().rev() {
                        pending.push((item, depth));
                    }
                }
                Value::Object(map) => self.define_terms(&map)?,
                other => {
                    return Err(JsonLdError::InvalidContext(format!(
                        "unexpected context value: {other}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn define_terms(&mut self, map: &serde_json::Map<String, Value>) -> Result<(), JsonLdError> {
        // @vocab first; term definitions may rely on it.
        match map.get("@vocab") {
            Some(Value::String(vocab)) => self.vocab = Some(vocab.clone()),
            Some(Value::Null) => self.vocab = None,
            Some(other) => {
                return Err(JsonLdError::InvalidContext(format!(
                    "@vocab must be a string or null, got {other}"
                )));
            }
            None => {}
        }
        let mut defining = HashSet::new();
        for key in map.keys() {
            if !key.starts_with('@') {
                self.define_term(key, map, &mut defining)?;
            }
        }
        Ok(())
    }

    /// Defines one term, resolving sibling prefixes on demand so that
    /// definition order within a context object does not matter.
    fn define_term(
        &mut self,
        name: &str,
        siblings: &serde_json::Map<String, Value>,
        defining: &mut HashSet<String>,
    ) -> Result<(), JsonLdError> {
        if !defining.insert(name.to_owned()) {
            return Ok(());
        }
        let Some(raw) = siblings.get(name) else {
            return Ok(());
        };
        match raw {
            Value::Null => {
                self.terms.shift_remove(name);
            }
            Value::String(value) => {
                let iri = self.expand_in_definition(value, siblings, defining)?;
                let prefix = has_prefix_shape(&iri);
                self.terms.insert(
                    name.to_owned(),
                    TermDefinition {
                        iri,
                        coercion: None,
                        language_container: false,
                        prefix,
                    },
                );
            }
            Value::Object(def) => {
                let iri = match def.get("@id") {
                    Some(Value::String(id)) => self.expand_in_definition(id, siblings, defining)?,
                    Some(Value::Null) => {
                        self.terms.shift_remove(name);
                        return Ok(());
                    }
                    Some(other) => {
                        return Err(JsonLdError::InvalidContext(format!(
                            "@id of term {name} must be a string, got {other}"
                        )));
                    }
                    None => match &self.vocab {
                        Some(vocab) => format!("{vocab}{name}"),
                        // No way to map the term; skip it.
                        None => return Ok(()),
                    },
                };
                let coercion = match def.get("@type") {
                    Some(Value::String(t)) if t == "@id" || t == "@vocab" => Some(TypeCoercion::Id),
                    Some(Value::String(t)) => Some(TypeCoercion::Typed(
                        self.expand_in_definition(t, siblings, defining)?,
                    )),
                    _ => None,
                };
                let language_container = match def.get("@container") {
                    Some(Value::String(container)) => container == "@language",
                    Some(Value::Array(containers)) => containers
                        .iter()
                        .any(|container| container.as_str() == Some("@language")),
                    _ => false,
                };
                let prefix = def.get("@prefix").and_then(Value::as_bool).unwrap_or(false);
                self.terms.insert(
                    name.to_owned(),
                    TermDefinition {
                        iri,
                        coercion,
                        language_container,
                        prefix,
                    },
                );
            }
            // Booleans, numbers and arrays are not term definitions.
            _ => {}
        }
        Ok(())
    }

    /// Expands an IRI inside a term definition, defining sibling prefix
    /// terms first when needed.
    fn expand_in_definition(
        &mut self,
        value: &str,
        siblings: &serde_json::Map<String, Value>,
        defining: &mut HashSet<String>,
    ) -> Result<String, JsonLdError> {
        if value.starts_with('@') {
            return Ok(value.to_owned());
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Ok(value.to_owned());
            }
            if !self.terms.contains_key(prefix) && siblings.contains_key(prefix) {
                self.define_term(prefix, siblings, defining)?;
            }
            if let Some(def) = self.terms.get(prefix) {
                return Ok(format!("{}{suffix}", def.iri));
            }
            return Ok(value.to_owned());
        }
        if let Some(vocab) = &self.vocab {
            return Ok(format!("{vocab}{value}"));
        }
        Ok(value.to_owned())
    }

    /// Expands a document string into an IRI or keyword.
    ///
    /// `vocab_relative` applies term and `@vocab` mappings (keys, type
    /// values); without it only prefixes and keywords expand (`@id`
    /// values). Returns `None` when the string cannot be mapped at all,
    /// which drops the position it appeared in.
    pub fn expand_iri(&self, value: &str, vocab_relative: bool) -> Option<String> {
        if value.starts_with('@') {
            return is_keyword(value).then(|| value.to_owned());
        }
        if vocab_relative {
            if let Some(def) = self.terms.get(value) {
                return Some(def.iri.clone());
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Some(value.to_owned());
            }
            if let Some(def) = self.terms.get(prefix) {
                if def.prefix {
                    return Some(format!("{}{suffix}", def.iri));
                }
            }
            return Some(value.to_owned());
        }
        if vocab_relative {
            return self
                .vocab
                .as_ref()
                .map(|vocab| format!("{vocab}{value}"));
        }
        Some(value.to_owned())
    }

    /// The term definition for a document key, if any.
    pub fn term(&self, name: &str) -> Option<&TermDefinition> {
        self.terms.get(name)
    }

    /// The alias a keyword compacts to, e.g. `id` for `@id` under the
    /// Activity Streams context.
    pub fn keyword_alias(&self, keyword: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|(_, def)| def.iri == keyword)
            .map(|(name, _)| name.as_str())
    }

    /// Picks the best term for an IRI given the shape of the value being
    /// compacted. Coercion must be consistent with the value: a term typed
    /// `xsd:boolean` is never selected for an untyped value, which is what
    /// pushes such values out to compact-IRI keys like `as:sensitive`.
    pub fn select_term(&self, iri: &str, hint: &ValueHint<'_>) -> Option<(&str, &TermDefinition)> {
        let mut best: Option<(&str, &TermDefinition, u8)> = None;
        for (name, def) in &self.terms {
            if def.iri != iri {
                continue;
            }
            let score = match hint {
                ValueHint::Language => {
                    if def.language_container {
                        3
                    } else if def.coercion.is_none() {
                        2
                    } else {
                        continue;
                    }
                }
                ValueHint::Plain => {
                    if def.coercion.is_none() && !def.language_container {
                        3
                    } else if def.language_container {
                        // Usable via an @none entry, but only as a last resort.
                        1
                    } else {
                        continue;
                    }
                }
                ValueHint::Typed(t) => match &def.coercion {
                    Some(TypeCoercion::Typed(coerced)) if coerced == t => 3,
                    None if !def.language_container => 2,
                    _ => continue,
                },
                ValueHint::NodeRef | ValueHint::Node => match &def.coercion {
                    Some(TypeCoercion::Id) => 3,
                    None if !def.language_container => 2,
                    _ => continue,
                },
            };
            let better = match &best {
                None => true,
                Some((best_name, _, best_score)) => {
                    score > *best_score
                        || (score == *best_score
                            && (name.len() < best_name.len()
                                || (name.len() == best_name.len() && name.as_str() < *best_name)))
                }
            };
            if better {
                best = Some((name, def, score));
            }
        }
        best.map(|(name, def, _)| (name, def))
    }

    /// Compacts an IRI to a key: a selected term, a `@vocab`-relative
    /// suffix, the shortest compact IRI, or the IRI itself.
    ///
    /// A vocab suffix is only used when no term already claims that name;
    /// this keeps `_:sensitive` intact under the AS2 `@vocab: "_:"` when
    /// `sensitive` is bound to the proper vocabulary IRI.
    pub fn compact_iri(&self, iri: &str, hint: &ValueHint<'_>) -> (String, Option<&TermDefinition>) {
        if let Some((name, def)) = self.select_term(iri, hint) {
            return (name.to_owned(), Some(def));
        }
        if let Some(vocab) = &self.vocab {
            if let Some(suffix) = iri.strip_prefix(vocab.as_str()) {
                if !suffix.is_empty() && !self.terms.contains_key(suffix) {
                    return (suffix.to_owned(), None);
                }
            }
        }
        let mut candidate: Option<String> = None;
        for (name, def) in &self.terms {
            if !def.prefix {
                continue;
            }
            let Some(suffix) = iri.strip_prefix(def.iri.as_str()) else {
                continue;
            };
            if suffix.is_empty() {
                continue;
            }
            let curie = format!("{name}:{suffix}");
            if self.terms.contains_key(&curie) {
                continue;
            }
            let shorter = candidate.as_ref().is_none_or(|current| {
                curie.len() < current.len() || (curie.len() == current.len() && curie < *current)
            });
            if shorter {
                candidate = Some(curie);
            }
        }
        (candidate.unwrap_or_else(|| iri.to_owned()), None)
    }
}

/// Shape of the value a key is being selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueHint<'a> {
    /// A scalar without type or language annotations.
    Plain,
    /// A language-tagged string.
    Language,
    /// A scalar carrying the given datatype IRI.
    Typed(&'a str),
    /// A node reference (only an `@id`).
    NodeRef,
    /// A full node object or list.
    Node,
}

fn is_keyword(value: &str) -> bool {
    matches!(
        value,
        "@base"
            | "@container"
            | "@context"
            | "@direction"
            | "@graph"
            | "@id"
            | "@import"
            | "@included"
            | "@index"
            | "@json"
            | "@language"
            | "@list"
            | "@nest"
            | "@none"
            | "@prefix"
            | "@propagate"
            | "@protected"
            | "@reverse"
            | "@set"
            | "@type"
            | "@value"
            | "@version"
            | "@vocab"
    )
}

/// Whether an IRI ends in a gen-delim, making a simple term usable as a
/// compact-IRI prefix.
fn has_prefix_shape(iri: &str) -> bool {
    iri.ends_with(|c| matches!(c, ':' | '/' | '?' | '#' | '[' | ']' | '@'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ResolveOptions;
    use serde_json::json;

    async fn context_of(value: Value) -> Context {
        let options = ResolveOptions::default();
        let loader = DocumentLoader::new(&options);
        let mut ctx = Context::default();
        ctx.process(&value, loader, 0).await.unwrap();
        ctx
    }

    // -- term definitions ----------------------------------------------------

    #[test]
    fn terms_resolve_forward_prefix_references() {
        tokio_test::block_on(async {
            let ctx = context_of(json!({
                "atomUri": "ostatus:atomUri",
                "ostatus": "http://ostatus.org#"
            }))
            .await;
            assert_eq!(ctx.term("atomUri").unwrap().iri, "http://ostatus.org#atomUri");
        });
    }

    #[test]
    fn typed_and_container_definitions() {
        tokio_test::block_on(async {
            let ctx = context_of(json!({
                "as": "https://www.w3.org/ns/activitystreams#",
                "xsd": "http://www.w3.org/2001/XMLSchema#",
                "published": { "@id": "as:published", "@type": "xsd:dateTime" },
                "nameMap": { "@id": "as:name", "@container": "@language" },
                "url": { "@id": "as:url", "@type": "@id" }
            }))
            .await;
            assert_eq!(
                ctx.term("published").unwrap().coercion,
                Some(TypeCoercion::Typed(
                    "http://www.w3.org/2001/XMLSchema#dateTime".into()
                ))
            );
            assert!(ctx.term("nameMap").unwrap().language_container);
            assert_eq!(ctx.term("url").unwrap().coercion, Some(TypeCoercion::Id));
        });
    }

    #[test]
    fn null_definitions_remove_terms() {
        tokio_test::block_on(async {
            let ctx = context_of(json!([
                "https://www.w3.org/ns/activitystreams",
                { "id": null, "type": null }
            ]))
            .await;
            assert_eq!(ctx.keyword_alias("@id"), None);
            assert_eq!(ctx.keyword_alias("@type"), None);
            // Other terms survive.
            assert!(ctx.term("name").is_some());
        });
    }

    #[test]
    fn keyword_aliases_are_found() {
        tokio_test::block_on(async {
            let ctx = context_of(json!("https://www.w3.org/ns/activitystreams")).await;
            assert_eq!(ctx.keyword_alias("@id"), Some("id"));
            assert_eq!(ctx.keyword_alias("@type"), Some("type"));
        });
    }

    #[test]
    fn remote_reference_depth_is_bounded() {
        tokio_test::block_on(async {
            let options = ResolveOptions::default();
            let loader = DocumentLoader::new(&options);
            let mut ctx = Context::default();
            let err = ctx
                .process(
                    &json!("https://www.w3.org/ns/activitystreams"),
                    loader,
                    MAX_CONTEXT_RECURSION + 1,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, JsonLdError::RecursionLimit));
        });
    }

    // -- expansion -----------------------------------------------------------

    #[test]
    fn expands_terms_curies_and_vocab() {
        tokio_test::block_on(async {
            let ctx = context_of(json!({
                "@vocab": "_:",
                "as": "https://www.w3.org/ns/activitystreams#",
                "name": "as:name"
            }))
            .await;
            assert_eq!(
                ctx.expand_iri("name", true).as_deref(),
                Some("https://www.w3.org/ns/activitystreams#name")
            );
            assert_eq!(
                ctx.expand_iri("as:summary", true).as_deref(),
                Some("https://www.w3.org/ns/activitystreams#summary")
            );
            assert_eq!(ctx.expand_iri("unknown", true).as_deref(), Some("_:unknown"));
            assert_eq!(ctx.expand_iri("@id", true).as_deref(), Some("@id"));
            assert_eq!(ctx.expand_iri("@bogus", true), None);
            assert_eq!(
                ctx.expand_iri("https://example.com/x", false).as_deref(),
                Some("https://example.com/x")
            );
        });
    }

    #[test]
    fn vocabless_unknown_keys_drop() {
        tokio_test::block_on(async {
            let ctx = context_of(json!({ "as": "https://www.w3.org/ns/activitystreams#" })).await;
            assert_eq!(ctx.expand_iri("unknown", true), None);
        });
    }

    // -- compaction ----------------------------------------------------------

    #[test]
    fn vocab_suffix_yields_to_claimed_terms() {
        tokio_test::block_on(async {
            let ctx = context_of(json!({
                "@vocab": "_:",
                "as": "https://www.w3.org/ns/activitystreams#",
                "xsd": "http://www.w3.org/2001/XMLSchema#",
                "sensitive": { "@id": "as:sensitive", "@type": "xsd:boolean" }
            }))
            .await;
            // The suffix "sensitive" is taken by a term bound to a
            // different IRI, so the blank-vocab IRI stays as is.
            let (key, _) = ctx.compact_iri("_:sensitive", &ValueHint::Plain);
            assert_eq!(key, "_:sensitive");
            let (key, _) = ctx.compact_iri("_:other", &ValueHint::Plain);
            assert_eq!(key, "other");
        });
    }

    #[test]
    fn coercion_mismatch_falls_back_to_compact_iri() {
        tokio_test::block_on(async {
            let ctx = context_of(json!({
                "as": "https://www.w3.org/ns/activitystreams#",
                "xsd": "http://www.w3.org/2001/XMLSchema#",
                "sensitive": { "@id": "as:sensitive", "@type": "xsd:boolean" }
            }))
            .await;
            let (key, _) = ctx.compact_iri(
                "https://www.w3.org/ns/activitystreams#sensitive",
                &ValueHint::Plain,
            );
            assert_eq!(key, "as:sensitive");
            let (key, def) = ctx.compact_iri(
                "https://www.w3.org/ns/activitystreams#sensitive",
                &ValueHint::Typed("http://www.w3.org/2001/XMLSchema#boolean"),
            );
            assert_eq!(key, "sensitive");
            assert!(def.is_some());
        });
    }

    #[test]
    fn language_values_prefer_map_terms() {
        tokio_test::block_on(async {
            let ctx = context_of(json!("https://www.w3.org/ns/activitystreams")).await;
            let iri = "https://www.w3.org/ns/activitystreams#name";
            let (key, _) = ctx.compact_iri(iri, &ValueHint::Language);
            assert_eq!(key, "nameMap");
            let (key, _) = ctx.compact_iri(iri, &ValueHint::Plain);
            assert_eq!(key, "name");
        });
    }

    #[test]
    fn node_references_prefer_id_coerced_terms() {
        tokio_test::block_on(async {
            let ctx = context_of(json!("https://www.w3.org/ns/activitystreams")).await;
            let (key, def) = ctx.compact_iri(
                "https://www.w3.org/ns/activitystreams#attributedTo",
                &ValueHint::NodeRef,
            );
            assert_eq!(key, "attributedTo");
            assert_eq!(def.unwrap().coercion, Some(TypeCoercion::Id));
        });
    }

    #[test]
    fn unknown_namespaces_stay_absolute() {
        tokio_test::block_on(async {
            let ctx = context_of(json!("https://www.w3.org/ns/activitystreams")).await;
            let (key, _) = ctx.compact_iri("http://ostatus.org#atomUri", &ValueHint::Plain);
            assert_eq!(key, "http://ostatus.org#atomUri");
        });
    }
}
