//! Expansion to an internal node model and compaction back to plain keys
//!
//! Documents are expanded against their own `@context` (layered over an
//! optional base context) into [`ExpandedNode`]s keyed by absolute IRIs,
//! then compacted against the target context with per-value term selection.
//! That two-step keeps vocabulary quirks out of the extractors: whatever
//! context a server published under, the compacted output uses the target
//! context's terms.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::Value;

use super::context::{Context, TermDefinition, TypeCoercion, ValueHint};
use super::error::JsonLdError;
use super::loader::DocumentLoader;
use super::value::{JsonLdValue, NodeObject, Scalar};

/// Maximum nesting depth of node objects during expansion.
const MAX_NODE_DEPTH: usize = 32;

/// An expanded value: an annotated scalar, a node, or an ordered list.
#[derive(Debug, Clone)]
enum Expanded {
    Value {
        value: Scalar,
        value_type: Option<String>,
        language: Option<String>,
    },
    Node(ExpandedNode),
    List(Vec<Expanded>),
}

/// A node with IRI-keyed properties.
#[derive(Debug, Clone, Default)]
struct ExpandedNode {
    id: Option<String>,
    types: Vec<String>,
    graph: Vec<ExpandedNode>,
    properties: IndexMap<String, Vec<Expanded>>,
}

impl ExpandedNode {
    /// Whether the node carries nothing but an `@id`.
    fn is_reference(&self) -> bool {
        self.id.is_some()
            && self.types.is_empty()
            && self.graph.is_empty()
            && self.properties.is_empty()
    }
}

/// Compacts `input` against `context`.
///
/// `expand_context` is the base active context for expansion; the
/// document's own `@context` entries are layered on top of it. The result
/// is the compacted top-level node without an `@context` entry. Multiple
/// top-level nodes compact into a `@graph` wrapper.
///
/// # Errors
///
/// Returns an error when a context cannot be processed or the document
/// does not compact to a node object.
pub async fn compact(
    input: &Value,
    context: &Value,
    loader: DocumentLoader<'_>,
    expand_context: Option<&Value>,
) -> Result<NodeObject, JsonLdError> {
    let mut active = Context::default();
    if let Some(base) = expand_context {
        active.process(base, loader, 0).await?;
    }
    let nodes = expand_document(input, &active, loader).await?;

    let mut target = Context::default();
    target.process(context, loader, 0).await?;

    match nodes.as_slice() {
        [] => Err(JsonLdError::NotAnObject),
        [node] => Ok(compact_node(node, &target)),
        many => {
            let key = target.keyword_alias("@graph").unwrap_or("@graph").to_owned();
            let mut wrapper = NodeObject::new();
            wrapper.insert(
                key,
                JsonLdValue::Set(
                    many.iter()
                        .map(|node| JsonLdValue::Node(compact_node(node, &target)))
                        .collect(),
                ),
            );
            Ok(wrapper)
        }
    }
}

// -- expansion ---------------------------------------------------------------

async fn expand_document(
    input: &Value,
    active: &Context,
    loader: DocumentLoader<'_>,
) -> Result<Vec<ExpandedNode>, JsonLdError> {
    if !input.is_object() && !input.is_array() {
        return Err(JsonLdError::NotAnObject);
    }
    let expanded = expand_values(input, None, active, loader, 0).await?;
    // Free-floating values are dropped; only nodes survive expansion at
    // the top level.
    Ok(expanded
        .into_iter()
        .filter_map(|item| match item {
            Expanded::Node(node) => Some(node),
            _ => None,
        })
        .collect())
}

/// Expands one document position into zero or more values. Arrays and
/// `@set` wrappers splice, `null` and unmappable entries drop.
fn expand_values<'a>(
    value: &'a Value,
    def: Option<&'a TermDefinition>,
    active: &'a Context,
    loader: DocumentLoader<'a>,
    depth: usize,
) -> BoxFuture<'a, Result<Vec<Expanded>, JsonLdError>> {
    Box::pin(async move {
        let mut out = Vec::new();
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    out.extend(expand_values(item, def, active, loader, depth).await?);
                }
            }
            Value::String(s) => match def.map(|def| def.coercion.as_ref()) {
                Some(Some(TypeCoercion::Id)) => match active.expand_iri(s, false) {
                    Some(iri) => out.push(Expanded::Node(ExpandedNode {
                        id: Some(iri),
                        ..ExpandedNode::default()
                    })),
                    None => out.push(plain(Scalar::String(s.clone()))),
                },
                Some(Some(TypeCoercion::Typed(t))) => out.push(Expanded::Value {
                    value: Scalar::String(s.clone()),
                    value_type: Some(t.clone()),
                    language: None,
                }),
                _ => out.push(plain(Scalar::String(s.clone()))),
            },
            Value::Bool(b) => out.push(typed_scalar(Scalar::Bool(*b), def)),
            Value::Number(n) => out.push(typed_scalar(Scalar::Number(n.clone()), def)),
            Value::Object(map) => {
                if let Some(inner) = map.get("@value") {
                    if let Some(value) = expand_value_object(map, inner, active) {
                        out.push(value);
                    }
                } else if let Some(inner) = map.get("@set") {
                    out.extend(expand_values(inner, def, active, loader, depth).await?);
                } else if let Some(inner) = map.get("@list") {
                    let items = expand_values(inner, def, active, loader, depth).await?;
                    out.push(Expanded::List(items));
                } else {
                    let node = expand_node(map, active, loader, depth).await?;
                    out.push(Expanded::Node(node));
                }
            }
        }
        Ok(out)
    })
}

fn plain(value: Scalar) -> Expanded {
    Expanded::Value {
        value,
        value_type: None,
        language: None,
    }
}

/// Native scalars pick up the term's datatype so they recompact under the
/// same term instead of spilling out to a compact IRI.
fn typed_scalar(value: Scalar, def: Option<&TermDefinition>) -> Expanded {
    let value_type = match def.map(|def| def.coercion.as_ref()) {
        Some(Some(TypeCoercion::Typed(t))) => Some(t.clone()),
        _ => None,
    };
    Expanded::Value {
        value,
        value_type,
        language: None,
    }
}

fn expand_value_object(
    map: &serde_json::Map<String, Value>,
    inner: &Value,
    active: &Context,
) -> Option<Expanded> {
    let value = match inner {
        Value::String(s) => Scalar::String(s.clone()),
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Number(n) => Scalar::Number(n.clone()),
        _ => return None,
    };
    let value_type = map
        .get("@type")
        .and_then(Value::as_str)
        .and_then(|t| active.expand_iri(t, true));
    let language = map
        .get("@language")
        .and_then(Value::as_str)
        .map(str::to_owned);
    Some(Expanded::Value {
        value,
        value_type,
        language,
    })
}

fn expand_node<'a>(
    map: &'a serde_json::Map<String, Value>,
    active: &'a Context,
    loader: DocumentLoader<'a>,
    depth: usize,
) -> BoxFuture<'a, Result<ExpandedNode, JsonLdError>> {
    Box::pin(async move {
        if depth > MAX_NODE_DEPTH {
            return Err(JsonLdError::RecursionLimit);
        }
        let mut scoped = None;
        if let Some(local) = map.get("@context") {
            let mut merged = active.clone();
            merged.process(local, loader, 0).await?;
            scoped = Some(merged);
        }
        let ctx = scoped.as_ref().unwrap_or(active);

        let mut node = ExpandedNode::default();
        for (key, value) in map {
            if key == "@context" {
                continue;
            }
            let Some(expanded_key) = ctx.expand_iri(key, true) else {
                continue;
            };
            match expanded_key.as_str() {
                "@id" => {
                    if let Some(id) = value.as_str() {
                        node.id = ctx.expand_iri(id, false);
                    }
                }
                "@type" => {
                    for entry in string_entries(value) {
                        if let Some(iri) = ctx.expand_iri(entry, true) {
                            node.types.push(iri);
                        }
                    }
                }
                "@graph" => {
                    for item in expand_values(value, None, ctx, loader, depth + 1).await? {
                        if let Expanded::Node(child) = item {
                            node.graph.push(child);
                        }
                    }
                }
                // Other keywords carry nothing we model.
                keyword if keyword.starts_with('@') => {}
                _ => {
                    let def = ctx.term(key);
                    let values = if def.is_some_and(|def| def.language_container) {
                        expand_language_map(value)
                    } else {
                        expand_values(value, def, ctx, loader, depth + 1).await?
                    };
                    node.properties
                        .entry(expanded_key)
                        .or_default()
                        .extend(values);
                }
            }
        }
        Ok(node)
    })
}

/// Expands a language map: one tagged string per entry, arrays flattened,
/// non-strings dropped. `@none` maps to an untagged value.
fn expand_language_map(value: &Value) -> Vec<Expanded> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (language, entry) in map {
        let language = (language != "@none").then(|| language.clone());
        match entry {
            Value::String(s) => out.push(Expanded::Value {
                value: Scalar::String(s.clone()),
                value_type: None,
                language: language.clone(),
            }),
            Value::Array(items) => {
                for item in items {
                    if let Value::String(s) = item {
                        out.push(Expanded::Value {
                            value: Scalar::String(s.clone()),
                            value_type: None,
                            language: language.clone(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn string_entries(value: &Value) -> impl Iterator<Item = &str> {
    let items: &[Value] = match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    };
    items.iter().filter_map(Value::as_str)
}

// -- compaction --------------------------------------------------------------

fn compact_node(node: &ExpandedNode, ctx: &Context) -> NodeObject {
    let mut out = NodeObject::new();
    if let Some(id) = &node.id {
        let key = ctx.keyword_alias("@id").unwrap_or("@id").to_owned();
        out.insert(key, JsonLdValue::Scalar(Scalar::String(id.clone())));
    }
    if !node.types.is_empty() {
        let key = ctx.keyword_alias("@type").unwrap_or("@type").to_owned();
        let mut types: Vec<JsonLdValue> = node
            .types
            .iter()
            .map(|iri| {
                JsonLdValue::Scalar(Scalar::String(ctx.compact_iri(iri, &ValueHint::Plain).0))
            })
            .collect();
        let value = if types.len() == 1 {
            types.remove(0)
        } else {
            JsonLdValue::Set(types)
        };
        out.insert(key, value);
    }
    if !node.graph.is_empty() {
        let key = ctx.keyword_alias("@graph").unwrap_or("@graph").to_owned();
        out.insert(
            key,
            JsonLdValue::Set(
                node.graph
                    .iter()
                    .map(|child| JsonLdValue::Node(compact_node(child, ctx)))
                    .collect(),
            ),
        );
    }
    for (iri, values) in &node.properties {
        compact_property(&mut out, iri, values, ctx);
    }
    out
}

/// Compacts one property, selecting a key per value. Values of the same
/// IRI can land under different keys (`content` and `contentMap`, or a
/// term and its compact-IRI spelling when coercion does not line up).
fn compact_property(out: &mut NodeObject, iri: &str, values: &[Expanded], ctx: &Context) {
    let mut groups: IndexMap<String, (Option<&TermDefinition>, Vec<&Expanded>)> = IndexMap::new();
    for value in values {
        let hint = hint_for(value);
        let (key, def) = ctx.compact_iri(iri, &hint);
        groups.entry(key).or_insert_with(|| (def, Vec::new())).1.push(value);
    }
    for (key, (def, members)) in groups {
        if def.is_some_and(|def| def.language_container) {
            out.insert_merge(key, language_map(&members));
            continue;
        }
        let mut compacted: Vec<JsonLdValue> = members
            .iter()
            .map(|value| compact_value(value, def, ctx))
            .collect();
        let value = if compacted.len() == 1 {
            compacted.remove(0)
        } else {
            JsonLdValue::Set(compacted)
        };
        out.insert_merge(key, value);
    }
}

fn language_map(members: &[&Expanded]) -> JsonLdValue {
    let mut map = NodeObject::new();
    for member in members {
        if let Expanded::Value {
            value, language, ..
        } = member
        {
            let entry = language.clone().unwrap_or_else(|| "@none".to_owned());
            map.insert_merge(entry, JsonLdValue::Scalar(value.clone()));
        }
    }
    JsonLdValue::Node(map)
}

fn compact_value(value: &Expanded, def: Option<&TermDefinition>, ctx: &Context) -> JsonLdValue {
    match value {
        // Type and language annotations were consumed by term selection.
        Expanded::Value { value, .. } => JsonLdValue::Scalar(value.clone()),
        Expanded::Node(node) if node.is_reference() => {
            let id = node.id.clone().unwrap_or_default();
            if def.is_some_and(|def| def.coercion == Some(TypeCoercion::Id)) {
                JsonLdValue::Scalar(Scalar::String(id))
            } else {
                let key = ctx.keyword_alias("@id").unwrap_or("@id").to_owned();
                let mut reference = NodeObject::new();
                reference.insert(key, JsonLdValue::Scalar(Scalar::String(id)));
                JsonLdValue::Node(reference)
            }
        }
        Expanded::Node(node) => JsonLdValue::Node(compact_node(node, ctx)),
        Expanded::List(items) => JsonLdValue::Set(
            items
                .iter()
                .map(|item| compact_value(item, def, ctx))
                .collect(),
        ),
    }
}

fn hint_for(value: &Expanded) -> ValueHint<'_> {
    match value {
        Expanded::Value {
            language: Some(_), ..
        } => ValueHint::Language,
        Expanded::Value {
            value_type: Some(t),
            ..
        } => ValueHint::Typed(t),
        Expanded::Value { .. } => ValueHint::Plain,
        Expanded::Node(node) if node.is_reference() => ValueHint::NodeRef,
        Expanded::Node(_) | Expanded::List(_) => ValueHint::Node,
    }
}
