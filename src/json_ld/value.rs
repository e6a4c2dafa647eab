//! Compacted JSON-LD values as an explicit sum type
//!
//! Compaction output is decoded once into [`JsonLdValue`] so extractors
//! never juggle raw `serde_json::Value`s: a position is a scalar, a node
//! object, or a set, and nothing else. Value objects collapse to their
//! scalar, `@set`/`@list` wrappers collapse to sets, and `null` becomes the
//! empty set.

use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};

/// A single compacted JSON-LD value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonLdValue {
    Scalar(Scalar),
    Node(NodeObject),
    Set(Vec<JsonLdValue>),
}

/// A JSON scalar inside a compacted document.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl JsonLdValue {
    /// Decodes raw JSON into the sum type.
    ///
    /// `{"@value": ...}` wrappers collapse to their scalar (dropping type
    /// and language annotations), `{"@set"|"@list": ...}` wrappers collapse
    /// to sets, and `null` decodes to the empty set. Any other object is a
    /// node object; language maps are ordinary node objects whose keys are
    /// language tags.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Set(Vec::new()),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n.clone())),
            Value::String(s) => Self::Scalar(Scalar::String(s.clone())),
            Value::Array(items) => Self::Set(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                if let Some(inner) = map.get("@value") {
                    return match Self::from_json(inner) {
                        scalar @ Self::Scalar(_) => scalar,
                        _ => Self::Set(Vec::new()),
                    };
                }
                if let Some(inner) = map.get("@set").or_else(|| map.get("@list")) {
                    return match Self::from_json(inner) {
                        set @ Self::Set(_) => set,
                        single => Self::Set(vec![single]),
                    };
                }
                Self::Node(
                    map.iter()
                        .map(|(key, value)| (key.clone(), Self::from_json(value)))
                        .collect(),
                )
            }
        }
    }

    /// First value of a set, or the value itself when it is not a set.
    #[must_use]
    pub fn first(&self) -> Option<&Self> {
        match self {
            Self::Set(items) => items.first(),
            other => Some(other),
        }
    }

    /// Iterates the value as a set: a set yields its elements, anything
    /// else yields itself once.
    pub fn iter(&self) -> SetIter<'_> {
        match self {
            Self::Set(items) => SetIter::Many(items.iter()),
            other => SetIter::One(Some(other)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Scalar(Scalar::Number(n)) => n.as_u64()?.try_into().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&NodeObject> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// Iterator over the set view of a [`JsonLdValue`].
pub enum SetIter<'a> {
    One(Option<&'a JsonLdValue>),
    Many(std::slice::Iter<'a, JsonLdValue>),
}

impl<'a> Iterator for SetIter<'a> {
    type Item = &'a JsonLdValue;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::One(item) => item.take(),
            Self::Many(items) => items.next(),
        }
    }
}

/// A compacted node object: ordered keys mapping to decoded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeObject(IndexMap<String, JsonLdValue>);

impl NodeObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonLdValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// First value under `key`, flattening one set level.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&JsonLdValue> {
        self.0.get(key)?.first()
    }

    /// Set view of the values under `key`; empty when the key is absent.
    pub fn values(&self, key: &str) -> SetIter<'_> {
        match self.0.get(key) {
            Some(value) => value.iter(),
            None => SetIter::One(None),
        }
    }

    /// First string among the values under `key`.
    #[must_use]
    pub fn first_str(&self, key: &str) -> Option<&str> {
        self.values(key).find_map(JsonLdValue::as_str)
    }

    /// The value under `key` only when it is a plain string, without set
    /// flattening.
    #[must_use]
    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    /// Strings among the values under `key`.
    pub fn strings(&self, key: &str) -> impl Iterator<Item = &str> {
        self.values(key).filter_map(JsonLdValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonLdValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut JsonLdValue> {
        self.0.get_mut(key)
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: JsonLdValue) {
        self.0.insert(key.into(), value);
    }

    /// Inserts a value, merging into a set when the key already exists.
    pub(crate) fn insert_merge(&mut self, key: impl Into<String>, value: JsonLdValue) {
        let key = key.into();
        match self.0.shift_remove(&key) {
            None => {
                self.0.insert(key, value);
            }
            Some(JsonLdValue::Set(mut items)) => {
                match value {
                    JsonLdValue::Set(more) => items.extend(more),
                    single => items.push(single),
                }
                self.0.insert(key, JsonLdValue::Set(items));
            }
            Some(existing) => {
                let mut items = vec![existing];
                match value {
                    JsonLdValue::Set(more) => items.extend(more),
                    single => items.push(single),
                }
                self.0.insert(key, JsonLdValue::Set(items));
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<JsonLdValue> {
        self.0.shift_remove(key)
    }
}

impl FromIterator<(String, JsonLdValue)> for NodeObject {
    fn from_iter<T: IntoIterator<Item = (String, JsonLdValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for NodeObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter())
    }
}

impl Serialize for JsonLdValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::Node(node) => node.serialize(serializer),
            Self::Set(items) => serializer.collect_seq(items),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => n.serialize(serializer),
            Self::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

/// A resolved language-map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageEntry<'a> {
    /// Language tag; `None` for `@none` entries and untagged strings.
    pub language: Option<&'a str>,
    /// The string value.
    pub value: &'a str,
}

/// Resolves language-tagged text from a compacted position.
///
/// A plain string resolves without a language. A node object is read as a
/// language map: the first entry whose value (after one level of set
/// flattening) is a string wins, with `@none` mapping to no language.
#[must_use]
pub fn first_of_language_map(value: &JsonLdValue) -> Option<LanguageEntry<'_>> {
    match value.first()? {
        JsonLdValue::Scalar(Scalar::String(s)) => Some(LanguageEntry {
            language: None,
            value: s,
        }),
        JsonLdValue::Node(map) => map.iter().find_map(|(language, entry)| {
            let value = entry.first()?.as_str()?;
            Some(LanguageEntry {
                language: (language != "@none").then_some(language),
                value,
            })
        }),
        _ => None,
    }
}
