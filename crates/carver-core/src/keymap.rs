//! Keymap index
//!
//! For a family of related documents, records every (path, value) pair seen
//! anywhere, and which documents it was seen in:
//!
//! ```text
//! path -> type class -> canonical value -> { count, sources }
//! ```
//!
//! A keymap holds everything needed to rebuild every document in the family.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::document::Document;
use crate::flatten::{FlattenError, Flattener};
use crate::value::{EncodeError, EncodedLeaf, TypeClass};

/// Errors for building a keymap
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeymapError {
    #[error("document '{name}': {source}")]
    Flatten { name: String, source: FlattenError },

    #[error("document '{name}', path '{path}': {source}")]
    Encode {
        name: String,
        path: String,
        source: EncodeError,
    },

    #[error("duplicate document name: '{0}'")]
    DuplicateName(String),
}

/// One distinct (path, value) observation.
///
/// `count` always equals the number of sources: the only ways to change a
/// node are `add_source` and building a new one with `from_sources`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct KeymapNode {
    count: usize,
    sources: BTreeSet<String>,
}

impl KeymapNode {
    /// A node seen in no documents
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a node attributed to exactly these (deduplicated) sources
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sources: BTreeSet<String> = sources.into_iter().map(Into::into).collect();
        Self {
            count: sources.len(),
            sources,
        }
    }

    /// Record a source. Returns false (and changes nothing) if already present.
    pub fn add_source(&mut self, name: impl Into<String>) -> bool {
        let inserted = self.sources.insert(name.into());
        if inserted {
            self.count += 1;
        }
        inserted
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains(name)
    }

    pub fn is_zero(&self) -> bool {
        self.count == 0
    }
}

/// A leaf value together with the node tracking where it occurs
#[derive(Debug, Clone, PartialEq)]
struct Slot {
    value: Value,
    node: KeymapNode,
}

type ValueIndex = BTreeMap<String, Slot>;

/// Flattened key index over a family of documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keymap {
    paths: BTreeMap<String, BTreeMap<TypeClass, ValueIndex>>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keymap from a set of documents with the default flattener.
    ///
    /// Either every document is indexed or an error is returned; no partial
    /// keymap escapes.
    pub fn build(documents: &[Document]) -> Result<Self, KeymapError> {
        Self::build_with(documents, &Flattener::new())
    }

    /// Build a keymap using a specific flattener
    pub fn build_with(documents: &[Document], flattener: &Flattener) -> Result<Self, KeymapError> {
        let mut keymap = Self::new();
        for document in documents {
            keymap.insert_document(document, flattener)?;
        }
        Ok(keymap)
    }

    /// Index one document.
    ///
    /// The document is flattened and every leaf encoded before anything is
    /// written, so a failure leaves the keymap unchanged.
    pub fn insert_document(
        &mut self,
        document: &Document,
        flattener: &Flattener,
    ) -> Result<(), KeymapError> {
        let name = document.name();
        let flat = flattener
            .flatten(document.tree())
            .map_err(|source| KeymapError::Flatten {
                name: name.to_string(),
                source,
            })?;

        let mut leaves = Vec::with_capacity(flat.len());
        for (path, value) in flat {
            let leaf = EncodedLeaf::encode(&value).map_err(|source| KeymapError::Encode {
                name: name.to_string(),
                path: path.clone(),
                source,
            })?;
            leaves.push((path, leaf, value));
        }

        tracing::debug!(document = name, leaves = leaves.len(), "indexing document");

        for (path, leaf, value) in leaves {
            let slot = self
                .paths
                .entry(path)
                .or_default()
                .entry(leaf.class())
                .or_default()
                .entry(leaf.text().to_string())
                .or_insert_with(|| Slot {
                    value,
                    node: KeymapNode::new(),
                });
            slot.node.add_source(name);
        }

        Ok(())
    }

    /// Node for an encoded leaf at a path; a zero node when never seen
    pub fn lookup(&self, path: &str, leaf: &EncodedLeaf) -> KeymapNode {
        self.paths
            .get(path)
            .and_then(|classes| classes.get(&leaf.class()))
            .and_then(|values| values.get(leaf.text()))
            .map(|slot| slot.node.clone())
            .unwrap_or_default()
    }

    /// Node for a raw value at a path.
    ///
    /// A value that cannot be encoded was never indexed, so it yields a zero
    /// node like any other absent value.
    pub fn lookup_value(&self, path: &str, value: &Value) -> KeymapNode {
        match EncodedLeaf::encode(value) {
            Ok(leaf) => self.lookup(path, &leaf),
            Err(_) => KeymapNode::new(),
        }
    }

    /// Iterate over every (path, value, node) triple
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Value, &KeymapNode)> {
        self.paths.iter().flat_map(|(path, classes)| {
            classes
                .values()
                .flat_map(|values| values.values())
                .map(move |slot| (path.as_str(), &slot.value, &slot.node))
        })
    }

    /// Visit every node mutably, exactly once
    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut KeymapNode> {
        self.paths
            .values_mut()
            .flat_map(|classes| classes.values_mut())
            .flat_map(|values| values.values_mut())
            .map(|slot| &mut slot.node)
    }

    /// Number of distinct (path, value) nodes
    pub fn len(&self) -> usize {
        self.paths
            .values()
            .flat_map(|classes| classes.values())
            .map(|values| values.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of distinct paths
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }
}

impl Serialize for Keymap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let view: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, &KeymapNode>>> = self
            .paths
            .iter()
            .map(|(path, classes)| {
                let classes = classes
                    .iter()
                    .map(|(class, values)| {
                        let values = values
                            .iter()
                            .map(|(text, slot)| (text.as_str(), &slot.node))
                            .collect();
                        (class.as_str(), values)
                    })
                    .collect();
                (path.as_str(), classes)
            })
            .collect();
        view.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(name: &str, value: Value) -> Document {
        match value {
            Value::Object(map) => Document::new(name, "", map),
            other => panic!("not an object: {}", other),
        }
    }

    fn example_keymap() -> Keymap {
        Keymap::build(&[
            doc("example.json", json!({"foo": "biz"})),
            doc("example2.json", json!({"foo": true})),
            doc("example3.json", json!({"foo": [1, 2]})),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_string() {
        let node = example_keymap().lookup_value("foo", &json!("biz"));
        assert_eq!(node, KeymapNode::from_sources(["example.json"]));
    }

    #[test]
    fn test_lookup_bool() {
        let node = example_keymap().lookup_value("foo", &json!(true));
        assert_eq!(node, KeymapNode::from_sources(["example2.json"]));
    }

    #[test]
    fn test_lookup_list() {
        let node = example_keymap().lookup_value("foo", &json!([1, 2]));
        assert_eq!(node, KeymapNode::from_sources(["example3.json"]));
    }

    #[test]
    fn test_lookup_absent_is_zero() {
        let keymap = example_keymap();
        assert!(keymap.lookup_value("foo", &json!("true")).is_zero());
        assert!(keymap.lookup_value("missing", &json!(1)).is_zero());
    }

    #[test]
    fn test_build_nested() {
        let keymap =
            Keymap::build(&[doc("exampleTest.json", json!({"biz": {"baz": "bar"}}))]).unwrap();
        let serialized = serde_json::to_value(&keymap).unwrap();
        assert_eq!(
            serialized,
            json!({
                "biz.baz": {
                    "string": {
                        "\"bar\"": {"count": 1, "sources": ["exampleTest.json"]}
                    }
                }
            })
        );
    }

    #[test]
    fn test_build_empty_document() {
        let keymap = Keymap::build(&[doc("exampleTest.json", json!({}))]).unwrap();
        assert!(keymap.is_empty());
        assert_eq!(keymap.len(), 0);
    }

    #[test]
    fn test_counts_accumulate() {
        let keymap = Keymap::build(&[
            doc("a.json", json!({"port": 80, "name": "a"})),
            doc("b.json", json!({"port": 80, "name": "b"})),
            doc("c.json", json!({"port": "80", "name": "c"})),
        ])
        .unwrap();

        let port = keymap.lookup_value("port", &json!(80));
        assert_eq!(port.count(), 2);
        assert!(port.contains("a.json"));
        assert!(port.contains("b.json"));
        assert_eq!(keymap.lookup_value("port", &json!("80")).count(), 1);
        assert_eq!(keymap.path_count(), 2);
        assert_eq!(keymap.len(), 5);
    }

    #[test]
    fn test_count_matches_sources() {
        let keymap = example_keymap();
        for (_, _, node) in keymap.nodes() {
            assert_eq!(node.count(), node.sources().len());
        }
    }

    #[test]
    fn test_add_source_is_idempotent() {
        let mut node = KeymapNode::new();
        assert!(node.add_source("a"));
        assert!(!node.add_source("a"));
        assert_eq!(node.count(), 1);
        assert_eq!(KeymapNode::from_sources(["a", "b", "a"]).count(), 2);
    }

    #[test]
    fn test_build_is_all_or_nothing() {
        let mut keymap = Keymap::build(&[doc("good.json", json!({"a": 1}))]).unwrap();
        let before = keymap.clone();

        let err = keymap
            .insert_document(&doc("bad.json", json!({"b": 2, "c.d": 3})), &Flattener::new())
            .unwrap_err();
        assert!(matches!(err, KeymapError::Flatten { ref name, .. } if name == "bad.json"));
        assert_eq!(keymap, before);

        let result = Keymap::build(&[
            doc("good.json", json!({"a": 1})),
            doc("bad.json", json!({"c.d": 3})),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_inexact_integer_in_list_fails_build() {
        let err = Keymap::build(&[doc("big.json", json!({"ids": [9007199254740993u64]}))])
            .unwrap_err();
        assert_eq!(
            err,
            KeymapError::Encode {
                name: "big.json".to_string(),
                path: "ids".to_string(),
                source: EncodeError::Unrepresentable("9007199254740993".to_string()),
            }
        );
    }

    #[test]
    fn test_large_integers_index_separately() {
        let keymap = Keymap::build(&[
            doc("a.json", json!({"id": 9007199254740993u64})),
            doc("b.json", json!({"id": 9007199254740992u64})),
        ])
        .unwrap();
        assert_eq!(
            keymap.lookup_value("id", &json!(9007199254740993u64)),
            KeymapNode::from_sources(["a.json"])
        );
        assert_eq!(keymap.len(), 2);
    }
}
