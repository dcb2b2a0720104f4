//! A keymap together with the names of the documents it was built from.
//!
//! Building is the only fallible step; the transforms after it are total, so
//! a run reads as one `?` followed by a plain chain:
//!
//! ```
//! # use carver_core::{Document, Family, KeymapError};
//! # fn run(documents: &[Document]) -> Result<(), KeymapError> {
//! let files = Family::build(documents)?.normalize("app.json").into_files();
//! # let _ = files;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::document::Document;
use crate::flatten::{FlatDocument, Flattener};
use crate::keymap::{Keymap, KeymapError};
use crate::materialize::to_files;
use crate::normalize::{normalize, resolve};

/// A keymap over a family of related documents
#[derive(Debug, Clone, PartialEq)]
pub struct Family {
    keymap: Keymap,
    names: Vec<String>,
}

impl Family {
    /// Index a set of uniquely named documents
    pub fn build(documents: &[Document]) -> Result<Self, KeymapError> {
        Self::build_with(documents, &Flattener::new())
    }

    pub fn build_with(documents: &[Document], flattener: &Flattener) -> Result<Self, KeymapError> {
        let mut seen = HashSet::new();
        for document in documents {
            if !seen.insert(document.name()) {
                return Err(KeymapError::DuplicateName(document.name().to_string()));
            }
        }

        let keymap = Keymap::build_with(documents, flattener)?;
        let names = documents.iter().map(|d| d.name().to_string()).collect();
        Ok(Self { keymap, names })
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Document names in input order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Factor values shared by every document onto `common_name`
    pub fn normalize(self, common_name: &str) -> Self {
        let total = self.names.len();
        Self {
            keymap: normalize(self.keymap, common_name, total),
            names: self.names,
        }
    }

    /// Broadcast the `common_name` document back onto every other document
    pub fn resolve(self, common_name: &str) -> Self {
        let keymap = resolve(self.keymap, common_name, &self.names);
        Self {
            keymap,
            names: self.names,
        }
    }

    /// Materialize one flat document per name
    pub fn into_files(self) -> BTreeMap<String, FlatDocument> {
        to_files(&self.keymap)
    }

    pub fn into_keymap(self) -> Keymap {
        self.keymap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(name: &str, value: Value) -> Document {
        match value {
            Value::Object(map) => Document::new(name, "", map),
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_build_records_names_in_order() {
        let family = Family::build(&[
            doc("b.json", json!({"x": 1})),
            doc("a.json", json!({"x": 1})),
        ])
        .unwrap();
        assert_eq!(family.names(), ["b.json", "a.json"]);
        assert_eq!(family.keymap().len(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Family::build(&[doc("a.json", json!({})), doc("a.json", json!({}))]).unwrap_err();
        assert_eq!(err, KeymapError::DuplicateName("a.json".to_string()));
    }

    #[test]
    fn test_first_failure_short_circuits() {
        fn run(documents: &[Document]) -> Result<BTreeMap<String, FlatDocument>, KeymapError> {
            Ok(Family::build(documents)?.normalize("app.json").into_files())
        }

        let good = [doc("dev/app.json", json!({"a": 1})), doc("prod/app.json", json!({"a": 1}))];
        let files = run(&good).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files["app.json"]["a"], json!(1));

        let bad = [doc("dev/app.json", json!({"a.b": 1}))];
        assert!(matches!(run(&bad), Err(KeymapError::Flatten { .. })));
    }

    #[test]
    fn test_normalize_then_resolve() {
        let envs = [
            doc("dev/app.json", json!({"name": "app", "port": 1})),
            doc("prod/app.json", json!({"name": "app", "port": 2})),
        ];
        let files = Family::build(&envs).unwrap().normalize("app.json").into_files();
        assert_eq!(files.len(), 3);

        let factored: Vec<Document> = files
            .iter()
            .map(|(name, flat)| Document::new(name.clone(), "", Flattener::new().unflatten(flat).unwrap()))
            .collect();
        let rebuilt = Family::build(&factored).unwrap().resolve("app.json").into_files();

        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt["dev/app.json"]["name"], json!("app"));
        assert_eq!(rebuilt["prod/app.json"]["port"], json!(2));
    }
}
