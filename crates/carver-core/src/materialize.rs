//! Project a keymap back into one flat document per source name.

use std::collections::BTreeMap;

use crate::flatten::FlatDocument;
use crate::keymap::Keymap;

/// Write every node's value into each document that holds it.
///
/// A name with no attributed nodes does not appear in the output.
pub fn to_files(keymap: &Keymap) -> BTreeMap<String, FlatDocument> {
    let mut files: BTreeMap<String, FlatDocument> = BTreeMap::new();
    for (path, value, node) in keymap.nodes() {
        for name in node.sources() {
            files
                .entry(name.clone())
                .or_default()
                .insert(path.to_string(), value.clone());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::normalize::normalize;
    use serde_json::{json, Value};

    fn doc(name: &str, value: Value) -> Document {
        match value {
            Value::Object(map) => Document::new(name, "", map),
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_to_files_splits_by_source() {
        let keymap = Keymap::build(&[
            doc("a.json", json!({"shared": 1, "only_a": {"x": true}})),
            doc("b.json", json!({"shared": 1})),
        ])
        .unwrap();
        let files = to_files(&keymap);

        assert_eq!(files.len(), 2);
        assert_eq!(files["a.json"].len(), 2);
        assert_eq!(files["a.json"]["only_a.x"], json!(true));
        assert_eq!(files["b.json"]["shared"], json!(1));
    }

    #[test]
    fn test_empty_names_are_omitted() {
        let keymap = Keymap::build(&[
            doc("a.json", json!({"same": "value"})),
            doc("b.json", json!({"same": "value"})),
        ])
        .unwrap();
        let files = to_files(&normalize(keymap, "common.json", 2));

        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["common.json"]);
        assert_eq!(files["common.json"]["same"], json!("value"));
    }

    #[test]
    fn test_empty_keymap() {
        assert!(to_files(&Keymap::new()).is_empty());
    }
}
