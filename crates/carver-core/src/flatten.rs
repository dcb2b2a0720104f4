//! Path flattening
//!
//! Converts a nested document into a mapping from delimiter-joined path to
//! leaf value, and back. Leaves are scalars, nulls, whole lists and empty
//! documents; lists are never indexed into.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::Tree;

/// Delimiter used to join path segments.
pub const DEFAULT_DELIMITER: &str = ".";

/// A flattened document: path -> leaf value, ordered by path.
pub type FlatDocument = BTreeMap<String, Value>;

/// Errors for flattening and unflattening
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlattenError {
    #[error("key '{key}' under '{path}' contains the path delimiter")]
    DelimiterInKey { path: String, key: String },

    #[error("path '{path}' is both a value and a document")]
    PathConflict { path: String },
}

/// Flattener/unflattener pair sharing one delimiter
#[derive(Debug, Clone)]
pub struct Flattener {
    delimiter: String,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new()
    }
}

impl Flattener {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// Use a different path delimiter
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Flatten a document into path -> leaf pairs.
    ///
    /// Fails if any key contains the delimiter, since the result could not be
    /// unflattened back into the same shape.
    pub fn flatten(&self, tree: &Tree) -> Result<FlatDocument, FlattenError> {
        let mut flat = FlatDocument::new();
        self.flatten_into(tree, None, &mut flat)?;
        Ok(flat)
    }

    fn flatten_into(
        &self,
        tree: &Tree,
        prefix: Option<&str>,
        out: &mut FlatDocument,
    ) -> Result<(), FlattenError> {
        for (key, value) in tree {
            if key.contains(self.delimiter.as_str()) {
                return Err(FlattenError::DelimiterInKey {
                    path: prefix.unwrap_or_default().to_string(),
                    key: key.clone(),
                });
            }

            let path = match prefix {
                Some(p) => format!("{}{}{}", p, self.delimiter, key),
                None => key.clone(),
            };

            match value {
                Value::Object(map) if !map.is_empty() => {
                    self.flatten_into(map, Some(&path), out)?;
                }
                _ => {
                    out.insert(path, value.clone());
                }
            }
        }
        Ok(())
    }

    /// Rebuild a nested document from path -> leaf pairs.
    ///
    /// An empty-document leaf on a path that is already a document is
    /// absorbed. Any other overlap between a leaf and a document fails.
    pub fn unflatten(&self, flat: &FlatDocument) -> Result<Tree, FlattenError> {
        let mut root = Tree::new();

        for (path, value) in flat {
            let mut segments: Vec<&str> = path.split(self.delimiter.as_str()).collect();
            let last = segments.pop().unwrap_or_default();

            let mut node = &mut root;
            for segment in segments {
                let entry = node
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Tree::new()));
                node = match entry {
                    Value::Object(map) => map,
                    _ => return Err(FlattenError::PathConflict { path: path.clone() }),
                };
            }

            match node.get(last) {
                None => {
                    node.insert(last.to_string(), value.clone());
                }
                Some(Value::Object(_)) if is_empty_document(value) => {}
                Some(_) => return Err(FlattenError::PathConflict { path: path.clone() }),
            }
        }

        Ok(root)
    }
}

fn is_empty_document(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}
