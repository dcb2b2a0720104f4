//! Named documents.

use std::path::{Path, PathBuf};

use crate::Tree;

/// A fully parsed document, identified by name.
///
/// The name is unique within one run and is what the keymap records as a
/// source. The root is the directory the name is relative to.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    name: String,
    root: PathBuf,
    tree: Tree,
}

impl Document {
    /// Create a document from its name, storage root and parsed tree
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, tree: Tree) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            tree,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Path of the document on disk (root joined with name)
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }
}
