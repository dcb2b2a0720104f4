//! Built-in defaults (layer 1)

use carver_core::{Tree, DEFAULT_CONTROL_KEY};
use serde::{Deserialize, Serialize};

/// Default normalized directory, relative to the config directory.
pub const DEFAULT_NORMALIZED_DIR: &str = ".carver";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Where normalized output goes (default: ".carver")
    pub normalized_dir: String,

    /// Reserved key carrying merge directives (default: "__")
    pub control_key: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            normalized_dir: DEFAULT_NORMALIZED_DIR.to_string(),
            control_key: DEFAULT_CONTROL_KEY.to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a document for layering
    pub fn to_tree(&self) -> Tree {
        let mut tree = Tree::new();
        tree.insert("normalized_dir".to_string(), self.normalized_dir.clone().into());
        tree.insert("control_key".to_string(), self.control_key.clone().into());
        tree
    }
}
