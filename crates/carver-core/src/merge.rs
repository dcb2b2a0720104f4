//! Override-merge of nested documents
//!
//! Merge semantics:
//! - Documents: merged key by key (recursive)
//! - Lists: REPLACE (overlay wins entirely)
//! - Scalars and null: override (overlay wins)
//!
//! An overlay may carry a control key (default `__`) at any level. Its value
//! is a list of directives applied, in order, after that level is merged:
//! - `{"remove": ["a", "b"]}` deletes keys from the merged result
//! - `{"replace": {}}` drops everything the base contributed at this level
//!
//! Malformed directives are ignored.

use serde_json::Value;

use crate::Tree;

/// Reserved key carrying merge directives.
pub const DEFAULT_CONTROL_KEY: &str = "__";

const REPLACE: &str = "replace";
const REMOVE: &str = "remove";

/// Override-merge with a configurable control key
#[derive(Debug, Clone)]
pub struct Merger {
    control_key: String,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

impl Merger {
    pub fn new() -> Self {
        Self {
            control_key: DEFAULT_CONTROL_KEY.to_string(),
        }
    }

    pub fn with_control_key(mut self, key: impl Into<String>) -> Self {
        self.control_key = key.into();
        self
    }

    pub fn control_key(&self) -> &str {
        &self.control_key
    }

    /// Merge `overlay` onto `base`, returning a new document.
    ///
    /// Neither input is modified.
    pub fn merge(&self, overlay: &Tree, base: &Tree) -> Tree {
        let mut merged = base.clone();
        for (key, overlay_value) in overlay {
            if *key == self.control_key {
                continue;
            }
            merged.insert(key.clone(), self.merge_value(overlay_value, base.get(key)));
        }

        match overlay.get(&self.control_key) {
            Some(directives) => self.apply_directives(directives, overlay, merged),
            None => merged,
        }
    }

    /// Merge layers in order (first is base, last has highest precedence)
    pub fn merge_layers<'a, I>(&self, layers: I) -> Tree
    where
        I: IntoIterator<Item = &'a Tree>,
    {
        layers
            .into_iter()
            .fold(Tree::new(), |acc, layer| self.merge(layer, &acc))
    }

    fn merge_value(&self, overlay: &Value, base: Option<&Value>) -> Value {
        match (overlay, base) {
            (Value::Object(overlay_map), Some(Value::Object(base_map))) => {
                Value::Object(self.merge(overlay_map, base_map))
            }
            // Still merged so nested control keys are consumed
            (Value::Object(overlay_map), _) => Value::Object(self.merge(overlay_map, &Tree::new())),
            (other, _) => other.clone(),
        }
    }

    /// The overlay's own keys at this level, without its control key
    fn overlay_only(&self, overlay: &Tree) -> Tree {
        overlay
            .iter()
            .filter(|(key, _)| **key != self.control_key)
            .map(|(key, value)| (key.clone(), self.merge_value(value, None)))
            .collect()
    }

    fn apply_directives(&self, directives: &Value, overlay: &Tree, mut merged: Tree) -> Tree {
        let Value::Array(directives) = directives else {
            tracing::debug!(control_key = %self.control_key, "ignoring non-list directives");
            return merged;
        };

        for directive in directives {
            let Value::Object(directive) = directive else {
                tracing::debug!(?directive, "ignoring non-object directive");
                continue;
            };

            if directive.contains_key(REPLACE) {
                merged = self.overlay_only(overlay);
            }

            if let Some(remove) = directive.get(REMOVE) {
                match remove {
                    Value::Array(keys) => {
                        for key in keys {
                            match key {
                                Value::String(key) => {
                                    merged.remove(key);
                                }
                                other => tracing::debug!(key = ?other, "ignoring non-string remove key"),
                            }
                        }
                    }
                    other => tracing::debug!(remove = ?other, "ignoring non-list remove"),
                }
            }

            for name in directive.keys() {
                if name != REPLACE && name != REMOVE {
                    tracing::debug!(directive = %name, "ignoring unknown directive");
                }
            }
        }

        merged
    }
}

/// Merge `overlay` onto `base` with the default control key
pub fn merge(overlay: &Tree, base: &Tree) -> Tree {
    Merger::new().merge(overlay, base)
}

/// Merge layers in order with the default control key
pub fn merge_layers<'a, I>(layers: I) -> Tree
where
    I: IntoIterator<Item = &'a Tree>,
{
    Merger::new().merge_layers(layers)
}
