//! Factoring transforms over a keymap
//!
//! `normalize` moves values present in every document onto the common
//! document. `resolve` is its inverse: values held by the common document are
//! broadcast back to every other document, and per-document deltas pass
//! through unchanged.

use crate::keymap::{Keymap, KeymapNode};

/// Attribute every value found in all `total` documents to `common_name`.
///
/// A node seen in fewer documents keeps its sources. A common node ends up
/// held by the single common document, so its count becomes 1.
///
/// After normalize a count is the number of documents holding the value in
/// the factored output, no longer the number of input documents it was seen in.
pub fn normalize(mut keymap: Keymap, common_name: &str, total: usize) -> Keymap {
    let mut factored = 0usize;
    for node in keymap.nodes_mut() {
        if node.count() == total {
            *node = KeymapNode::from_sources([common_name]);
            factored += 1;
        }
    }
    tracing::debug!(common = common_name, total, factored, "normalized keymap");
    keymap
}

/// Broadcast values held by `common_name` to every other name in `names`.
///
/// Nodes not held by the common document are left alone, so a keymap with
/// no common document comes back unchanged.
pub fn resolve(mut keymap: Keymap, common_name: &str, names: &[String]) -> Keymap {
    let targets: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| *name != common_name)
        .collect();

    let mut broadcast = 0usize;
    for node in keymap.nodes_mut() {
        if node.contains(common_name) {
            *node = KeymapNode::from_sources(targets.iter().copied());
            broadcast += 1;
        }
    }
    tracing::debug!(common = common_name, targets = targets.len(), broadcast, "resolved keymap");
    keymap
}
