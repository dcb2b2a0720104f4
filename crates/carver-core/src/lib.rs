//! Configuration factoring and composition engine.
//!
//! Indexes a family of near-duplicate documents by flat path and leaf value,
//! factors values shared by every document into a common document (and back),
//! and composes layered documents with an override-merge that understands
//! remove/replace control directives.

mod common;
mod document;
mod family;
mod flatten;
mod keymap;
mod materialize;
mod merge;
mod normalize;
mod value;

pub use common::{common, common_all, intersect_sorted};
pub use document::Document;
pub use family::Family;
pub use flatten::{FlatDocument, FlattenError, Flattener, DEFAULT_DELIMITER};
pub use keymap::{Keymap, KeymapError, KeymapNode};
pub use materialize::to_files;
pub use merge::{merge, merge_layers, Merger, DEFAULT_CONTROL_KEY};
pub use normalize::{normalize, resolve};
pub use value::{EncodeError, EncodedLeaf, TypeClass};

/// A nested document tree: string keys to scalars, lists and sub-documents.
pub type Tree = serde_json::Map<String, serde_json::Value>;
