//! Carver - factor shared configuration out of per-environment documents
//!
//! This crate is the filesystem side of carver: it reads a group of
//! environment directories, factors the values every environment shares into
//! a normalized tree (a common document plus per-environment deltas), and
//! merges such a tree back into full per-environment documents. The document
//! engine itself lives in `carver-core`.

pub mod config;
pub mod document;
pub mod group;
pub mod pipeline;

pub use carver_core::{Family, Keymap, Merger, Tree};
pub use config::{CliOverrides, ConfigError, EffectiveConfig};
pub use group::{FileMap, Group, GroupError};
pub use pipeline::{merge_tree, normalize_tree, PipelineError, PipelineResult, RunReport};
