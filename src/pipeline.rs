//! Pipelines over a group of environment directories
//!
//! - normalize: config dir -> normalized dir (common document + deltas)
//! - merge: normalized dir -> config dir (full per-environment documents)
//!
//! plus the single-shot document operations behind `compose`, `common` and
//! `keymap`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use carver_core::{
    common_all, Family, FlatDocument, FlattenError, Flattener, Keymap, KeymapError, Merger, Tree,
    DEFAULT_CONTROL_KEY,
};
use thiserror::Error;

use crate::config::{find_config_file, CliOverrides, ConfigError, EffectiveConfig};
use crate::document::{load_path, write_document, DocumentError};
use crate::group::{Group, GroupError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("group error: {0}")]
    Group(#[from] GroupError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("family '{key}': {source}")]
    Keymap { key: String, source: KeymapError },

    #[error("document '{name}': {source}")]
    Unflatten { name: String, source: FlattenError },

    #[error("no family '{0}' in group")]
    UnknownFamily(String),

    #[error("{command} needs at least {min} documents")]
    TooFewDocuments { command: &'static str, min: usize },
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Group(_) => 3,
            PipelineError::Document(_) => 3,
            PipelineError::Keymap { .. } => 4,
            PipelineError::Unflatten { .. } => 4,
            PipelineError::UnknownFamily(_) => 1,
            PipelineError::TooFewDocuments { .. } => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// What a run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Number of families processed
    pub families: usize,
    /// Files written, in write order
    pub written: Vec<PathBuf>,
}

/// Factor every family under `group` into `dest`.
///
/// Each family key becomes the common document name. Every environment
/// document is written, empty if it has no deltas, so that a later merge
/// can broadcast the common values back to it.
pub fn normalize_tree(group: &Group, dest: &Path) -> PipelineResult<RunReport> {
    let file_map = group.file_map(false)?;
    let flattener = Flattener::new();
    let mut report = RunReport::default();

    for family in file_map.families() {
        let (key, documents) = family?;
        let mut files = Family::build_with(&documents, &flattener)
            .map_err(|source| PipelineError::Keymap {
                key: key.to_string(),
                source,
            })?
            .normalize(key)
            .into_files();

        for document in &documents {
            files.entry(document.name().to_string()).or_default();
        }

        tracing::info!(family = key, documents = documents.len(), "normalized family");
        report.written.extend(write_files(dest, files, &flattener)?);
        report.families += 1;
    }

    Ok(report)
}

/// Rebuild full environment documents from the normalized tree in `group`.
///
/// A family without a common document passes its deltas through unchanged.
pub fn merge_tree(group: &Group, dest: &Path) -> PipelineResult<RunReport> {
    let file_map = group.file_map(true)?;
    let flattener = Flattener::new();
    let mut report = RunReport::default();

    for family in file_map.families() {
        let (key, documents) = family?;
        if !documents.iter().any(|d| d.name() == key) {
            tracing::warn!(family = key, "no common document, deltas pass through");
        }

        let mut files = Family::build_with(&documents, &flattener)
            .map_err(|source| PipelineError::Keymap {
                key: key.to_string(),
                source,
            })?
            .resolve(key)
            .into_files();

        for document in documents.iter().filter(|d| d.name() != key) {
            files.entry(document.name().to_string()).or_default();
        }

        tracing::info!(family = key, documents = documents.len(), "merged family");
        report.written.extend(write_files(dest, files, &flattener)?);
        report.families += 1;
    }

    Ok(report)
}

fn write_files(
    dest: &Path,
    files: BTreeMap<String, FlatDocument>,
    flattener: &Flattener,
) -> PipelineResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for (name, flat) in files {
        let tree = flattener
            .unflatten(&flat)
            .map_err(|source| PipelineError::Unflatten {
                name: name.clone(),
                source,
            })?;
        written.push(write_document(dest, &name, &tree)?);
    }
    Ok(written)
}

/// Keymap of one family, for inspection
pub fn family_keymap(group: &Group, key: &str, include_root_files: bool) -> PipelineResult<Keymap> {
    let file_map = group.file_map(include_root_files)?;
    if file_map.names(key).is_empty() {
        return Err(PipelineError::UnknownFamily(key.to_string()));
    }

    let documents = file_map.load_family(key)?;
    Keymap::build(&documents).map_err(|source| PipelineError::Keymap {
        key: key.to_string(),
        source,
    })
}

/// Merger for `compose`.
///
/// The control key comes from the command line, then from the group config
/// in `config_dir` if there is one, then the built-in default.
pub fn compose_merger(config_dir: &Path, control_key: Option<String>) -> PipelineResult<Merger> {
    let key = match find_config_file(config_dir) {
        Some(_) => {
            let cli = CliOverrides {
                control_key,
                ..CliOverrides::default()
            };
            EffectiveConfig::build(config_dir, &cli)?.control_key().to_string()
        }
        None => control_key.unwrap_or_else(|| DEFAULT_CONTROL_KEY.to_string()),
    };

    if key.is_empty() {
        return Err(ConfigError::Invalid("control_key must not be empty".to_string()).into());
    }
    tracing::debug!(control_key = %key, "compose control key");
    Ok(Merger::new().with_control_key(key))
}

/// Override-merge documents left to right; the first is the base
pub fn compose_files(paths: &[PathBuf], merger: &Merger) -> PipelineResult<Tree> {
    if paths.is_empty() {
        return Err(PipelineError::TooFewDocuments {
            command: "compose",
            min: 1,
        });
    }

    let layers = load_all(paths)?;
    Ok(merger.merge_layers(&layers))
}

/// Structural intersection of documents
pub fn common_files(paths: &[PathBuf]) -> PipelineResult<Tree> {
    if paths.len() < 2 {
        return Err(PipelineError::TooFewDocuments {
            command: "common",
            min: 2,
        });
    }

    let documents = load_all(paths)?;
    Ok(common_all(&documents))
}

fn load_all(paths: &[PathBuf]) -> PipelineResult<Vec<Tree>> {
    paths
        .iter()
        .map(|path| load_path(path).map_err(PipelineError::from))
        .collect()
}
