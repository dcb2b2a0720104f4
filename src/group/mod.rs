//! Groups of environment directories
//!
//! A group is a root directory plus the environment directories below it,
//! e.g. `project/` with `envA/` and `envB/`. Files with the same path inside
//! each environment form a family:
//!
//! ```text
//! app.json -> [envA/app.json, envB/app.json]
//! ```
//!
//! A family may also include a common document at `root/app.json`, named by
//! the family key itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use carver_core::Document;
use walkdir::{DirEntry, WalkDir};

use crate::document::{load_document, DocumentError};

/// Errors for scanning a group
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A root directory and its environment directories
#[derive(Debug, Clone)]
pub struct Group {
    root: PathBuf,
    dirs: Vec<String>,
}

impl Group {
    pub fn new(root: impl Into<PathBuf>, dirs: Vec<String>) -> Self {
        Self {
            root: root.into(),
            dirs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// Scan every environment directory into a file map.
    ///
    /// With `include_root_files`, a file at `root/<key>` joins the `<key>`
    /// family as its common document. Missing environment directories are
    /// skipped with a warning; hidden files and directories are ignored.
    pub fn file_map(&self, include_root_files: bool) -> Result<FileMap, GroupError> {
        let mut entries: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for dir in &self.dirs {
            let env_root = self.root.join(dir);
            if !env_root.is_dir() {
                tracing::warn!(dir = %env_root.display(), "environment directory missing, skipping");
                continue;
            }

            for entry in WalkDir::new(&env_root)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_hidden(e))
            {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let key = relative_key(entry.path(), &env_root)?;
                let name = format!("{}/{}", dir, key);
                entries.entry(key).or_default().push(name);
            }
        }

        if include_root_files {
            for (key, names) in entries.iter_mut() {
                if self.root.join(key.as_str()).is_file() {
                    names.insert(0, key.clone());
                }
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            families = entries.len(),
            include_root_files,
            "scanned group"
        );

        Ok(FileMap {
            root: self.root.clone(),
            entries,
        })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// `/`-joined path of `path` relative to `base`
fn relative_key(path: &Path, base: &Path) -> Result<String, GroupError> {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| GroupError::NonUtf8Path(path.to_path_buf()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Family key -> document names, relative to the group root
#[derive(Debug, Clone)]
pub struct FileMap {
    root: PathBuf,
    entries: BTreeMap<String, Vec<String>>,
}

impl FileMap {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Family keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Document names of one family
    pub fn names(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read every document of one family
    pub fn load_family(&self, key: &str) -> Result<Vec<Document>, GroupError> {
        self.names(key)
            .iter()
            .map(|name| load_document(&self.root, name).map_err(GroupError::from))
            .collect()
    }

    /// Every family in key order, each loaded when reached
    pub fn families(&self) -> impl Iterator<Item = Result<(&str, Vec<Document>), GroupError>> + '_ {
        self.keys()
            .map(move |key| self.load_family(key).map(|documents| (key, documents)))
    }
}
