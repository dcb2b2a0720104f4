//! Reading and writing documents on disk
//!
//! Input format is detected from content: anything that parses as JSON is
//! JSON, everything else is read as YAML. Output format follows the file
//! extension: `.json` gets pretty JSON (two-space indent), anything else YAML.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use carver_core::{Document, Tree};
use serde_json::Value;

/// Serialization format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Output format for a destination path
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }

    /// Input format detected from content
    pub fn detect(contents: &str) -> Self {
        if serde_json::from_str::<serde::de::IgnoredAny>(contents).is_ok() {
            Format::Json
        } else {
            Format::Yaml
        }
    }
}

/// Errors for document I/O
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{path}: top level must be a mapping, found {found}")]
    NotAMapping { path: PathBuf, found: &'static str },
}

/// Parse document contents, auto-detecting JSON or YAML.
///
/// Empty content (or a YAML null) is an empty document.
pub fn parse_tree(contents: &str, path: &Path) -> Result<Tree, DocumentError> {
    if contents.trim().is_empty() {
        return Ok(Tree::new());
    }

    let value: Value = match Format::detect(contents) {
        Format::Json => serde_json::from_str(contents).map_err(|source| DocumentError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Format::Yaml => serde_yaml::from_str(contents).map_err(|source| DocumentError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Tree::new()),
        other => Err(DocumentError::NotAMapping {
            path: path.to_path_buf(),
            found: kind(&other),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Read and parse a single file
pub fn load_path(path: &Path) -> Result<Tree, DocumentError> {
    let contents = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tree(&contents, path)
}

/// Load the document `name` (a `/`-separated path) under `root`
pub fn load_document(root: &Path, name: &str) -> Result<Document, DocumentError> {
    let tree = load_path(&root.join(name))?;
    tracing::debug!(root = %root.display(), name, keys = tree.len(), "loaded document");
    Ok(Document::new(name, root, tree))
}

/// Serialize a document in the given format, ending with a newline
pub fn render(tree: &Tree, format: Format, path: &Path) -> Result<String, DocumentError> {
    let mut out = match format {
        Format::Json => serde_json::to_string_pretty(tree).map_err(|source| DocumentError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Format::Yaml => serde_yaml::to_string(tree).map_err(|source| DocumentError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Write a document to an explicit path, creating parent directories
pub fn write_path(path: &Path, tree: &Tree) -> Result<(), DocumentError> {
    let contents = render(tree, Format::for_path(path), path)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| DocumentError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, contents).map_err(|source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the document `name` under `root`, returning the written path
pub fn write_document(root: &Path, name: &str, tree: &Tree) -> Result<PathBuf, DocumentError> {
    let path = root.join(name);
    write_path(&path, tree)?;
    tracing::debug!(path = %path.display(), keys = tree.len(), "wrote document");
    Ok(path)
}
