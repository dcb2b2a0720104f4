//! Group config file discovery and parsing (layer 2)

use std::fs;
use std::path::{Path, PathBuf};

use carver_core::Tree;
use serde_json::Value;

use super::ConfigError;
use crate::document::parse_tree;

/// Config file names, in lookup order.
pub const CONFIG_FILE_NAMES: &[&str] = &[".carver.yaml", ".carver.yml", ".carver.json", ".carver.toml"];

/// First config file present in `dir`
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load a config file as a document.
///
/// `.toml` files are parsed as TOML; anything else is JSON or YAML,
/// detected from content.
pub fn load_config_file(path: &Path) -> Result<Tree, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    if is_toml {
        let table: toml::Table = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?;
        match toml_to_json(toml::Value::Table(table)) {
            Value::Object(map) => Ok(map),
            _ => Ok(Tree::new()),
        }
    } else {
        parse_tree(&contents, path).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
