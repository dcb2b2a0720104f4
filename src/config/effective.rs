//! Effective configuration with provenance
//!
//! The effective configuration is the layered merge of built-in defaults, the
//! group config file and CLI flags, plus a record of which layers
//! contributed.

use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use carver_core::{merge_layers, Tree};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults::BuiltinDefaults;
use super::file::{find_config_file, load_config_file, CONFIG_FILE_NAMES};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no group config ({}) found in {}", CONFIG_FILE_NAMES.join(", "), .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// The typed, merged group configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupConfig {
    /// Environment directories, relative to the group root
    #[serde(default)]
    pub dirs: Vec<String>,

    /// Normalized output directory
    pub normalized_dir: PathBuf,

    /// Reserved key carrying merge directives
    pub control_key: String,
}

/// Values set on the command line (layer 3)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub normalized_dir: Option<PathBuf>,
    pub control_key: Option<String>,
}

impl CliOverrides {
    fn is_empty(&self) -> bool {
        self.normalized_dir.is_none() && self.control_key.is_none()
    }

    fn to_tree(&self) -> Tree {
        let mut tree = Tree::new();
        if let Some(dir) = &self.normalized_dir {
            tree.insert(
                "normalized_dir".to_string(),
                Value::String(dir.to_string_lossy().into_owned()),
            );
        }
        if let Some(key) = &self.control_key {
            tree.insert("control_key".to_string(), Value::String(key.clone()));
        }
        tree
    }
}

/// Effective configuration for one config directory
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// Directory the group config was found in
    pub config_dir: PathBuf,

    /// The merged configuration
    pub config: GroupConfig,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,

    normalized_dir: PathBuf,
}

impl EffectiveConfig {
    /// Build the effective config for `config_dir`.
    ///
    /// The group config file is required: it is the only source of `dirs`.
    pub fn build(config_dir: &Path, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let path = find_config_file(config_dir)
            .ok_or_else(|| ConfigError::NotFound(config_dir.to_path_buf()))?;
        let file = load_config_file(&path)?;
        Self::from_layers(config_dir, Some((path, file)), cli)
    }

    /// Build from an already-loaded file layer
    pub fn from_layers(
        config_dir: &Path,
        file: Option<(PathBuf, Tree)>,
        cli: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_tree());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
        });

        if let Some((path, tree)) = file {
            layers.push(tree);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().into_owned()),
            });
        }

        if !cli.is_empty() {
            layers.push(cli.to_tree());
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        let merged = merge_layers(&layers);
        let mut config: GroupConfig = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.dirs = Self::validate_dirs(&config.dirs)?;
        if config.control_key.is_empty() {
            return Err(ConfigError::Invalid("control_key must not be empty".to_string()));
        }

        // A CLI path is taken as given; anything else is relative to the config dir
        let normalized_dir = match &cli.normalized_dir {
            Some(dir) => dir.clone(),
            None => config_dir.join(&config.normalized_dir),
        };

        tracing::debug!(
            config_dir = %config_dir.display(),
            dirs = ?config.dirs,
            normalized_dir = %normalized_dir.display(),
            layers = sources.len(),
            "built effective config"
        );

        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            config,
            sources,
            normalized_dir,
        })
    }

    /// Clean and check environment directory names
    fn validate_dirs(dirs: &[String]) -> Result<Vec<String>, ConfigError> {
        if dirs.is_empty() {
            return Err(ConfigError::Invalid(
                "dirs must list at least one environment directory".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let clean = dir.trim_start_matches("./").trim_end_matches('/');
            let path = Path::new(clean);
            let escapes = path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if clean.is_empty() || escapes {
                return Err(ConfigError::Invalid(format!(
                    "dir '{}' must be a relative path below the group root",
                    dir
                )));
            }
            if !seen.insert(clean.to_string()) {
                return Err(ConfigError::Invalid(format!("duplicate dir '{}'", clean)));
            }
            cleaned.push(clean.to_string());
        }
        Ok(cleaned)
    }

    pub fn dirs(&self) -> &[String] {
        &self.config.dirs
    }

    pub fn control_key(&self) -> &str {
        &self.config.control_key
    }

    /// Resolved normalized directory
    pub fn normalized_dir(&self) -> &Path {
        &self.normalized_dir
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({
            "config": self.config,
            "sources": self.sources,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn tree(value: Value) -> Tree {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    fn file_layer(value: Value) -> Option<(PathBuf, Tree)> {
        Some((PathBuf::from("/cfg/.carver.yaml"), tree(value)))
    }

    #[test]
    fn test_defaults_apply() {
        let config = EffectiveConfig::from_layers(
            Path::new("/cfg"),
            file_layer(json!({"dirs": ["envA", "envB"]})),
            &CliOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.dirs(), ["envA", "envB"]);
        assert_eq!(config.control_key(), "__");
        assert_eq!(config.normalized_dir(), Path::new("/cfg/.carver"));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
        assert_eq!(config.sources[1].origin, ConfigOrigin::File);
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = CliOverrides {
            normalized_dir: Some(PathBuf::from("out")),
            control_key: Some("$".to_string()),
        };
        let config = EffectiveConfig::from_layers(
            Path::new("/cfg"),
            file_layer(json!({"dirs": ["envA"], "normalized_dir": "norm", "control_key": "%"})),
            &cli,
        )
        .unwrap();

        assert_eq!(config.normalized_dir(), Path::new("out"));
        assert_eq!(config.control_key(), "$");
        assert_eq!(config.sources.last().unwrap().origin, ConfigOrigin::Cli);
    }

    #[test]
    fn test_file_normalized_dir_is_relative_to_config_dir() {
        let config = EffectiveConfig::from_layers(
            Path::new("/cfg"),
            file_layer(json!({"dirs": ["envA"], "normalized_dir": "norm"})),
            &CliOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.normalized_dir(), Path::new("/cfg/norm"));
    }

    #[test]
    fn test_dirs_are_cleaned() {
        let config = EffectiveConfig::from_layers(
            Path::new("/cfg"),
            file_layer(json!({"dirs": ["./envA/", "group/envB"]})),
            &CliOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.dirs(), ["envA", "group/envB"]);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            json!({}),
            json!({"dirs": []}),
            json!({"dirs": ["../escape"]}),
            json!({"dirs": ["/abs"]}),
            json!({"dirs": ["."]}),
            json!({"dirs": ["envA", "envA/"]}),
            json!({"dirs": ["envA"], "control_key": ""}),
        ];
        for case in cases {
            let result =
                EffectiveConfig::from_layers(Path::new("/cfg"), file_layer(case.clone()), &CliOverrides::default());
            assert!(
                matches!(result, Err(ConfigError::Invalid(_))),
                "expected invalid config for {}",
                case
            );
        }
    }

    #[test]
    fn test_wrong_types_are_parse_errors() {
        let result = EffectiveConfig::from_layers(
            Path::new("/cfg"),
            file_layer(json!({"dirs": "envA"})),
            &CliOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_build_requires_config_file() {
        let dir = TempDir::new().unwrap();
        let err = EffectiveConfig::build(dir.path(), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains(".carver.yaml"));
    }

    #[test]
    fn test_build_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".carver.yaml"), "dirs: [envA, envB]\n").unwrap();

        let config = EffectiveConfig::build(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(config.dirs(), ["envA", "envB"]);
        assert_eq!(config.normalized_dir(), dir.path().join(".carver"));

        let json = config.to_json().unwrap();
        assert!(json.contains("\"origin\": \"file\""));
    }

    #[test]
    fn test_to_json_records_cli_layer() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".carver.yaml"), "dirs: [envA]\ncontrol_key: \"%\"\n").unwrap();
        let cli = CliOverrides {
            control_key: Some("$".to_string()),
            ..CliOverrides::default()
        };

        let config = EffectiveConfig::build(dir.path(), &cli).unwrap();
        let json: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();

        assert_eq!(json["config"]["control_key"], "$");
        let origins: Vec<&str> = json["sources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["origin"].as_str().unwrap())
            .collect();
        assert_eq!(origins, ["builtin", "file", "cli"]);
    }
}
