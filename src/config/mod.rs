//! Configuration layering
//!
//! Implements the 3-layer configuration merge:
//! 1. Built-in defaults
//! 2. Group config (`.carver.yaml` / `.yml` / `.json` / `.toml` in the config dir)
//! 3. CLI flags

mod defaults;
mod effective;
mod file;

pub use defaults::{BuiltinDefaults, DEFAULT_NORMALIZED_DIR};
pub use effective::{
    CliOverrides, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, GroupConfig,
};
pub use file::{find_config_file, load_config_file, CONFIG_FILE_NAMES};
