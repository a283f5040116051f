//! Configuration loading and discovery for `assetflow.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::FlowConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "assetflow.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse assetflow.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override dev server port
    pub port: Option<u16>,
    /// Override dev server host
    pub host: Option<String>,
}

/// Find assetflow.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find assetflow.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from an assetflow.toml file.
///
/// If a path is provided, loads from that file. Otherwise uses `find_config()`,
/// falling back to the built-in pipeline when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<FlowConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<FlowConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: FlowConfig = toml::from_str(&contents)?;
    check(&config)?;
    Ok(config)
}

/// Run validation, converting field errors into a `ConfigError`.
pub fn check(config: &FlowConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// The built-in pipeline, named after the current directory.
pub fn default_config() -> FlowConfig {
    let mut config = FlowConfig::default();
    if let Some(name) =
        env::current_dir().ok().and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    {
        config.project.name = name;
    }
    config
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut FlowConfig, overrides: &CliOverrides) {
    if let Some(ref out) = overrides.out {
        config.project.out = out.clone();
    }

    if let Some(port) = overrides.port {
        config.server.port = port;
    }

    if let Some(ref host) = overrides.host {
        config.server.host = host.clone();
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}
