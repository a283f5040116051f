//! Build context containing configuration and paths for a run.

use crate::config::FlowConfig;
use std::path::{Path, PathBuf};

/// Build context shared by every task of a run.
///
/// The context provides the loaded configuration and resolves the
/// project-relative paths it contains.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: FlowConfig,
    /// Project root directory (where assetflow.toml is located)
    project_root: PathBuf,
    /// Whether to log per-file detail
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `config` - The loaded configuration
    /// - `project_root` - The project root directory
    pub fn new(config: FlowConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Whether a path lies inside the output directory.
    pub fn is_output_path(&self, path: &Path) -> bool {
        let out = self.out_dir();
        path.starts_with(&out)
            || std::fs::canonicalize(&out).map(|out| path.starts_with(out)).unwrap_or(false)
    }
}
