//! Source file discovery for asset tasks.
//!
//! Each task names its inputs with glob patterns relative to the project
//! root. A file's output path is its path relative to the *glob base* of the
//! pattern that matched it: the leading components that contain no wildcard.
//!
//! Dotfiles are never matched by a wildcard. `.DS_Store` and `.gitkeep`
//! stay out of the output unless a pattern names them literally.

use glob::{glob_with, MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Error during source discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// IO error during file enumeration
    #[error("IO error during discovery: {0}")]
    Io(#[from] std::io::Error),
}

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the matching pattern's glob base
    pub relative: PathBuf,
}

/// Options shared by discovery and changed-path matching.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Rewrite a pattern into the form the glob matcher expects.
///
/// `.` components are dropped, and a trailing `**` becomes `**/*` because on
/// its own it only matches directories.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut parts: Vec<&str> = pattern.split('/').filter(|part| *part != ".").collect();
    if parts.last() == Some(&"**") {
        parts.push("*");
    }
    parts.join("/")
}

fn is_magic(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// The non-wildcard prefix of a glob pattern.
///
/// `src/images/**` → `src/images`, `index.html` → `` (the file's own
/// directory), `src/lib/**/*` → `src/lib`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let mut components = path.components().peekable();

    while let Some(component) = components.next() {
        let text = component.as_os_str().to_string_lossy();
        if is_magic(&text) {
            return base;
        }
        if matches!(component, Component::CurDir) {
            continue;
        }
        // The last literal component names the file itself.
        if components.peek().is_none() && matches!(component, Component::Normal(_)) {
            return base;
        }
        base.push(component);
    }
    base
}

/// Whether a pattern matches into subdirectories.
pub fn is_recursive(pattern: &str) -> bool {
    pattern.contains("**")
}

/// Discover files matching a single glob pattern.
///
/// # Arguments
/// - `root` - Directory patterns are resolved from
/// - `pattern` - Glob pattern to match
///
/// # Returns
/// Matching files sorted by path. Directories are skipped.
pub fn discover_files(root: &Path, pattern: &str) -> Result<Vec<DiscoveredFile>, DiscoveryError> {
    let normalized = normalize_pattern(pattern);
    let full_pattern = root.join(&normalized);
    let pattern_str = full_pattern.to_string_lossy();
    let base = root.join(glob_base(&normalized));

    let paths = glob_with(&pattern_str, MATCH_OPTIONS)
        .map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if !path.is_file() {
                    continue;
                }
                let relative = path
                    .strip_prefix(&base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.file_name().map(PathBuf::from).unwrap_or_default());
                files.push(DiscoveredFile { path, relative });
            }
            Err(e) => {
                log::warn!("error reading path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Discover files for a list of patterns.
///
/// Files matched by more than one pattern are kept once, with the relative
/// path from the first pattern that matched.
pub fn discover_all(root: &Path, patterns: &[String]) -> Result<Vec<DiscoveredFile>, DiscoveryError> {
    let mut seen = HashSet::new();
    let mut all_files = Vec::new();

    for pattern in patterns {
        for file in discover_files(root, pattern)? {
            if seen.insert(file.path.clone()) {
                all_files.push(file);
            }
        }
    }

    all_files.sort();
    Ok(all_files)
}

/// Compile patterns resolved against a root, for matching changed paths.
pub fn compile_patterns(root: &Path, patterns: &[String]) -> Result<Vec<Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|p| {
            let full = root.join(normalize_pattern(p));
            Pattern::new(&full.to_string_lossy())
                .map_err(|e| DiscoveryError::InvalidPattern(p.clone(), e))
        })
        .collect()
}
