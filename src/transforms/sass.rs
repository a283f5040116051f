//! SCSS compilation with grass.

use std::path::PathBuf;

use super::{SourceFile, Transform, TransformError};

/// Compile SCSS to CSS and rename the output to `.css`.
///
/// Partials (`_name.scss`) are only meant to be imported, so they are dropped
/// from the output. Imports resolve against the file's own directory first,
/// then the configured load paths.
#[derive(Debug, Clone, Default)]
pub struct SassCompile {
    load_paths: Vec<PathBuf>,
}

impl SassCompile {
    pub fn new(load_paths: Vec<PathBuf>) -> Self {
        Self { load_paths }
    }
}

/// Whether a path names a SASS partial.
pub fn is_partial(file: &SourceFile) -> bool {
    file.path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('_'))
        .unwrap_or(false)
}

impl Transform for SassCompile {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        if is_partial(&file) {
            return Ok(None);
        }

        let mut options = grass::Options::default();
        if let Some(parent) = file.path.parent() {
            options = options.load_path(parent);
        }
        for path in &self.load_paths {
            options = options.load_path(path.as_path());
        }

        let source = file.text()?.to_string();
        let css = grass::from_string(source, &options)
            .map_err(|e| TransformError::Sass(format!("{}: {}", file.file_name(), e)))?;

        file.set_text(css);
        file.set_extension("css");
        Ok(Some(file))
    }
}
