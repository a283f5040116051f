//! JavaScript minification with minify-js.
//!
//! Runs after the transpile stage. The parser also accepts ES2015+ input, so
//! the stage still works when transpiling is switched off.

use minify_js::{minify, Session, TopLevelMode};

use super::{SourceFile, Transform, TransformError};

/// Minify a classic (non-module) script. Top-level names are left intact
/// because other scripts on the page may reference them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptMinify;

impl Transform for ScriptMinify {
    fn name(&self) -> &'static str {
        "js-minify"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        let source = file.text()?.as_bytes();
        let mut output = Vec::with_capacity(source.len());
        // Syntax errors borrow the session, so they are rendered before it drops.
        let session = Session::new();
        minify(&session, TopLevelMode::Global, source, &mut output)
            .map_err(|e| TransformError::Script(format!("{}: {:?}", file.file_name(), e)))?;

        file.contents = output;
        Ok(Some(file))
    }
}
