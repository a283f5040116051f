//! `@@include('partial.html')` expansion for markup.
//!
//! Paths are resolved relative to the file containing the directive and
//! expanded recursively. Includes must stay inside the project root.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::{SourceFile, Transform, TransformError};

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@@include\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

/// Maximum nesting of includes.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Expands include directives.
#[derive(Debug, Clone)]
pub struct Include {
    root: PathBuf,
}

impl Include {
    pub fn new(root: &Path) -> Self {
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }

    /// Expand all directives in `text`, which was read from `origin`.
    pub fn expand(&self, text: &str, origin: &Path) -> Result<String, TransformError> {
        let mut stack = Vec::new();
        if let Ok(canonical) = fs::canonicalize(origin) {
            stack.push(canonical);
        }
        self.expand_nested(text, origin, &mut stack)
    }

    fn expand_nested(
        &self,
        text: &str,
        origin: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, TransformError> {
        if !INCLUDE_RE.is_match(text) {
            return Ok(text.to_string());
        }
        if stack.len() > MAX_INCLUDE_DEPTH {
            return Err(TransformError::Include(format!(
                "includes nested deeper than {} levels in {}",
                MAX_INCLUDE_DEPTH,
                origin.display()
            )));
        }

        let base = origin.parent().unwrap_or_else(|| Path::new(""));
        let mut output = String::with_capacity(text.len());
        let mut last = 0;

        for caps in INCLUDE_RE.captures_iter(text) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            output.push_str(&text[last..whole.start()]);
            last = whole.end();

            let path = base.join(target.as_str());
            let canonical = fs::canonicalize(&path).map_err(|e| {
                TransformError::Include(format!(
                    "cannot read '{}' included from {}: {}",
                    target.as_str(),
                    origin.display(),
                    e
                ))
            })?;

            if !canonical.starts_with(&self.root) {
                return Err(TransformError::Include(format!(
                    "'{}' included from {} is outside the project",
                    target.as_str(),
                    origin.display()
                )));
            }
            if stack.contains(&canonical) {
                return Err(TransformError::Include(format!(
                    "include cycle: {} includes {} again",
                    origin.display(),
                    canonical.display()
                )));
            }

            let partial = fs::read_to_string(&canonical)?;
            stack.push(canonical);
            let expanded = self.expand_nested(&partial, &path, stack)?;
            stack.pop();
            output.push_str(&expanded);
        }

        output.push_str(&text[last..]);
        Ok(output)
    }
}

impl Transform for Include {
    fn name(&self) -> &'static str {
        "include"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        let expanded = self.expand(file.text()?, &file.path)?;
        file.set_text(expanded);
        Ok(Some(file))
    }
}
