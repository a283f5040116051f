//! Content transforms applied to source files.
//!
//! A task pipes every file it reads through an ordered [`Chain`] of
//! [`Transform`]s. Each transform rewrites the file's contents and may rename
//! its output path or drop the file entirely (SASS partials, for example).
//!
//! # Example
//!
//! ```ignore
//! use assetflow::transforms::{Chain, SourceFile};
//! use assetflow::transforms::css::{Autoprefix, CssMinify};
//!
//! let chain = Chain::new(vec![Box::new(Autoprefix::new(None)), Box::new(CssMinify::new(None))]);
//! let file = SourceFile::new("src/css/site.css", "site.css", b"a { color: red }".to_vec());
//! let out = chain.run(file)?;
//! ```

pub mod copy;
pub mod css;
pub mod include;
pub mod markup;
pub mod sass;
pub mod script;
pub mod transpile;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build::{BuildContext, TaskKind};

/// Error raised by a transform stage.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Stylesheet parse, minify or print failure
    #[error("CSS error: {0}")]
    Css(String),
    /// SASS compilation failure
    #[error("SASS error: {0}")]
    Sass(String),
    /// JavaScript parse or minify failure
    #[error("JavaScript error: {0}")]
    Script(String),
    /// `@@include` resolution failure
    #[error("include error: {0}")]
    Include(String),
    /// Text transform received non UTF-8 input
    #[error("{0} is not valid UTF-8")]
    Utf8(PathBuf),
    /// Browserslist query could not be resolved
    #[error("invalid browser targets: {0}")]
    Targets(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl<T: std::fmt::Display> From<lightningcss::error::Error<T>> for TransformError {
    fn from(e: lightningcss::error::Error<T>) -> Self {
        TransformError::Css(e.to_string())
    }
}

/// A file flowing through a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Where the file was read from
    pub path: PathBuf,
    /// Output path relative to the task's destination directory
    pub relative: PathBuf,
    /// Current contents
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self { path: path.into(), relative: relative.into(), contents }
    }

    /// Borrow the contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents).map_err(|_| TransformError::Utf8(self.path.clone()))
    }

    /// Replace the contents with new text.
    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    /// Change the extension of the output path.
    pub fn set_extension(&mut self, ext: &str) {
        self.relative.set_extension(ext);
    }

    /// File name of the source, used in error messages and parser options.
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

/// A single content-rewriting stage.
pub trait Transform: Send + Sync {
    /// Short stage name for logs.
    fn name(&self) -> &'static str;

    /// Rewrite a file. `Ok(None)` drops the file from the output.
    fn apply(&self, file: SourceFile) -> Result<Option<SourceFile>, TransformError>;
}

/// An ordered sequence of transforms.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Box<dyn Transform>>,
}

impl Chain {
    pub fn new(stages: Vec<Box<dyn Transform>>) -> Self {
        Self { stages }
    }

    /// Names of the stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run a file through every stage, stopping early if a stage drops it.
    pub fn run(&self, file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        let mut current = file;
        for stage in &self.stages {
            log::trace!("{}: {}", stage.name(), current.path.display());
            match stage.apply(current)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

/// Build the transform chain for a task kind from the project configuration.
pub fn chain_for(kind: TaskKind, ctx: &BuildContext) -> Result<Chain, TransformError> {
    let config = ctx.config();
    let mut stages: Vec<Box<dyn Transform>> = Vec::new();

    match kind {
        TaskKind::Style => {
            let browsers = css::resolve_targets(&config.css.targets)?;
            stages.push(Box::new(css::Autoprefix::new(browsers)));
            stages.push(Box::new(css::CssMinify::new(browsers)));
        }
        TaskKind::Sass => {
            let browsers = css::resolve_targets(&config.css.targets)?;
            let load_paths = config.sass.load_paths.iter().map(|p| ctx.resolve_path(p)).collect();
            stages.push(Box::new(sass::SassCompile::new(load_paths)));
            stages.push(Box::new(css::Autoprefix::new(browsers)));
            stages.push(Box::new(css::CssMinify::new(browsers)));
        }
        TaskKind::Script => {
            if config.script.transpile {
                stages.push(Box::new(transpile::Transpile::new(config.script.target.clone())));
            }
            stages.push(Box::new(script::ScriptMinify));
        }
        TaskKind::Markup => {
            let markup = &config.markup;
            if markup.includes {
                stages.push(Box::new(include::Include::new(ctx.project_root())));
            }
            if markup.remove_empty_attributes {
                stages.push(Box::new(markup::EmptyAttributes::new()));
            }
            if markup.minify {
                stages.push(Box::new(markup::HtmlMinify::from_config(markup)));
            }
        }
        TaskKind::Images | TaskKind::Vendor => stages.push(Box::new(copy::Copy)),
    }

    Ok(Chain::new(stages))
}

/// Relative path with forward slashes, for display.
pub fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
