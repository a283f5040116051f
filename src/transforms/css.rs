//! Stylesheet transforms backed by lightningcss.
//!
//! - [`Autoprefix`] adds the vendor prefixes the configured browsers need and
//!   prints readable CSS.
//! - [`CssMinify`] prints the smallest equivalent stylesheet.
//!
//! Both parse with error recovery disabled, so a malformed stylesheet fails
//! its task instead of silently dropping rules.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use super::{SourceFile, Transform, TransformError};

/// Resolve browserslist queries. An empty list means "no prefixing".
pub fn resolve_targets(queries: &[String]) -> Result<Option<Browsers>, TransformError> {
    if queries.is_empty() {
        return Ok(None);
    }
    Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| TransformError::Targets(e.to_string()))
}

/// Parse, lower for the targets, and print a stylesheet.
fn process(file: &SourceFile, browsers: Option<Browsers>, minify: bool) -> Result<String, TransformError> {
    let source = file.text()?;
    let options = ParserOptions { filename: file.file_name(), ..ParserOptions::default() };
    let mut sheet = StyleSheet::parse(source, options)?;

    sheet.minify(MinifyOptions {
        targets: Targets { browsers, ..Targets::default() },
        ..MinifyOptions::default()
    })?;

    let printed = sheet.to_css(PrinterOptions {
        minify,
        targets: Targets { browsers, ..Targets::default() },
        ..PrinterOptions::default()
    })?;
    Ok(printed.code)
}

/// Vendor prefixing for the configured browser targets.
#[derive(Debug, Clone, Copy)]
pub struct Autoprefix {
    browsers: Option<Browsers>,
}

impl Autoprefix {
    pub fn new(browsers: Option<Browsers>) -> Self {
        Self { browsers }
    }
}

impl Transform for Autoprefix {
    fn name(&self) -> &'static str {
        "autoprefix"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        let css = process(&file, self.browsers, false)?;
        file.set_text(css);
        Ok(Some(file))
    }
}

/// CSS minification. Prefixes required by the targets are preserved.
#[derive(Debug, Clone, Copy)]
pub struct CssMinify {
    browsers: Option<Browsers>,
}

impl CssMinify {
    pub fn new(browsers: Option<Browsers>) -> Self {
        Self { browsers }
    }
}

impl Transform for CssMinify {
    fn name(&self) -> &'static str {
        "css-minify"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        let css = process(&file, self.browsers, true)?;
        file.set_text(css);
        Ok(Some(file))
    }
}
