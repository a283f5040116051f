//! HTML cleanup and minification.

use regex::Regex;
use std::sync::LazyLock;

use super::{SourceFile, Transform, TransformError};
use crate::config::MarkupConfig;

static EMPTY_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+(?:class|id|style|title|lang|dir|on[a-z]+)\s*=\s*(?:""|'')"#).unwrap()
});

/// Strips attributes whose value is empty and carries no meaning,
/// e.g. `class=""` or `onclick=''`. Boolean attributes are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyAttributes;

impl EmptyAttributes {
    pub fn new() -> Self {
        Self
    }

    pub fn strip(&self, html: &str) -> String {
        EMPTY_ATTR_RE.replace_all(html, "").into_owned()
    }
}

impl Transform for EmptyAttributes {
    fn name(&self) -> &'static str {
        "empty-attrs"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        let stripped = self.strip(file.text()?);
        file.set_text(stripped);
        Ok(Some(file))
    }
}

/// Whitespace collapsing and minification of inline `<style>`/`<script>`.
pub struct HtmlMinify {
    cfg: minify_html::Cfg,
}

impl HtmlMinify {
    pub fn from_config(config: &MarkupConfig) -> Self {
        let mut cfg = minify_html::Cfg::new();
        cfg.minify_css = config.minify_css;
        cfg.minify_js = config.minify_js;
        cfg.keep_comments = config.keep_comments;
        cfg.do_not_minify_doctype = true;
        cfg.keep_html_and_head_opening_tags = true;
        Self { cfg }
    }
}

impl Default for HtmlMinify {
    fn default() -> Self {
        Self::from_config(&MarkupConfig::default())
    }
}

impl Transform for HtmlMinify {
    fn name(&self) -> &'static str {
        "html-minify"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        file.contents = minify_html::minify(&file.contents, &self.cfg);
        Ok(Some(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_file(html: &str) -> SourceFile {
        SourceFile::new("index.html", "index.html", html.as_bytes().to_vec())
    }

    fn text(file: SourceFile) -> String {
        String::from_utf8(file.contents).unwrap()
    }

    #[test]
    fn test_strip_empty_attributes() {
        let html = r#"<div class="" id='' data-x=""><a href="/" onclick="">go</a></div>"#;
        assert_eq!(
            EmptyAttributes::new().strip(html),
            r#"<div data-x=""><a href="/">go</a></div>"#
        );
    }

    #[test]
    fn test_strip_keeps_non_empty_and_boolean() {
        let html = r#"<input class="field" disabled value="">"#;
        assert_eq!(EmptyAttributes::new().strip(html), html);
    }

    #[test]
    fn test_strip_is_case_insensitive() {
        let html = r#"<p CLASS = "">x</p>"#;
        assert_eq!(EmptyAttributes::new().strip(html), "<p>x</p>");
    }

    #[test]
    fn test_minify_collapses_whitespace() {
        let html = "<!DOCTYPE html>\n<html>\n  <head>\n    <title>Site</title>\n  </head>\n  <body>\n    <p>  Hello   world  </p>\n  </body>\n</html>\n";
        let out = text(HtmlMinify::default().apply(html_file(html)).unwrap().unwrap());

        assert!(out.len() < html.len());
        assert!(out.contains("Hello world"), "got: {}", out);
        assert!(!out.contains("\n    "));
    }

    #[test]
    fn test_minify_drops_comments_unless_kept() {
        let html = "<div><!-- note --><span>a</span></div>";
        let out = text(HtmlMinify::default().apply(html_file(html)).unwrap().unwrap());
        assert!(!out.contains("note"));

        let mut config = MarkupConfig::default();
        config.keep_comments = true;
        let out = text(HtmlMinify::from_config(&config).apply(html_file(html)).unwrap().unwrap());
        assert!(out.contains("note"));
    }

    #[test]
    fn test_minify_inline_style() {
        let html = "<style>\n  body {\n    margin: 0px;\n  }\n</style><p>x</p>";
        let out = text(HtmlMinify::default().apply(html_file(html)).unwrap().unwrap());
        assert!(out.contains("body{margin:0"), "got: {}", out);
    }
}
