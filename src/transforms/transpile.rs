//! JavaScript down-leveling.
//!
//! Rewrites arrow functions, template literals, classes, block-scoped
//! bindings and the rest of the post-ES5 syntax into the configured target
//! so the minifier only ever sees code older browsers can run.

use super::{SourceFile, Transform, TransformError};
use swc_core::base::config::Options;
use swc_core::base::{try_with_handler, Compiler, HandlerOpts};
use swc_core::common::errors::ColorConfig;
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, Globals, SourceMap, GLOBALS};

/// Lower modern syntax to an older ECMAScript version.
#[derive(Debug)]
pub struct Transpile {
    target: String,
}

impl Transpile {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    fn options(&self) -> Result<Options, TransformError> {
        // Scripts are classic browser scripts, never modules, and no .swcrc is consulted.
        let options = serde_json::json!({
            "swcrc": false,
            "isModule": false,
            "jsc": {
                "target": self.target,
                "parser": { "syntax": "ecmascript" },
            },
        });
        serde_json::from_value(options)
            .map_err(|e| TransformError::Script(format!("invalid transpile target '{}': {}", self.target, e)))
    }
}

impl Transform for Transpile {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn apply(&self, mut file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        let options = self.options()?;
        let name = file.file_name();
        let source = file.text()?.to_string();

        let cm: Lrc<SourceMap> = Lrc::default();
        let fm = cm.new_source_file(Lrc::new(FileName::Custom(name.clone())), source);
        let compiler = Compiler::new(cm.clone());
        let handler_opts = HandlerOpts { color: ColorConfig::Never, skip_filename: false };

        let output = GLOBALS.set(&Globals::new(), || {
            try_with_handler(cm, handler_opts, |handler| compiler.process_js_file(fm, handler, &options))
        })
        .map_err(|e| TransformError::Script(format!("{}: {}", name, e)))?;

        file.set_text(output.code);
        Ok(Some(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js_file(source: &str) -> SourceFile {
        SourceFile::new("src/js/app.js", "app.js", source.as_bytes().to_vec())
    }

    fn lower(source: &str) -> String {
        let out = Transpile::new("es5").apply(js_file(source)).unwrap().unwrap();
        String::from_utf8(out.contents).unwrap()
    }

    #[test]
    fn test_arrow_functions_are_lowered() {
        let js = lower("var double = (x) => x * 2;\nvar nums = [1, 2].map(n => double(n));\n");
        assert!(!js.contains("=>"), "got: {}", js);
        assert!(js.contains("function"), "got: {}", js);
    }

    #[test]
    fn test_template_literals_are_lowered() {
        let js = lower("var name = 'world';\nvar greeting = `hello ${name}!`;\n");
        assert!(!js.contains('`'), "got: {}", js);
        assert!(js.contains("hello "), "got: {}", js);
    }

    #[test]
    fn test_classes_and_block_bindings_are_lowered() {
        let source = r#"
class Counter {
    constructor(start) { this.value = start; }
    tick() { return ++this.value; }
}
const counter = new Counter(1);
let total = counter.tick();
"#;
        let js = lower(source);
        assert!(!js.contains("class Counter"), "got: {}", js);
        assert!(!js.contains("const "), "got: {}", js);
        assert!(!js.contains("let "), "got: {}", js);
        assert!(js.contains("Counter"), "got: {}", js);
        assert!(js.contains("prototype") || js.contains("_create_class"), "got: {}", js);
    }

    #[test]
    fn test_es5_source_keeps_its_names() {
        let js = lower("function add(a, b) { return a + b; }\nvar total = add(1, 2);\n");
        assert!(js.contains("function add"), "got: {}", js);
        assert!(js.contains("var total"), "got: {}", js);
    }

    #[test]
    fn test_esnext_target_keeps_modern_syntax() {
        let out = Transpile::new("esnext").apply(js_file("const f = () => 1;\n")).unwrap().unwrap();
        let js = String::from_utf8(out.contents).unwrap();
        assert!(js.contains("=>"), "got: {}", js);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        match Transpile::new("es5").apply(js_file("function ( { return")) {
            Err(TransformError::Script(message)) => assert!(message.starts_with("app.js"), "{}", message),
            other => panic!("expected script error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let result = Transpile::new("es1999").apply(js_file("var a = 1;"));
        assert!(matches!(result, Err(TransformError::Script(_))));
    }
}
