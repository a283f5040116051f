//! End-to-end tests for the asset pipeline
//!
//! Each test lays out a small front-end project in a temp directory and runs
//! real tasks against it.

use assetflow::build::{clean, BuildContext, Runner, Step, TaskKind};
use assetflow::config::{default_config, FlowConfig};
use assetflow::watch::{plan_rebuild, WatchOptions, WatchSession};
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use minify_js::{minify, Session, TopLevelMode};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a test build context rooted at the temp directory
fn create_test_context(temp: &TempDir, config: FlowConfig) -> BuildContext {
    BuildContext::new(config, temp.path().to_path_buf())
}

/// Create a file (and its parent directories) under the project root
fn create_test_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// A project with sources for every asset task
fn create_sample_project(root: &Path) {
    create_test_file(
        root,
        "src/css/site.css",
        b".card {\n  display: flex;\n  user-select: none;\n}\n\n/* unused */\n.empty {}\n",
    );
    create_test_file(root, "src/css/_colors.scss", b"$brand: #336699;\n");
    create_test_file(
        root,
        "src/css/theme.scss",
        b"@import 'colors';\n.nav {\n  a { color: $brand; }\n}\n",
    );
    create_test_file(
        root,
        "src/js/app.js",
        b"const greet = (name) => {\n  const message = `hello ${name}`;\n  return message;\n};\nconsole.log(greet('world'));\n",
    );
    create_test_file(
        root,
        "index.html",
        b"<!DOCTYPE html>\n<html>\n<head>\n  <title>Sample</title>\n</head>\n<body>\n  @@include('src/partials/header.html')\n  <main class=\"\">\n    <p>Body text</p>\n  </main>\n</body>\n</html>\n",
    );
    create_test_file(root, "src/partials/header.html", b"<header id=\"\">Sample header</header>\n");
    create_test_file(root, "src/images/logo.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3]);
    create_test_file(root, "src/images/icons/menu.svg", b"<svg></svg>");
    create_test_file(root, "src/lib/jquery/jquery.min.js", b"/*! vendor */window.$=1;");
}

/// SHA-256 of every file under `dir`, keyed by relative path
fn hash_tree(dir: &Path) -> BTreeMap<String, String> {
    let mut hashes = BTreeMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let digest = Sha256::digest(fs::read(&path).unwrap());
                let relative = path.strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/");
                hashes.insert(relative, format!("{:x}", digest));
            }
        }
    }
    hashes
}

// ============================================================================
// Full Build
// ============================================================================

#[test]
fn test_full_build_writes_every_task_output() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());

    let runner = Runner::new(&ctx).unwrap();
    let result = runner.run(&Step::build()).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let dist = temp.path().join("dist");
    for relative in [
        "css/site.css",
        "sass/theme.css",
        "js/app.js",
        "index.html",
        "images/logo.png",
        "images/icons/menu.svg",
        "lib/jquery/jquery.min.js",
    ] {
        let path = dist.join(relative);
        assert!(path.is_file(), "missing {}", relative);
        assert!(fs::metadata(&path).unwrap().len() > 0, "empty {}", relative);
    }

    // Partials are imported, never emitted
    assert!(!dist.join("sass/_colors.css").exists());
}

#[test]
fn test_full_build_output_contents() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());

    let runner = Runner::new(&ctx).unwrap();
    assert!(runner.run(&Step::build()).unwrap().is_success());
    let dist = temp.path().join("dist");

    let css = fs::read_to_string(dist.join("css/site.css")).unwrap();
    assert!(!css.contains('\n'), "css not minified: {}", css);
    assert!(!css.contains("unused"));
    assert!(css.contains("display:flex"));

    let sass = fs::read_to_string(dist.join("sass/theme.css")).unwrap();
    assert!(sass.contains(".nav a"));
    assert!(sass.contains("#369"));
    assert!(!sass.contains("$brand"));

    let js = fs::read_to_string(dist.join("js/app.js")).unwrap();
    assert!(!js.contains("\n  "), "js not minified: {}", js);
    assert!(js.len() < 110, "js not minified: {}", js);
    assert!(js.contains("console.log"));
    assert!(!js.contains("=>"), "arrow not lowered: {}", js);
    assert!(!js.contains('`'), "template literal not lowered: {}", js);
    assert!(!js.contains("const "), "const not lowered: {}", js);

    let html = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(html.contains("Sample header"));
    assert!(!html.contains("@@include"));
    assert!(!html.contains("class=\"\""));
    assert!(!html.contains("id=\"\""));
    assert!(!html.contains("\n  "), "html not minified: {}", html);

    // Copies are byte-identical
    assert_eq!(
        fs::read(dist.join("images/logo.png")).unwrap(),
        fs::read(temp.path().join("src/images/logo.png")).unwrap()
    );
}

#[test]
fn test_minified_outputs_reparse() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());

    let runner = Runner::new(&ctx).unwrap();
    assert!(runner.run(&Step::build()).unwrap().is_success());
    let dist = temp.path().join("dist");

    for relative in ["css/site.css", "sass/theme.css"] {
        let css = fs::read_to_string(dist.join(relative)).unwrap();
        assert!(
            StyleSheet::parse(&css, ParserOptions::default()).is_ok(),
            "{} does not re-parse: {}",
            relative,
            css
        );
    }

    let js = fs::read(dist.join("js/app.js")).unwrap();
    let session = Session::new();
    let mut again = Vec::new();
    assert!(minify(&session, TopLevelMode::Global, &js, &mut again).is_ok());
}

#[test]
fn test_rebuild_after_clean_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());
    let runner = Runner::new(&ctx).unwrap();

    assert!(runner.run(&Step::build()).unwrap().is_success());
    let first = hash_tree(&temp.path().join("dist"));

    assert!(clean(&ctx).is_success());
    assert!(!temp.path().join("dist").exists());

    assert!(runner.run(&Step::build()).unwrap().is_success());
    let second = hash_tree(&temp.path().join("dist"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_build_reports_bad_source_and_keeps_going() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    create_test_file(temp.path(), "src/js/broken.js", b"function ( {");
    let ctx = create_test_context(&temp, default_config());

    let runner = Runner::new(&ctx).unwrap();
    let result = runner.run(&Step::build()).unwrap();

    assert!(!result.is_success());
    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].task_id, "script");
    assert!(result.all_errors().iter().any(|e| e.path.ends_with("broken.js")));

    // Sibling tasks in the parallel group still ran
    assert!(temp.path().join("dist/css/site.css").is_file());
    assert!(temp.path().join("dist/index.html").is_file());
}

#[test]
fn test_dotfiles_are_not_copied() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    create_test_file(temp.path(), "src/images/.DS_Store", b"finder");
    create_test_file(temp.path(), "src/images/icons/.gitkeep", b"");
    create_test_file(temp.path(), "src/lib/.eslintrc", b"{}");
    let ctx = create_test_context(&temp, default_config());

    let runner = Runner::new(&ctx).unwrap();
    assert!(runner.run(&Step::build()).unwrap().is_success());

    let outputs = hash_tree(&temp.path().join("dist"));
    assert!(outputs.contains_key("images/logo.png"));
    assert!(outputs.contains_key("images/icons/menu.svg"));
    assert!(outputs.keys().all(|p| !p.split('/').any(|part| part.starts_with('.'))), "{:?}", outputs.keys());
}

#[test]
fn test_disabled_task_is_skipped() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let mut config = default_config();
    config.tasks.images.enabled = Some(false);
    let ctx = create_test_context(&temp, config);

    let runner = Runner::new(&ctx).unwrap();
    let result = runner.run(&Step::build()).unwrap();

    assert!(result.is_success());
    assert_eq!(result.skipped_count(), 1);
    assert!(!temp.path().join("dist/images").exists());
}

#[test]
fn test_markup_without_minify_keeps_layout() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let mut config = default_config();
    config.markup.minify = false;
    let ctx = create_test_context(&temp, config);

    let runner = Runner::new(&ctx).unwrap();
    let result = runner.run(&Step::Asset(TaskKind::Markup)).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
    assert!(html.contains("<header>Sample header</header>"));
    assert!(html.contains("<main>"));
    assert!(html.contains("\n    <p>Body text</p>"));
}

// ============================================================================
// Watch Routing
// ============================================================================

#[test]
fn test_plan_rebuild_routes_by_source() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());
    let runner = Runner::new(&ctx).unwrap();
    let root = temp.path();

    let plan = |paths: &[&str]| {
        let changed: Vec<PathBuf> = paths.iter().map(|p| root.join(p)).collect();
        plan_rebuild(&ctx, runner.tasks(), &changed)
    };

    assert_eq!(plan(&["src/css/theme.scss"]), vec![TaskKind::Sass]);
    assert_eq!(plan(&["src/css/site.css"]), vec![TaskKind::Style]);
    assert_eq!(plan(&["src/partials/header.html"]), vec![TaskKind::Markup]);
    assert_eq!(
        plan(&["src/js/app.js", "src/images/logo.png"]),
        vec![TaskKind::Script, TaskKind::Images]
    );
    assert!(plan(&["README.md"]).is_empty());
    assert!(plan(&["dist/css/site.css"]).is_empty());
}

#[test]
fn test_watch_session_rebuilds_only_affected_task() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());
    let runner = Runner::new(&ctx).unwrap();
    assert!(runner.run(&Step::build()).unwrap().is_success());

    let style_output = temp.path().join("dist/css/site.css");
    let style_before = fs::read(&style_output).unwrap();

    let scss = create_test_file(
        temp.path(),
        "src/css/theme.scss",
        b"@import 'colors';\n.footer { color: $brand; }\n",
    );

    let reload = runner.reload().clone();
    let mut session = WatchSession::new(&ctx, WatchOptions { reload: Some(reload.clone()) }).unwrap();
    let result = session.handle_changes(&[scss]).expect("sass should rebuild");

    let ids: Vec<_> = result.tasks.iter().map(|t| t.task_id.as_str()).collect();
    assert_eq!(ids, vec!["sass"]);
    assert!(result.is_success());
    assert_eq!(reload.generation(), 1);

    let sass = fs::read_to_string(temp.path().join("dist/sass/theme.css")).unwrap();
    assert!(sass.contains(".footer"));
    assert_eq!(fs::read(&style_output).unwrap(), style_before);
}

#[test]
fn test_watch_session_recovers_after_fix() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());
    let mut session = WatchSession::new(&ctx, WatchOptions::default()).unwrap();

    let js = create_test_file(temp.path(), "src/js/app.js", b"let = ;");
    let broken = session.handle_changes(&[js.clone()]).unwrap();
    assert!(!broken.is_success());
    assert_eq!(session.tracker().error_count(), 1);
    assert!(session.last_fixed().is_empty());

    fs::write(&js, b"let ok = 1;").unwrap();
    let fixed = session.handle_changes(&[js.clone()]).unwrap();
    assert!(fixed.is_success());
    assert!(temp.path().join("dist/js/app.js").is_file());
    assert!(!session.tracker().has_errors());
    assert_eq!(session.last_fixed(), &[js.clone()]);

    // A second clean rebuild has nothing left to report as fixed
    session.handle_changes(&[js]).unwrap();
    assert!(session.last_fixed().is_empty());
}

#[test]
fn test_watch_session_ignores_unrelated_changes() {
    let temp = TempDir::new().unwrap();
    create_sample_project(temp.path());
    let ctx = create_test_context(&temp, default_config());
    let mut session = WatchSession::new(&ctx, WatchOptions::default()).unwrap();

    let notes = create_test_file(temp.path(), "notes.txt", b"todo");
    assert!(session.handle_changes(&[notes]).is_none());
}
