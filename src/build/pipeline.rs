//! Asset task execution.
//!
//! A task discovers its sources, pipes each one through its transform chain
//! and writes the result under its destination directory. Files within a task
//! are independent and processed in parallel.

use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

use crate::build::discovery::{discover_all, DiscoveredFile, DiscoveryError};
use crate::build::{AssetTask, BuildContext, FileError, TaskResult};
use crate::server::ServerError;
use crate::transforms::{chain_for, display_relative, Chain, SourceFile, TransformError};
use crate::watch::WatchError;

/// Error that aborts a run, as opposed to a task that fails on its inputs.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    /// Transform setup error
    #[error("{0}")]
    Transform(#[from] TransformError),
    /// Dev server error
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
    /// Watcher error
    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Generic build error
    #[error("Build error: {0}")]
    Build(String),
}

/// Run one asset task to completion.
///
/// Never panics on bad input: discovery, transform and write failures are
/// reported in the returned [`TaskResult`].
pub fn run_task(ctx: &BuildContext, task: &AssetTask) -> TaskResult {
    let start = Instant::now();
    let id = task.id();

    let files = match discover_all(ctx.project_root(), &task.sources) {
        Ok(files) => files,
        Err(e) => return TaskResult::failed(id, e.to_string(), start.elapsed()),
    };

    if files.is_empty() {
        log::info!("{}: no source files matched", id);
        return TaskResult::skipped(id);
    }

    let chain = match chain_for(task.kind, ctx) {
        Ok(chain) => chain,
        Err(e) => return TaskResult::failed(id, e.to_string(), start.elapsed()),
    };

    if let Err(e) = fs::create_dir_all(&task.dest) {
        return TaskResult::failed(
            id,
            format!("Failed to create output directory {}: {}", task.dest.display(), e),
            start.elapsed(),
        );
    }

    log::debug!("{}: {} files through {:?}", id, files.len(), chain);

    let outcomes: Vec<Result<Option<PathBuf>, FileError>> =
        files.par_iter().map(|file| process_file(&chain, task, file)).collect();

    let mut outputs = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(Some(path)) => outputs.push(path),
            Ok(None) => {}
            Err(e) => {
                log::error!("{}: {}", id, e);
                errors.push(e);
            }
        }
    }
    outputs.sort();
    errors.sort_by(|a, b| a.path.cmp(&b.path));

    let duration = start.elapsed();
    if errors.is_empty() {
        log::info!("{}: wrote {} files in {:?}", id, outputs.len(), duration);
    }
    TaskResult::from_files(id, outputs, errors, duration)
}

/// Read, transform and write a single file.
///
/// Returns the written path, or `None` when the chain dropped the file.
fn process_file(
    chain: &Chain,
    task: &AssetTask,
    file: &DiscoveredFile,
) -> Result<Option<PathBuf>, FileError> {
    let fail = |message: String| FileError { path: file.path.clone(), message };

    let contents = fs::read(&file.path).map_err(|e| fail(e.to_string()))?;
    let source = SourceFile::new(file.path.clone(), file.relative.clone(), contents);

    let Some(output) = chain.run(source).map_err(|e| fail(e.to_string()))? else {
        log::debug!("{}: skipped {}", task.id(), display_relative(&file.relative));
        return Ok(None);
    };

    let target = task.dest.join(&output.relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
    }
    fs::write(&target, &output.contents).map_err(|e| fail(e.to_string()))?;

    log::debug!(
        "{}: {} -> {}",
        task.id(),
        display_relative(&file.relative),
        display_relative(&output.relative)
    );
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildStatus, TaskKind};
    use crate::config::default_config;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, name: &str, content: &[u8]) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run(root: &Path, kind: TaskKind) -> TaskResult {
        let ctx = BuildContext::new(default_config(), root.to_path_buf());
        let task = AssetTask::from_context(&ctx, kind).unwrap();
        run_task(&ctx, &task)
    }

    #[test]
    fn test_style_task_writes_minified_css() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/css/site.css", b"body {\n  margin: 0px;\n}\n");

        let result = run(temp.path(), TaskKind::Style);
        assert!(result.is_success(), "{}", result.status);
        assert_eq!(result.outputs, vec![temp.path().join("dist/css/site.css")]);

        let css = fs::read_to_string(temp.path().join("dist/css/site.css")).unwrap();
        assert_eq!(css, "body{margin:0}");
    }

    #[test]
    fn test_sass_task_renames_and_skips_partials() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/css/_vars.scss", b"$gap: 4px;");
        write(temp.path(), "src/css/main.scss", b"@import 'vars';\n.a { .b { margin: $gap; } }\n");

        let result = run(temp.path(), TaskKind::Sass);
        assert!(result.is_success(), "{}", result.status);
        assert_eq!(result.outputs, vec![temp.path().join("dist/sass/main.css")]);
        assert!(!temp.path().join("dist/sass/_vars.css").exists());
    }

    #[test]
    fn test_images_task_preserves_tree() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/images/logo.png", &[0x89, b'P', b'N', b'G']);
        write(temp.path(), "src/images/icons/x.svg", b"<svg/>");

        let result = run(temp.path(), TaskKind::Images);
        assert!(result.is_success());
        assert_eq!(result.outputs.len(), 2);
        assert_eq!(
            fs::read(temp.path().join("dist/images/logo.png")).unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
        assert!(temp.path().join("dist/images/icons/x.svg").is_file());
    }

    #[test]
    fn test_no_sources_is_skipped() {
        let temp = TempDir::new().unwrap();
        let result = run(temp.path(), TaskKind::Script);
        assert_eq!(result.status, BuildStatus::Skipped);
        assert!(!temp.path().join("dist/js").exists());
    }

    #[test]
    fn test_bad_file_fails_task_but_good_files_are_written() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/js/good.js", b"var a = 1 + 2;");
        write(temp.path(), "src/js/bad.js", b"function ( {");

        let result = run(temp.path(), TaskKind::Script);
        assert!(!result.is_success());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].path.ends_with("bad.js"));
        assert!(temp.path().join("dist/js/good.js").is_file());
    }
}
