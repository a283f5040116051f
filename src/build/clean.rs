//! The clean task: remove the output directory.

use std::fs;
use std::io;
use std::time::Instant;

use crate::build::{BuildContext, TaskResult};

pub const CLEAN_TASK: &str = "clean";

/// Delete the output directory tree.
///
/// Refuses to delete the project root or any directory containing it. A
/// missing output directory is not an error.
pub fn clean(ctx: &BuildContext) -> TaskResult {
    let start = Instant::now();
    let out = ctx.out_dir();

    if !out.exists() {
        log::debug!("clean: {} does not exist", out.display());
        return TaskResult::success(CLEAN_TASK, vec![], start.elapsed());
    }

    let canonical_out = fs::canonicalize(&out).unwrap_or_else(|_| out.clone());
    let canonical_root =
        fs::canonicalize(ctx.project_root()).unwrap_or_else(|_| ctx.project_root().to_path_buf());
    if canonical_root.starts_with(&canonical_out) {
        return TaskResult::failed(
            CLEAN_TASK,
            format!("refusing to delete {}: it contains the project", out.display()),
            start.elapsed(),
        );
    }

    match fs::remove_dir_all(&out) {
        Ok(()) => {
            log::info!("clean: removed {}", out.display());
            TaskResult::success(CLEAN_TASK, vec![], start.elapsed())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            TaskResult::success(CLEAN_TASK, vec![], start.elapsed())
        }
        Err(e) => TaskResult::failed(
            CLEAN_TASK,
            format!("Failed to remove {}: {}", out.display(), e),
            start.elapsed(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_output_tree() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("dist/css/deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("a.css"), "a{}").unwrap();
        fs::write(temp.path().join("index.html"), "<p>").unwrap();

        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let result = clean(&ctx);

        assert!(result.is_success());
        assert!(!temp.path().join("dist").exists());
        assert!(temp.path().join("index.html").exists());
    }

    #[test]
    fn test_clean_missing_dir_is_ok() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        assert!(clean(&ctx).is_success());
    }

    #[test]
    fn test_clean_refuses_project_ancestor() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("site");
        fs::create_dir_all(&root).unwrap();

        let mut config = default_config();
        config.project.out = temp.path().to_path_buf();
        let ctx = BuildContext::new(config, root.clone());

        let result = clean(&ctx);
        assert!(!result.is_success());
        assert!(root.exists());
    }

    #[test]
    fn test_clean_refuses_project_root() {
        let temp = TempDir::new().unwrap();
        let mut config = default_config();
        config.project.out = PathBuf::from(".");
        let ctx = BuildContext::new(config, temp.path().to_path_buf());

        assert!(!clean(&ctx).is_success());
        assert!(temp.path().exists());
    }
}
