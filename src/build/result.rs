//! Build result types.
//!
//! Contains types for representing the outcome of task runs.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Every file was processed
    Success,
    /// Task matched no source files
    Skipped,
    /// At least one file failed
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Skipped)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Skipped => write!(f, "skipped"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// A source file that failed to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of running a single task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task that was run (e.g. "style", "clean")
    pub task_id: String,
    /// Run status
    pub status: BuildStatus,
    /// Output files written, sorted
    pub outputs: Vec<PathBuf>,
    /// Run duration
    pub duration: Duration,
    /// Per-file failures
    pub errors: Vec<FileError>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(task_id: impl Into<String>, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            status: BuildStatus::Success,
            outputs,
            duration,
            errors: vec![],
        }
    }

    /// Create a skipped result.
    pub fn skipped(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: BuildStatus::Skipped,
            outputs: vec![],
            duration: Duration::ZERO,
            errors: vec![],
        }
    }

    /// Create a failed result.
    pub fn failed(task_id: impl Into<String>, error: String, duration: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            status: BuildStatus::Failed(error),
            outputs: vec![],
            duration,
            errors: vec![],
        }
    }

    /// Create a result from per-file outcomes. Any file error fails the task.
    pub fn from_files(
        task_id: impl Into<String>,
        outputs: Vec<PathBuf>,
        errors: Vec<FileError>,
        duration: Duration,
    ) -> Self {
        let status = match errors.len() {
            0 => BuildStatus::Success,
            1 => BuildStatus::Failed(errors[0].to_string()),
            n => BuildStatus::Failed(format!("{} (and {} more)", errors[0], n - 1)),
        };
        Self { task_id: task_id.into(), status, outputs, duration, errors }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each task, in completion order
    pub tasks: Vec<TaskResult>,
    /// Total duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Append every result from another run.
    pub fn merge(&mut self, other: BuildResult) {
        self.tasks.extend(other.tasks);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get the number of successful tasks.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, BuildStatus::Success)).count()
    }

    /// Get the number of skipped tasks.
    pub fn skipped_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, BuildStatus::Skipped)).count()
    }

    /// Get the number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall run succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get every per-file error.
    pub fn all_errors(&self) -> Vec<&FileError> {
        self.tasks.iter().flat_map(|r| r.errors.iter()).collect()
    }

    /// Get failed task results.
    pub fn failures(&self) -> Vec<&TaskResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.tasks.len();
        let files = self.all_outputs().len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} succeeded, {} skipped, {} failed ({} total)",
                success, skipped, failed, total
            ));
            for task in self.failures() {
                if task.errors.is_empty() {
                    lines.push(format!("  - {}: {}", task.task_id, task.status));
                }
                for error in task.errors.iter().take(5) {
                    lines.push(format!("  - {}: {}", task.task_id, error));
                }
                if task.errors.len() > 5 {
                    lines.push(format!("    ... and {} more", task.errors.len() - 5));
                }
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} tasks, {} skipped, {} files written in {:?}",
                success, skipped, files, self.total_duration
            ));
        }

        lines.join("\n")
    }
}
