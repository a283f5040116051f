//! Watch mode for automatic rebuilds on file changes
//!
//! Subscribes to the glob bases of every enabled task, debounces bursts of
//! events, and re-runs only the tasks whose globs match a changed path.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;

use crate::build::discovery::{glob_base, is_recursive};
use crate::build::{run_tasks, BuildContext, BuildResult, DiscoveryError, TaskKind, TaskSet};
use crate::server::ReloadHandle;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {0}: {1}")]
    WatchPath(PathBuf, notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    ChannelError(String),
    /// Task globs could not be compiled
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),
}

/// Tracks files with errors across rebuilds for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    /// Failing files per task, as of the last time that task ran
    files_with_errors: HashMap<String, HashSet<PathBuf>>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Update tracker with a rebuild result, returns files that were fixed.
    ///
    /// Only tasks present in `result` are re-evaluated; errors recorded for
    /// tasks that did not run are kept.
    pub fn update(&mut self, result: &BuildResult) -> Vec<PathBuf> {
        let mut fixed = Vec::new();
        for task in &result.tasks {
            let current: HashSet<PathBuf> = task.errors.iter().map(|e| e.path.clone()).collect();
            if let Some(previous) = self.files_with_errors.get(&task.task_id) {
                fixed.extend(previous.difference(&current).cloned());
            }
            if current.is_empty() {
                self.files_with_errors.remove(&task.task_id);
            } else {
                self.files_with_errors.insert(task.task_id.clone(), current);
            }
        }
        fixed.sort();
        fixed
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Get the number of files with errors
    pub fn error_count(&self) -> usize {
        self.files_with_errors.values().map(HashSet::len).sum()
    }
}

/// Options for watch mode
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Live reload counter to bump after rebuilds that wrote output
    pub reload: Option<ReloadHandle>,
}

/// Directories to subscribe to, derived from task glob bases.
///
/// A base that does not exist yet is replaced by its nearest existing
/// ancestor inside the project, watched recursively. Directories already
/// covered by a recursive watch are dropped.
pub fn watch_roots(ctx: &BuildContext, tasks: &TaskSet) -> Vec<(PathBuf, RecursiveMode)> {
    let root = ctx.project_root();
    let mut roots: BTreeMap<PathBuf, bool> = BTreeMap::new();

    for task in tasks.iter() {
        for pattern in task.patterns() {
            let mut dir = root.join(glob_base(pattern));
            let mut recursive = is_recursive(pattern);
            while !dir.is_dir() && dir != root {
                recursive = true;
                if !dir.pop() {
                    break;
                }
            }
            let entry = roots.entry(dir).or_insert(false);
            *entry |= recursive;
        }
    }

    let recursive_dirs: Vec<PathBuf> =
        roots.iter().filter(|(_, r)| **r).map(|(d, _)| d.clone()).collect();

    roots
        .into_iter()
        .filter(|(dir, _)| !recursive_dirs.iter().any(|r| dir != r && dir.starts_with(r)))
        .map(|(dir, recursive)| {
            let mode = if recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
            (dir, mode)
        })
        .collect()
}

/// Tasks to re-run for a batch of changed paths, in task order.
///
/// Paths inside the output directory are ignored so writes made by a
/// rebuild never trigger another one.
pub fn plan_rebuild(ctx: &BuildContext, tasks: &TaskSet, changed: &[PathBuf]) -> Vec<TaskKind> {
    let kinds: BTreeSet<TaskKind> = changed
        .iter()
        .filter(|path| !ctx.is_output_path(path))
        .flat_map(|path| tasks.tasks_for_path(path))
        .collect();
    kinds.into_iter().collect()
}

/// State carried across rebuilds in watch mode.
pub struct WatchSession<'a> {
    ctx: &'a BuildContext,
    tasks: TaskSet,
    tracker: ErrorTracker,
    last_fixed: Vec<PathBuf>,
    options: WatchOptions,
}

impl<'a> WatchSession<'a> {
    pub fn new(ctx: &'a BuildContext, options: WatchOptions) -> Result<Self, WatchError> {
        let tasks = TaskSet::from_context(ctx)?;
        Ok(Self { ctx, tasks, tracker: ErrorTracker::new(), last_fixed: Vec::new(), options })
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    /// Files still failing as of the most recent rebuild of their task.
    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }

    /// Files that failed before the most recent rebuild and no longer do.
    pub fn last_fixed(&self) -> &[PathBuf] {
        &self.last_fixed
    }

    /// React to a batch of changed paths.
    ///
    /// Returns `None` when no task is affected.
    pub fn handle_changes(&mut self, changed: &[PathBuf]) -> Option<BuildResult> {
        let kinds = plan_rebuild(self.ctx, &self.tasks, changed);
        if kinds.is_empty() {
            return None;
        }

        if self.ctx.config().watch.clear_screen && atty::is(atty::Stream::Stdout) {
            clear_screen();
        }
        for path in changed.iter().filter(|p| !self.ctx.is_output_path(p)) {
            if let Some(name) = path.file_name() {
                println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
            }
        }

        let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
        println!("[{}] Rebuilding {}...", timestamp(), names.join(", "));
        let result = run_tasks(self.ctx, &self.tasks, &kinds);

        self.last_fixed = self.tracker.update(&result);
        print_build_result(&result, &self.last_fixed);

        if !result.all_outputs().is_empty() {
            if let Some(reload) = &self.options.reload {
                let generation = reload.bump();
                log::debug!("live reload generation {}", generation);
            }
        }
        Some(result)
    }
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
    let _ = std::io::stdout().flush();
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Watch sources and rebuild affected tasks until interrupted.
///
/// Failed rebuilds are reported and watching continues. Only setup failures
/// return an error.
pub fn watch_and_rebuild(ctx: &BuildContext, options: WatchOptions) -> Result<(), WatchError> {
    let mut session = WatchSession::new(ctx, options)?;

    let (tx, rx) = channel();
    let debounce_duration = Duration::from_millis(u64::from(ctx.config().watch.debounce_ms));
    let mut debouncer = new_debouncer(debounce_duration, tx).map_err(WatchError::WatcherInit)?;

    let roots = watch_roots(ctx, session.tasks());
    for (dir, mode) in &roots {
        debouncer
            .watcher()
            .watch(dir, *mode)
            .map_err(|e| WatchError::WatchPath(dir.clone(), e))?;
        log::debug!("watching {} ({:?})", dir.display(), mode);
    }

    println!("[{}] Watching {} for changes...", timestamp(), ctx.project_root().display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path)
                    .collect();

                if session.handle_changes(&changed).is_some() {
                    println!(
                        "[{}] Watching {} for changes...",
                        timestamp(),
                        ctx.project_root().display()
                    );
                }
            }
            Ok(Err(error)) => {
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => {
                return Err(WatchError::ChannelError(e.to_string()));
            }
        }
    }
}

/// Print a rebuild result to console with fixed file notifications
fn print_build_result(result: &BuildResult, fixed_files: &[PathBuf]) {
    for fixed in fixed_files {
        if let Some(name) = fixed.file_name() {
            println!("[{}] Fixed: {}", timestamp(), name.to_string_lossy());
        }
    }

    let duration: Duration = result.tasks.iter().map(|t| t.duration).max().unwrap_or_default();
    if result.is_success() {
        println!(
            "[{}] Build complete ({}) - Tasks: {} | Files: {}",
            timestamp(),
            format_duration(duration),
            result.tasks.len(),
            result.all_outputs().len()
        );
    } else {
        let errors = result.all_errors();
        let error_count = errors.len().max(result.failed_count());
        println!(
            "[{}] Build failed ({}) - {} error{}",
            timestamp(),
            format_duration(duration),
            error_count,
            if error_count == 1 { "" } else { "s" }
        );

        for error in errors {
            match error.path.file_name() {
                Some(name) => {
                    eprintln!("[{}] Error in {}: {}", timestamp(), name.to_string_lossy(), error.message)
                }
                None => eprintln!("[{}] Error: {}", timestamp(), error),
            }
        }
        for task in result.failures().into_iter().filter(|t| t.errors.is_empty()) {
            eprintln!("[{}] Error: {}: {}", timestamp(), task.task_id, task.status);
        }
    }
}
