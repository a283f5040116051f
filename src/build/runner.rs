//! Task composition: series and parallel groups.
//!
//! A [`Step`] tree describes a run. Series groups run members in order and
//! stop at the first failure; parallel groups run members on scoped threads
//! and wait for all of them.
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{BuildContext, Runner, Step};
//!
//! let runner = Runner::new(&context)?;
//! let result = runner.run(&Step::build())?;
//! println!("{}", result.summary());
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::build::clean::clean;
use crate::build::pipeline::{run_task, BuildError};
use crate::build::{BuildContext, BuildResult, TaskKind, TaskResult, TaskSet};
use crate::server::{DevServer, ReloadHandle};
use crate::watch::{watch_and_rebuild, WatchOptions};

/// A node in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Remove the output directory
    Clean,
    /// Run one asset task
    Asset(TaskKind),
    /// Start the dev server in the background
    Serve,
    /// Block watching sources
    Watch,
    /// Run members in order, stopping at the first failure
    Series(Vec<Step>),
    /// Run members concurrently
    Parallel(Vec<Step>),
}

/// Names accepted by [`Step::from_name`].
pub const ENTRY_POINTS: &[&str] = &[
    "default", "build", "clean", "style", "sass", "script", "markup", "images", "vendor", "serve",
    "watch",
];

impl Step {
    /// Every asset task, concurrently.
    pub fn assets() -> Step {
        Step::Parallel(TaskKind::ALL.into_iter().map(Step::Asset).collect())
    }

    /// Clean, then build every asset task.
    pub fn build() -> Step {
        Step::Series(vec![Step::Clean, Step::assets()])
    }

    /// Clean, build, serve, then watch.
    pub fn default_pipeline() -> Step {
        Step::Series(vec![Step::Clean, Step::assets(), Step::Serve, Step::Watch])
    }

    /// Look up a named entry point.
    pub fn from_name(name: &str) -> Option<Step> {
        match name {
            "default" => Some(Step::default_pipeline()),
            "build" => Some(Step::build()),
            "clean" => Some(Step::Clean),
            "serve" => Some(Step::Serve),
            "watch" => Some(Step::Series(vec![Step::build(), Step::Watch])),
            other => TaskKind::from_name(other).map(Step::Asset),
        }
    }

    /// Whether running this step leaves a server that should be waited on.
    pub fn starts_server(&self) -> bool {
        match self {
            Step::Serve => true,
            Step::Series(steps) | Step::Parallel(steps) => steps.iter().any(Step::starts_server),
            _ => false,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Clean => write!(f, "clean"),
            Step::Asset(kind) => write!(f, "{}", kind),
            Step::Serve => write!(f, "serve"),
            Step::Watch => write!(f, "watch"),
            Step::Series(steps) => write_group(f, "series", steps),
            Step::Parallel(steps) => write_group(f, "parallel", steps),
        }
    }
}

fn write_group(f: &mut std::fmt::Formatter<'_>, name: &str, steps: &[Step]) -> std::fmt::Result {
    write!(f, "{}(", name)?;
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", step)?;
    }
    write!(f, ")")
}

/// Executes [`Step`] trees against a build context.
pub struct Runner<'a> {
    ctx: &'a BuildContext,
    tasks: TaskSet,
    reload: ReloadHandle,
    server: Mutex<Option<DevServer>>,
}

impl<'a> Runner<'a> {
    pub fn new(ctx: &'a BuildContext) -> Result<Self, BuildError> {
        let tasks = TaskSet::from_context(ctx)?;
        Ok(Self { ctx, tasks, reload: ReloadHandle::new(), server: Mutex::new(None) })
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn reload(&self) -> &ReloadHandle {
        &self.reload
    }

    /// Run a step tree.
    ///
    /// Task failures are reported in the result; only setup failures (server
    /// bind, watcher init) are returned as errors.
    pub fn run(&self, step: &Step) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        log::debug!("running {}", step);
        let result = self.run_step(step)?;
        Ok(result.with_duration(start.elapsed()))
    }

    fn run_step(&self, step: &Step) -> Result<BuildResult, BuildError> {
        let mut result = BuildResult::new();
        match step {
            Step::Clean => result.add_result(clean(self.ctx)),
            Step::Asset(kind) => result.add_result(self.run_asset(*kind)),
            Step::Serve => result.add_result(self.start_server()?),
            Step::Watch => {
                let reload = self.has_server().then(|| self.reload.clone());
                watch_and_rebuild(self.ctx, WatchOptions { reload })?;
            }
            Step::Series(steps) => {
                for step in steps {
                    result.merge(self.run_step(step)?);
                    if !result.is_success() {
                        log::error!("stopping: {} failed", step);
                        break;
                    }
                }
            }
            Step::Parallel(steps) => {
                let outcomes: Vec<Result<BuildResult, BuildError>> = std::thread::scope(|s| {
                    let handles: Vec<_> =
                        steps.iter().map(|step| s.spawn(move || self.run_step(step))).collect();
                    handles
                        .into_iter()
                        .map(|h| {
                            h.join().unwrap_or_else(|_| {
                                Err(BuildError::Build("task thread panicked".to_string()))
                            })
                        })
                        .collect()
                });
                for outcome in outcomes {
                    result.merge(outcome?);
                }
            }
        }
        Ok(result)
    }

    fn run_asset(&self, kind: TaskKind) -> TaskResult {
        match self.tasks.get(kind) {
            Some(task) => run_task(self.ctx, task),
            None => {
                log::info!("{}: disabled", kind);
                TaskResult::skipped(kind.name())
            }
        }
    }

    fn start_server(&self) -> Result<TaskResult, BuildError> {
        let start = Instant::now();
        let mut slot = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            let root = self.ctx.out_dir();
            std::fs::create_dir_all(&root)?;
            let server = DevServer::start(&self.ctx.config().server, root, self.reload.clone())?;
            println!("Serving {} at {}", self.ctx.config().project.name, server.url());
            *slot = Some(server);
        }
        Ok(TaskResult::success("serve", vec![], start.elapsed()))
    }

    fn has_server(&self) -> bool {
        self.server.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// URL of the running dev server, if any.
    pub fn server_url(&self) -> Option<String> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner).as_ref().map(DevServer::url)
    }

    /// Block until the dev server exits. Returns immediately if none runs.
    pub fn join_server(&self) {
        let server = self.server.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(server) = server {
            server.join();
        }
    }

    /// Stop the dev server if it runs.
    pub fn stop_server(&self) {
        let server = self.server.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(server) = server {
            server.stop();
        }
    }
}

/// Run a subset of asset tasks concurrently. Results follow `kinds` order.
pub fn run_tasks(ctx: &BuildContext, tasks: &TaskSet, kinds: &[TaskKind]) -> BuildResult {
    let start = Instant::now();
    let results: Vec<TaskResult> = std::thread::scope(|s| {
        let handles: Vec<_> = kinds
            .iter()
            .filter_map(|kind| tasks.get(*kind))
            .map(|task| (task.id(), s.spawn(move || run_task(ctx, task))))
            .collect();
        handles
            .into_iter()
            .map(|(id, h)| {
                h.join().unwrap_or_else(|_| {
                    TaskResult::failed(id, "task thread panicked".to_string(), start.elapsed())
                })
            })
            .collect()
    });

    let mut result = BuildResult::new();
    for task_result in results {
        result.add_result(task_result);
    }
    result.with_duration(start.elapsed())
}
