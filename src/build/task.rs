//! Asset task definitions.
//!
//! An asset task is one "read these globs, pipe through a chain, write here"
//! step. The six kinds are fixed; their globs and destinations come from the
//! configuration.

use glob::Pattern;
use std::path::{Path, PathBuf};

use crate::build::discovery::{compile_patterns, DiscoveryError, MATCH_OPTIONS};
use crate::build::BuildContext;

/// Kind of asset task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Plain stylesheets
    Style,
    /// SCSS stylesheets
    Sass,
    /// JavaScript
    Script,
    /// HTML pages
    Markup,
    /// Image copy
    Images,
    /// Third-party library copy
    Vendor,
}

impl TaskKind {
    /// All kinds, in the order they are reported.
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Style,
        TaskKind::Sass,
        TaskKind::Script,
        TaskKind::Markup,
        TaskKind::Images,
        TaskKind::Vendor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Style => "style",
            TaskKind::Sass => "sass",
            TaskKind::Script => "script",
            TaskKind::Markup => "markup",
            TaskKind::Images => "images",
            TaskKind::Vendor => "vendor",
        }
    }

    pub fn from_name(name: &str) -> Option<TaskKind> {
        TaskKind::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A configured asset task ready to run.
#[derive(Debug, Clone)]
pub struct AssetTask {
    /// What kind of task this is
    pub kind: TaskKind,
    /// Source glob patterns, relative to the project root
    pub sources: Vec<String>,
    /// Absolute output directory
    pub dest: PathBuf,
    /// Extra globs that only trigger a rebuild
    pub watch: Vec<String>,
    matchers: Vec<Pattern>,
}

impl AssetTask {
    /// Resolve a task's effective settings against the context.
    pub fn from_context(ctx: &BuildContext, kind: TaskKind) -> Result<Self, DiscoveryError> {
        let spec = ctx.config().task(kind);
        let dest = ctx.out_dir().join(&spec.dest);
        let all: Vec<String> = spec.src.iter().chain(spec.watch.iter()).cloned().collect();
        let matchers = compile_patterns(ctx.project_root(), &all)?;

        Ok(Self { kind, sources: spec.src, dest, watch: spec.watch, matchers })
    }

    /// Task identifier used in reports.
    pub fn id(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether a change to `path` should re-run this task.
    pub fn matches_path(&self, path: &Path) -> bool {
        self.matchers.iter().any(|p| p.matches_path_with(path, MATCH_OPTIONS))
    }

    /// All patterns that feed this task, sources first.
    pub fn patterns(&self) -> impl Iterator<Item = &String> {
        self.sources.iter().chain(self.watch.iter())
    }
}

/// The enabled asset tasks of a project.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<AssetTask>,
}

impl TaskSet {
    /// Build the set of enabled tasks.
    pub fn from_context(ctx: &BuildContext) -> Result<Self, DiscoveryError> {
        let mut tasks = Vec::new();
        for kind in TaskKind::ALL {
            if ctx.config().task(kind).enabled {
                tasks.push(AssetTask::from_context(ctx, kind)?);
            }
        }
        Ok(Self { tasks })
    }

    pub fn get(&self, kind: TaskKind) -> Option<&AssetTask> {
        self.tasks.iter().find(|t| t.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetTask> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks whose globs match a changed path.
    pub fn tasks_for_path(&self, path: &Path) -> Vec<TaskKind> {
        self.tasks.iter().filter(|t| t.matches_path(path)).map(|t| t.kind).collect()
    }
}
