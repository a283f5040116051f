//! Configuration schema types for `assetflow.toml`
//!
//! Every field has a default reproducing the stock pipeline, so an empty file
//! (or no file at all) describes a complete build.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::build::TaskKind;

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Build output directory, removed by the clean task
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_name() -> String {
    "site".to_string()
}

fn default_out() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: default_name(), out: default_out() }
    }
}

/// Per-task overrides. Unset fields fall back to the task's built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Disable the task entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Source glob patterns, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<Vec<String>>,
    /// Output directory, relative to `project.out`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
    /// Extra globs that re-trigger the task in watch mode without being built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<Vec<String>>,
}

/// Task overrides keyed by task name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub style: TaskConfig,
    #[serde(default)]
    pub sass: TaskConfig,
    #[serde(default)]
    pub script: TaskConfig,
    #[serde(default)]
    pub markup: TaskConfig,
    #[serde(default)]
    pub images: TaskConfig,
    #[serde(default)]
    pub vendor: TaskConfig,
}

impl TasksConfig {
    /// Get the override block for a task kind.
    pub fn get(&self, kind: TaskKind) -> &TaskConfig {
        match kind {
            TaskKind::Style => &self.style,
            TaskKind::Sass => &self.sass,
            TaskKind::Script => &self.script,
            TaskKind::Markup => &self.markup,
            TaskKind::Images => &self.images,
            TaskKind::Vendor => &self.vendor,
        }
    }
}

/// A task's effective settings after applying overrides to its defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub enabled: bool,
    pub src: Vec<String>,
    pub dest: PathBuf,
    pub watch: Vec<String>,
}

impl TaskSpec {
    /// Built-in declaration for a task kind.
    pub fn defaults(kind: TaskKind) -> Self {
        let (src, dest, watch): (&[&str], &str, &[&str]) = match kind {
            TaskKind::Style => (&["src/css/*.css"], "css", &[]),
            TaskKind::Sass => (&["src/css/*.scss"], "sass", &[]),
            TaskKind::Script => (&["src/js/*.js"], "js", &[]),
            TaskKind::Markup => (&["index.html"], "", &["src/partials/**/*.html"]),
            TaskKind::Images => (&["src/images/**"], "images", &[]),
            TaskKind::Vendor => (&["src/lib/**/*"], "lib", &[]),
        };
        Self {
            enabled: true,
            src: src.iter().map(|s| s.to_string()).collect(),
            dest: PathBuf::from(dest),
            watch: watch.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Apply an override block on top of these settings.
    pub fn merged(mut self, overrides: &TaskConfig) -> Self {
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
        if let Some(ref src) = overrides.src {
            self.src = src.clone();
        }
        if let Some(ref dest) = overrides.dest {
            self.dest = dest.clone();
        }
        if let Some(ref watch) = overrides.watch {
            self.watch = watch.clone();
        }
        self
    }
}

/// Stylesheet settings shared by the style and sass tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CssConfig {
    /// Browserslist queries used for vendor prefixing
    #[serde(default = "default_css_targets")]
    pub targets: Vec<String>,
}

fn default_css_targets() -> Vec<String> {
    vec!["> 0.5%".to_string(), "last 2 versions".to_string(), "not dead".to_string()]
}

impl Default for CssConfig {
    fn default() -> Self {
        Self { targets: default_css_targets() }
    }
}

/// SASS compiler settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SassConfig {
    /// Extra directories searched by `@use` and `@import`, relative to the project root
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
}

/// HTML settings for the markup task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupConfig {
    /// Expand `@@include('...')` directives
    #[serde(default = "default_true")]
    pub includes: bool,
    /// Drop empty native attributes such as `class=""`
    #[serde(default = "default_true")]
    pub remove_empty_attributes: bool,
    /// Run the HTML minifier (whitespace collapsing, attribute quote removal)
    #[serde(default = "default_true")]
    pub minify: bool,
    /// Minify inline `<style>` blocks
    #[serde(default = "default_true")]
    pub minify_css: bool,
    /// Minify inline `<script>` blocks
    #[serde(default = "default_true")]
    pub minify_js: bool,
    /// Keep HTML comments
    #[serde(default)]
    pub keep_comments: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            includes: true,
            remove_empty_attributes: true,
            minify: true,
            minify_css: true,
            minify_js: true,
            keep_comments: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// ECMAScript versions the script task can lower to
pub const SCRIPT_TARGETS: &[&str] = &[
    "es3", "es5", "es2015", "es2016", "es2017", "es2018", "es2019", "es2020", "es2021", "es2022",
    "esnext",
];

/// JavaScript settings for the script task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Down-level modern syntax before minifying
    #[serde(default = "default_true")]
    pub transpile: bool,
    /// Output language level for the transpile stage
    #[serde(default = "default_script_target")]
    pub target: String,
}

fn default_script_target() -> String {
    "es5".to_string()
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self { transpile: true, target: default_script_target() }
    }
}

/// A reverse-proxy rule for the dev server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRule {
    /// URL path prefix to forward, e.g. `/api`
    pub prefix: String,
    /// Upstream origin, e.g. `http://localhost:5000`
    pub target: String,
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Inject the live-reload client into served HTML
    #[serde(default = "default_true")]
    pub livereload: bool,
    /// Open the browser once the server is listening
    #[serde(default)]
    pub open: bool,
    /// Reverse-proxy rules, longest matching prefix wins
    #[serde(default)]
    pub proxy: Vec<ProxyRule>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            livereload: true,
            open: false,
            proxy: Vec::new(),
        }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Complete assetflow.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub css: CssConfig,
    #[serde(default)]
    pub sass: SassConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "tasks.style.src")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assetflow.toml: '{}' {}", self.field, self.message)
    }
}

impl FlowConfig {
    /// Effective settings for a task.
    pub fn task(&self, kind: TaskKind) -> TaskSpec {
        TaskSpec::defaults(kind).merged(self.tasks.get(kind))
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigValidationError { field, message: message.to_string() });
        };

        if self.project.name.is_empty() {
            push("project.name".to_string(), "must be a non-empty string");
        }

        // The clean task deletes this directory, so it must be a real subdirectory.
        if !is_contained_subpath(&self.project.out) && !self.project.out.is_absolute() {
            push("project.out".to_string(), "must name a subdirectory of the project");
        }

        for kind in TaskKind::ALL {
            let spec = self.task(kind);
            if !spec.enabled {
                continue;
            }
            if spec.src.is_empty() {
                push(format!("tasks.{}.src", kind), "must contain at least one glob pattern");
            }
            for pattern in spec.src.iter().chain(spec.watch.iter()) {
                if glob::Pattern::new(pattern).is_err() {
                    push(format!("tasks.{}.src", kind), "contains an invalid glob pattern");
                }
            }
            if spec.dest.is_absolute() || (!spec.dest.as_os_str().is_empty() && !is_contained_subpath(&spec.dest)) {
                push(format!("tasks.{}.dest", kind), "must be a relative path inside project.out");
            }
        }

        for (i, rule) in self.server.proxy.iter().enumerate() {
            if !rule.prefix.starts_with('/') {
                push(format!("server.proxy[{}].prefix", i), "must start with '/'");
            }
            if !(rule.target.starts_with("http://") || rule.target.starts_with("https://")) {
                push(format!("server.proxy[{}].target", i), "must be an http:// or https:// URL");
            }
        }

        if !SCRIPT_TARGETS.contains(&self.script.target.as_str()) {
            push("script.target".to_string(), "must be one of es3, es5, es2015..es2022, esnext");
        }

        if self.server.host.is_empty() {
            push("server.host".to_string(), "must be a non-empty string");
        }

        if self.watch.debounce_ms == 0 {
            push("watch.debounce_ms".to_string(), "must be a positive integer");
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// True for non-empty relative paths made only of normal components.
fn is_contained_subpath(path: &Path) -> bool {
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}
