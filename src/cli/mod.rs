//! Command-line interface implementation
//!
//! `assetflow [TASK]` runs one named entry point; with no task it runs the
//! default pipeline: clean, build every asset task, serve, then watch.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::build::{BuildContext, BuildResult, Runner, Step, ENTRY_POINTS};
use crate::config::loader::{
    check, default_config, find_config, load_config, merge_cli_overrides, CliOverrides,
};
use crate::config::FlowConfig;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// assetflow - Build, serve and watch front-end assets
#[derive(Parser, Debug)]
#[command(name = "assetflow")]
#[command(about = "Build, serve and watch front-end assets")]
#[command(version)]
pub struct Cli {
    /// Task to run: default, build, clean, style, sass, script, markup,
    /// images, vendor, serve or watch
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Path to assetflow.toml (default: search upward from the current directory)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output directory, overriding project.out
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Dev server port, overriding server.port
    #[arg(long)]
    pub port: Option<u16>,

    /// Dev server host, overriding server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Log every file processed
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_INVALID_ARGS)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };
    crate::logging::init(cli.verbose);

    let name = cli.task.as_deref().unwrap_or("default");
    let Some(step) = Step::from_name(name) else {
        eprintln!("Error: unknown task '{}'", name);
        eprintln!("Available tasks: {}", ENTRY_POINTS.join(", "));
        return ExitCode::from(EXIT_INVALID_ARGS);
    };

    let (config, project_root) = match resolve_config(&cli) {
        Ok(found) => found,
        Err(code) => return code,
    };

    let context = BuildContext::new(config, project_root).with_verbose(cli.verbose);
    run_step(&context, &step)
}

/// Load the configuration and work out the project root.
fn resolve_config(cli: &Cli) -> Result<(FlowConfig, PathBuf), ExitCode> {
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("Error: cannot read current directory: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    let config_path = match &cli.config {
        Some(path) if !path.is_file() => {
            eprintln!("Error: config file not found: {}", path.display());
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
        Some(path) => Some(path.clone()),
        None => find_config(),
    };

    let (mut config, root) = match config_path {
        Some(path) => {
            log::debug!("using config {}", path.display());
            let config = load_config(Some(&path)).map_err(|e| {
                eprintln!("Error loading config: {}", e);
                ExitCode::from(EXIT_INVALID_ARGS)
            })?;
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone());
            (config, root)
        }
        None => {
            log::debug!("no assetflow.toml found, using the built-in pipeline");
            (default_config(), cwd)
        }
    };

    let overrides = CliOverrides { out: cli.out.clone(), port: cli.port, host: cli.host.clone() };
    merge_cli_overrides(&mut config, &overrides);
    if let Err(e) = check(&config) {
        eprintln!("Error: {}", e);
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }

    let root = std::fs::canonicalize(&root).unwrap_or(root);
    Ok((config, root))
}

fn run_step(context: &BuildContext, step: &Step) -> ExitCode {
    let runner = match Runner::new(context) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    match runner.run(step) {
        Ok(result) => {
            report(&result);
            if !result.is_success() {
                return ExitCode::from(EXIT_ERROR);
            }
            if step.starts_server() {
                println!("Press Ctrl+C to stop");
                runner.join_server();
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn report(result: &BuildResult) {
    let summary = result.summary();
    if result.is_success() {
        println!("{}", summary);
    } else {
        eprintln!("{}", summary);
    }
}
