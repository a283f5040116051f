//! Build pipeline module for assetflow
//!
//! Turns the configured asset tasks into output files.
//!
//! # Overview
//!
//! The build consists of:
//! - **Discovery**: Find source files using each task's glob patterns
//! - **Execution**: Pipe every file through its task's transform chain
//! - **Composition**: Run clean, asset tasks, server and watcher in series
//!   and parallel groups
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{BuildContext, Runner, Step};
//! use assetflow::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let runner = Runner::new(&context)?;
//!
//! let result = runner.run(&Step::build())?;
//! println!("{}", result.summary());
//! ```

pub mod clean;
pub mod context;
pub mod discovery;
pub mod pipeline;
pub mod result;
pub mod runner;
pub mod task;

pub use clean::*;
pub use context::*;
pub use discovery::*;
pub use pipeline::*;
pub use result::*;
pub use runner::*;
pub use task::*;
