//! assetflow - front-end asset pipeline
//!
//! This library provides functionality to:
//! - Compile, prefix and minify stylesheets (plain CSS and SCSS)
//! - Minify scripts and markup, expanding `@@include` partials
//! - Copy images and vendor libraries into the output tree
//! - Serve the output with live reload and proxy rules
//! - Watch sources and re-run only the affected tasks

pub mod build;
pub mod cli;
pub mod config;
pub mod logging;
pub mod server;
pub mod transforms;
pub mod watch;
