//! assetflow - build, serve and watch front-end assets

use std::process::ExitCode;

use assetflow::cli;

fn main() -> ExitCode {
    cli::run()
}
