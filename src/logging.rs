//! Logger setup.

/// Initialize the global logger.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `verbose`.
/// Calling this twice is harmless.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_target(false)
        .try_init();
}
