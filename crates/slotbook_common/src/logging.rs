//! Logging utilities for Slotbook.
//!
//! Library crates only emit `tracing` events. A binary installs the
//! subscriber once through [`init`] or [`init_with_level`].

use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target prefix shared by every workspace crate (`slotbook_session`, ...).
const TARGET_PREFIX: &str = "slotbook";

/// Installs the subscriber with `slotbook*` targets at INFO.
///
/// # Examples
///
/// ```
/// use slotbook_common::logging;
///
/// logging::init();
/// // Already installed, so this does nothing.
/// logging::init_with_level(tracing::Level::DEBUG);
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Installs the subscriber with `slotbook*` targets at `level`.
///
/// Directives from `RUST_LOG` still apply to other targets. Output goes to
/// stderr so command output on stdout stays clean. Does nothing when a
/// global subscriber is already set.
pub fn init_with_level(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .from_env_lossy();
    let filter = match format!("{}={}", TARGET_PREFIX, level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok();

    if installed {
        info!("Logging at {} for {} crates", level, TARGET_PREFIX);
    }
}

/// Logs `error` at ERROR, prefixed with `context`.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    error!("{}: {}", context, error);
}

/// Logs `success_message` at INFO on `Ok`, or the error with `error_context`
/// at ERROR. Hands the result back unchanged.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    if let Err(e) = &result {
        log_error(e, error_context);
    } else {
        info!("{}", success_message);
    }
    result
}
