use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::{LOG_DIR, LOG_FILE};

/// Console output on stderr plus a daily JSON file log under `logs/`.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// life of the process.
pub fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let file_layer = match fs::create_dir_all(LOG_DIR) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            Some((fmt::layer().json().with_writer(writer), guard))
        }
        Err(e) => {
            eprintln!("warning: file logging disabled ({}): {}", LOG_DIR, e);
            None
        }
    };
    let (file_layer, guard) = match file_layer {
        Some((layer, guard)) => (Some(layer), Some(guard)),
        None => (None, None),
    };

    // stdout carries the conversion report
    let console_layer = fmt::layer()
        .with_target(verbose)
        .with_line_number(verbose)
        .with_writer(std::io::stderr);

    let default_directive = if verbose {
        "forgesteel_converter=debug,warn"
    } else {
        "forgesteel_converter=info,warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
