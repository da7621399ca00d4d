//! Logging setup
//!
//! The console shows what `-v`/`--quiet` (or `RUST_LOG`) asks for. The debug
//! log in the base directory records this run at DEBUG level and is started
//! fresh each time.

use crate::config::Cli;
use crate::error::{Result, SplitError};
use crate::workspace::{WorkspaceLayout, DEBUG_LOG_NAME};
use std::fs::{self, File};
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Open `<base>/<file_name>` truncated, behind a non-blocking writer.
///
/// The returned guard flushes pending lines when dropped.
pub fn open_debug_log(base: &Path, file_name: &str) -> Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(base).map_err(|e| SplitError::output_error(base, e))?;
    let path = base.join(file_name);
    let file = File::create(&path).map_err(|e| SplitError::output_error(&path, e))?;
    Ok(tracing_appender::non_blocking(file))
}

/// Install the global subscriber. Keep the returned guard alive until exit.
pub fn init(cli: &Cli, layout: &WorkspaceLayout) -> Option<WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let (file_layer, guard) = match open_debug_log(&layout.base, DEBUG_LOG_NAME) {
        Ok((writer, guard)) => {
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("stemsplit=debug"));
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Warning: debug log disabled: {}", e.summary());
            (None, None)
        }
    };

    Registry::default().with(console_layer).with(file_layer).init();
    guard
}
