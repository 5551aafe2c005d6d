//! Tracing setup for the server and CLI.
//!
//! Events are written to stdout and appended to the configured log file (`FINDOC_LOG_FILE`,
//! default `logs/findoc-analyzer.log`). The file layer is skipped with a warning on stderr when
//! its directory cannot be created.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber: `RUST_LOG` filter (default `info`), compact stdout output, and
/// a non-blocking writer for `log_file`.
pub fn init_tracing(log_file: &Path) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = file_writer(log_file).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .init();

    tracing::debug!(log_file = %log_file.display(), "Tracing initialized");
}

fn file_writer(log_file: &Path) -> Option<NonBlocking> {
    let (directory, file_name) = split_log_path(log_file)?;
    if let Err(err) = std::fs::create_dir_all(&directory) {
        eprintln!(
            "Failed to create log directory {}: {err}",
            directory.display()
        );
        return None;
    }

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}

/// Split a log path into its directory (current dir when bare) and file name.
fn split_log_path(log_file: &Path) -> Option<(PathBuf, PathBuf)> {
    let file_name = PathBuf::from(log_file.file_name()?);
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((directory, file_name))
}
