//! Process-wide logging setup.
//!
//! The pipeline calls [`init`] with the resolved `log_file` value before
//! validation runs, so anything the pipeline itself logs ends up in the
//! file. Applications without a `log_file` field can call `init(None)`
//! themselves for console-only output.
//!
//! Initialization is idempotent: a second call (common in tests, where
//! several command trees run in one process) leaves the first subscriber
//! in place.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::FigtreeError;

/// Install the global subscriber: env-filtered console output on stderr,
/// plus a plain-text copy to `log_file` when given. Defaults to `info`
/// when `RUST_LOG` is unset.
pub fn init(log_file: Option<&Path>) -> Result<(), FigtreeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Append so successive runs share one log, like a long-lived run log.
    let file = match log_file {
        Some(path) => Some(
            File::options()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| FigtreeError::IoError {
                    path: path.to_path_buf(),
                    source: e,
                })?,
        ),
        None => None,
    };

    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = file.map(|f| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(f))
    });

    // try_init: keep the already-installed subscriber on repeat calls.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
    Ok(())
}
