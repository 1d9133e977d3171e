// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! Logging bootstrap
//!
//! Opt-in file logging for subprocess scenarios, driven entirely by the
//! environment so that an outer test harness can collect the log output of
//! build backend invocations it spawns.

use std::{
    env,
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Names the log file the outer harness writes to. This process logs into
/// a sibling file derived from it.
const LOG_FILE_ENV: &str = "TFC_LOG_FILE";

/// Overrides the log level filter, `debug` when unset.
const LOG_LEVEL_ENV: &str = "TFC_LOG_LEVEL";

/// A failed logging bootstrap.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file could not be created.
    #[error("failed to create log file '{path}'")]
    Create {
        /// The unusable log file path.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configured level is not a valid filter directive.
    #[error("unusable log level filter '{0}'")]
    Filter(String),

    /// Another global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Configure file logging from the environment.
///
/// When `TFC_LOG_FILE` is set, log output goes to a `<stem>_subproc.log`
/// file next to the named path, filtered at the level from
/// `TFC_LOG_LEVEL` (default `debug`). Without the variable nothing is
/// configured and `Ok(false)` is returned.
///
/// # Errors
///
/// Returns a [`LoggingError`] if the log file cannot be created, the level
/// filter does not parse or a global subscriber is already installed.
pub fn init_from_env() -> Result<bool, LoggingError> {
    let Some(configured) = env::var_os(LOG_FILE_ENV) else {
        return Ok(false);
    };
    let log_file = sibling_log_file(Path::new(&configured));
    let file = File::create(&log_file).map_err(|source| LoggingError::Create {
        path: log_file.clone(),
        source,
    })?;
    let level = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "debug".to_owned());
    let filter = EnvFilter::try_new(&level).map_err(|_| LoggingError::Filter(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;
    Ok(true)
}

/// Derive the log file for this process from the harness' log file.
fn sibling_log_file(configured: &Path) -> PathBuf {
    let stem = configured
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    let file_name = format!("{stem}_subproc.log");
    match configured.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
