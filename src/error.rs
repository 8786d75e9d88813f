//! Error types for the logging subsystem

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by [`FileSink`](crate::logging::FileSink) and
/// [`Logger`](crate::logging::Logger)
///
/// Write failures are not errors: they are reported as `Ok(false)` so the
/// caller can decide whether to retry. Rotation failures are never surfaced.
#[derive(Debug, Error)]
pub enum LogError {
    /// The sink was configured without a base directory
    #[error("log sink requires a non-empty `path`")]
    MissingPath,

    /// The configured `time_format` is not a valid strftime string
    #[error("invalid log time format `{0}`")]
    InvalidTimeFormat(String),

    /// The destination directory could not be created
    #[error("failed to create log directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LogError>;
