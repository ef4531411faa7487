//! Error types for the change watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the watcher from starting.
///
/// Once the event loop runs, failures are logged and the offending event is
/// skipped instead.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot resolve watch root {path}: {reason}")]
    RootUnavailable { path: PathBuf, reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
