//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

use super::protocol::ProtocolError;

/// The execution unit could not be started.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("worker command is empty")]
    EmptyCommand,

    #[error("failed to start worker `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker `{program}` did not answer the handshake: {reason}")]
    Handshake { program: String, reason: String },
}

/// Runtime resources could not be loaded.
#[derive(Debug, Error)]
#[error("failed to load resources from `{}`: {reason}", root.display())]
pub struct LoadError {
    pub root: PathBuf,
    pub reason: String,
}

impl LoadError {
    pub fn new(root: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            reason: reason.into(),
        }
    }
}

/// The worker ran but produced no usable output.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The worker reported a failure; the text is shown to the user verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("worker communication failed: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("unexpected worker response: {0}")]
    Unexpected(String),
}

/// Any failure along the worker lifecycle.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_verbatim() {
        let err = WorkerError::from(CompileError::Rejected("! Undefined control sequence.".into()));
        assert_eq!(err.to_string(), "! Undefined control sequence.");

        let err = WorkerError::from(LoadError::new("/opt/tex", "not a directory"));
        assert_eq!(err.to_string(), "failed to load resources from `/opt/tex`: not a directory");
    }
}
