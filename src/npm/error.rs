//! Errors from running the package manager

use crate::core::ExitCodeError;
use thiserror::Error;

/// Error types for package-manager invocations
#[derive(Debug, Error)]
pub enum NpmError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("npm timed out after {0} seconds")]
    Timeout(u64),

    #[error("npm {command} failed")]
    Exit {
        command: String,
        #[source]
        source: ExitCodeError,
    },

    #[error("Unexpected output from npm {command}: {reason}")]
    Output { command: String, reason: String },
}

impl NpmError {
    /// Native exit code of the npm process, when it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            NpmError::Exit { source, .. } => Some(source.code()),
            _ => None,
        }
    }
}
