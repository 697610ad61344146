//! Engine error types

use thiserror::Error;

/// Errors surfaced by the simulation engine and its driver boundary
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to launch driver: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Script evaluation failed: {0}")]
    EvaluateFailed(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid sequence spec: {0}")]
    InvalidSequence(String),

    #[error("Job rejected: {0}")]
    JobRejected(String),
}

impl From<EngineError> for String {
    fn from(err: EngineError) -> String {
        err.to_string()
    }
}
