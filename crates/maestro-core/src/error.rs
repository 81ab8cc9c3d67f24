//! Unified error types for Maestro

use thiserror::Error;

/// Unified error type for all Maestro operations
#[derive(Error, Debug)]
pub enum MaestroError {
    // Request errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Registry errors
    #[error("Worker already exists: {0}")]
    RegistryConflict(String),

    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    #[error("Registry error: {0}")]
    Registry(String),

    // Planning errors
    #[error("Plan error: {0}")]
    Plan(String),

    // Execution errors
    #[error("Step error: {0}")]
    Step(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl MaestroError {
    /// Whether this error should stop a run before any phase is attempted
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Result type alias using MaestroError
pub type Result<T> = std::result::Result<T, MaestroError>;
