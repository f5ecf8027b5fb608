use thiserror::Error;

use crate::stage::Stage;

pub type Result<T> = std::result::Result<T, FlowError>;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("No task registered for stage: {0}")]
    StageNotFound(Stage),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Sanction generation failed: {0}")]
    Sanction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
