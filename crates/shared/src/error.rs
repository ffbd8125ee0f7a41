//! Error types for MCPist

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpistError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Locked by plan: {0}")]
    PlanLocked(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
