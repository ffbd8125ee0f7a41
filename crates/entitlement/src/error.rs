//! Entitlement error types

use mcpist_shared::McpistError;
use thiserror::Error;

use crate::requests::RequestStatus;

/// Entitlement-specific errors
///
/// Resolver queries never fail; these cover catalog loading, configuration
/// and administrative writes.
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("Catalog parse error: {0}")]
    CatalogParse(String),

    #[error("Catalog I/O error: {0}")]
    CatalogIo(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{subject} requires the {required} plan (current: {current})")]
    PlanLocked {
        subject: String,
        required: String,
        current: String,
    },

    #[error("Usage request {id} is already {status}")]
    AlreadyReviewed { id: String, status: RequestStatus },

    #[error("Store lock poisoned")]
    StorePoisoned,
}

impl From<serde_json::Error> for EntitlementError {
    fn from(err: serde_json::Error) -> Self {
        EntitlementError::CatalogParse(err.to_string())
    }
}

impl From<std::io::Error> for EntitlementError {
    fn from(err: std::io::Error) -> Self {
        EntitlementError::CatalogIo(err.to_string())
    }
}

impl From<EntitlementError> for McpistError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::NotFound(msg) => McpistError::NotFound(msg),
            EntitlementError::PlanLocked { .. } => McpistError::PlanLocked(err.to_string()),
            EntitlementError::InvalidInput(_)
            | EntitlementError::InvalidCatalog(_)
            | EntitlementError::CatalogParse(_)
            | EntitlementError::AlreadyReviewed { .. }
            | EntitlementError::Config(_) => McpistError::Validation(err.to_string()),
            EntitlementError::CatalogIo(_) | EntitlementError::StorePoisoned => {
                McpistError::Internal(err.to_string())
            }
        }
    }
}

pub type EntitlementResult<T> = Result<T, EntitlementError>;
