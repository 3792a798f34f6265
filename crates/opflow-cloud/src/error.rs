//! Provider and state error types

use thiserror::Error;

/// Errors raised by the provider abstraction and the state store
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    #[error("Resource not found in state: {0}")]
    ResourceNotFound(String),

    #[error("Resource already managed: {0}")]
    ResourceAlreadyManaged(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error reported by a concrete provider (HTTP failures, decode errors, ...)
    #[error("{0}")]
    Provider(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
