//! Error types for provisioning operations

use thiserror::Error;

use crate::domain::NetworkError;
use crate::state_machine::TransitionError;

/// Errors that can occur while provisioning
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A required service-principal credential is not set
    #[error("Missing required credential: {0}")]
    MissingCredential(String),

    /// A required secret is not available from the secret source
    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network topology value failed validation
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Malformed ARM resource identifier
    #[error("Invalid resource id: {0}")]
    InvalidResourceId(String),

    /// Token acquisition failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The control plane rejected the request
    #[error("ARM API returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A long-running operation reached a non-success terminal state
    #[error("Operation on {resource} ended in state {status}: {message}")]
    OperationFailed {
        resource: String,
        status: String,
        message: String,
    },

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Pipeline stage issued out of order
    #[error("Pipeline transition error: {0}")]
    Transition(#[from] TransitionError),
}

/// Result type for provisioning operations
pub type ProvisionResult<T> = Result<T, ProvisionError>;

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ProvisionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProvisionError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProvisionError::Deserialization(err.to_string())
        } else {
            ProvisionError::Http(err.to_string())
        }
    }
}
