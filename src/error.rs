use serde_json::json;
use thiserror::Error;

/// Provider error types
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Free-text query could not be parsed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// No registered provider handles the capability/operation pair
    #[error("Unsupported operation '{operation}' for capability '{capability}'")]
    Unsupported { capability: String, operation: String },

    /// Caller scopes do not cover the requested resource
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Conflicting registration or duplicate record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::NotFound(_) => "NOT_FOUND",
            ProviderError::Validation(_) => "VALIDATION_ERROR",
            ProviderError::InvalidQuery(_) => "INVALID_QUERY",
            ProviderError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            ProviderError::Unsupported { .. } => "UNSUPPORTED_OPERATION",
            ProviderError::AccessDenied(_) => "ACCESS_DENIED",
            ProviderError::Conflict(_) => "CONFLICT",
            ProviderError::Configuration(_) => "CONFIGURATION_ERROR",
            ProviderError::Serialization(_) => "SERIALIZATION_ERROR",
            ProviderError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Shorthand for an unsupported capability/operation pair
    pub fn unsupported(capability: impl ToString, operation: impl Into<String>) -> Self {
        ProviderError::Unsupported {
            capability: capability.to_string(),
            operation: operation.into(),
        }
    }

    /// JSON error envelope returned through the plugin host
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "code": self.error_code(),
            "message": self.to_string(),
        })
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for ProviderError {
    fn from(err: validator::ValidationErrors) -> Self {
        ProviderError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for ProviderError {
    fn from(err: config::ConfigError) -> Self {
        ProviderError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProviderError>;
