//! Error types for Latlab

use std::io;
use thiserror::Error;

/// Result type for Latlab operations
pub type Result<T> = std::result::Result<T, LabError>;

/// Errors that can occur in Latlab
#[derive(Debug, Error)]
pub enum LabError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Query parameter could not be interpreted
    #[error("Invalid value for parameter '{name}': {value:?}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Raw value as received
        value: String,
    },

    /// No route matches the request path
    #[error("No route for {0}")]
    NotFound(String),

    /// Route exists but not for this method
    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    /// Simulated delay was cut short by shutdown
    #[error("Request interrupted during simulated delay")]
    Interrupted,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl LabError {
    /// Build an `InvalidParameter` error
    pub fn invalid_parameter(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
        }
    }

    /// Whether the error was caused by the client rather than the server
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::NotFound(_) | Self::MethodNotAllowed(_)
        )
    }
}
