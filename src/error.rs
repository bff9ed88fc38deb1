//! Error types for Gatewarden.
//!
//! Timeouts are deliberately absent here: a missed deadline resolves a wait
//! with [`WaitOutcome::TimedOut`](crate::correlation::WaitOutcome), it does
//! not raise an error.

use crate::correlation::CorrelationKey;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Catalog {category} is empty")]
    EmptyCatalog { category: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the platform gateway.
///
/// Every variant is recoverable from the workflow's point of view: a failed
/// platform call is reported and the flow moves on.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Permission denied for {action}: {reason}")]
    PermissionDenied { action: String, reason: String },

    #[error("{entity} not found: {name}")]
    NotFound { entity: String, name: String },

    #[error("Failed to send {what}: {reason}")]
    SendFailed { what: String, reason: String },

    #[error("Platform unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Correlation registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Waiter already registered for {key}")]
    DuplicateKey { key: CorrelationKey },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
