//! Unified error handling for the trendscope crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors (AI providers, platform strategies) into a
//! single `Error` enum used across module boundaries and mapped onto
//! HTTP status codes by the API layer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trendscope::error::{Error, ErrorCategory};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(error = %err, "transient failure");
//!     } else {
//!         tracing::error!(error = %err, category = ?err.category(), "request failed");
//!     }
//! }
//! ```

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::ai::AiError;
pub use crate::platforms::PlatformError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid caller input
    Validation,
    /// Upstream AI vendor failures
    Ai,
    /// Storage errors
    Storage,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// HTTP status code used when an error of this category reaches a client
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Ai => 502,
            Self::Storage | Self::Config | Self::Other => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Ai => "ai",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the trendscope crate
#[derive(Error, Debug)]
pub enum Error {
    /// AI provider errors
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Platform strategy errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage layer errors carrying context
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Ai(e) => e.is_recoverable(),
            Self::Platform(_) | Self::Validation(_) | Self::Storage(_) | Self::Other(_) => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Ai(e) => match e {
                AiError::ProviderNotFound { .. } => ErrorCategory::Validation,
                AiError::MissingApiKey(_) => ErrorCategory::Config,
                _ => ErrorCategory::Ai,
            },
            Self::Platform(PlatformError::NotFound { .. }) => ErrorCategory::Validation,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a storage-layer failure, keeping its context chain
    pub fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other(context.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
