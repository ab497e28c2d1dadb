//! Outgoing notifications
//!
//! Analysis results can be pushed to a caller-supplied webhook. Delivery is
//! best effort: failures are reported through [`DeliveryStatus`] and logged,
//! never propagated into the request that produced the payload.

pub mod webhook;

use serde::{Deserialize, Serialize};

pub use webhook::{validate_webhook_url, WebhookConfig, WebhookNotifier};

/// Result type for webhook operations
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Errors that can occur while delivering a webhook
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// URL is malformed or not http(s)
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl WebhookError {
    /// Network failures and 5xx answers are worth another attempt
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidUrl(_) => false,
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }
}

/// Outcome of a delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Whether the payload was accepted
    pub success: bool,
    /// Target URL
    pub url: String,
    /// Number of requests sent
    pub attempts: u32,
    /// Failure description
    pub message: Option<String>,
    /// Timestamp of the last attempt
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    pub fn success(url: impl Into<String>, attempts: u32) -> Self {
        Self {
            success: true,
            url: url.into(),
            attempts,
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn failure(url: impl Into<String>, attempts: u32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            attempts,
            message: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable() {
        assert!(!WebhookError::InvalidUrl("ftp://x".to_string()).is_recoverable());
        assert!(WebhookError::Status {
            status: 503,
            body: String::new()
        }
        .is_recoverable());
        assert!(!WebhookError::Status {
            status: 404,
            body: String::new()
        }
        .is_recoverable());
        assert!(!WebhookError::Status {
            status: 429,
            body: String::new()
        }
        .is_recoverable());
    }

    #[test]
    fn test_delivery_status() {
        let ok = DeliveryStatus::success("https://example.com/hook", 1);
        assert!(ok.success);
        assert!(ok.message.is_none());

        let failed = DeliveryStatus::failure("https://example.com/hook", 3, "HTTP 500: oops");
        assert!(!failed.success);
        assert_eq!(failed.attempts, 3);
    }
}
