//! Webhook delivery
//!
//! Posts JSON payloads to caller-supplied URLs.
//!
//! # Example
//!
//! ```rust,ignore
//! use trendscope::notifications::{WebhookConfig, WebhookNotifier};
//!
//! let notifier = WebhookNotifier::new(WebhookConfig::default().with_max_retries(2))?;
//! let status = notifier.notify("https://hooks.example.com/trends", &payload).await;
//! ```

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{DeliveryStatus, WebhookError, WebhookResult};
use crate::config::WebhookSettings;
use crate::metrics;

/// Webhook delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First backoff delay in milliseconds; doubles on every retry
    pub retry_base_delay_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 0,
            retry_base_delay_ms: 1000,
        }
    }
}

impl From<&WebhookSettings> for WebhookConfig {
    fn from(settings: &WebhookSettings) -> Self {
        Self {
            timeout_secs: settings.timeout_secs,
            max_retries: settings.max_retries,
            ..Self::default()
        }
    }
}

impl WebhookConfig {
    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first backoff delay
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay_ms = delay.as_millis() as u64;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        // base, 2*base, 4*base...
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(1u64 << (attempt - 1).min(16)))
    }
}

/// Check that a webhook target is an absolute http(s) URL with a host
pub fn validate_webhook_url(raw: &str) -> WebhookResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| WebhookError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(WebhookError::InvalidUrl(format!(
            "{raw}: scheme must be http or https"
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(WebhookError::InvalidUrl(format!("{raw}: missing host")));
    }

    Ok(url)
}

/// Sends JSON payloads with bounded retry
///
/// Client errors (4xx) are never retried.
#[derive(Clone)]
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> WebhookResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Deliver `payload` to `url`, reporting the outcome instead of failing
    pub async fn notify(&self, url: &str, payload: &serde_json::Value) -> DeliveryStatus {
        let target = match validate_webhook_url(url) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Refusing to call webhook");
                metrics::record_webhook_delivery(false);
                return DeliveryStatus::failure(url, 0, e.to_string());
            }
        };

        let (attempts, result) = self.send_with_retry(target, payload).await;
        metrics::record_webhook_delivery(result.is_ok());

        match result {
            Ok(()) => DeliveryStatus::success(url, attempts),
            Err(e) => {
                tracing::error!(url = %url, attempts, error = %e, "Failed to deliver webhook");
                DeliveryStatus::failure(url, attempts, e.to_string())
            }
        }
    }

    /// Send the request with retry logic, returning the number of attempts made
    async fn send_with_retry(
        &self,
        url: Url,
        payload: &serde_json::Value,
    ) -> (u32, WebhookResult<()>) {
        let mut last_error = None;
        let mut attempts = 0;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.config.backoff(attempt)).await;
                tracing::debug!(
                    "Retrying webhook request (attempt {}/{})",
                    attempt + 1,
                    self.config.max_retries + 1
                );
            }
            attempts += 1;

            // reqwest sets Content-Type: application/json
            match self.client.post(url.clone()).json(payload).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::info!(url = %url, status = %status, "Webhook delivered");
                        return (attempts, Ok(()));
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unable to read response body".to_string());
                    let err = WebhookError::Status {
                        status: status.as_u16(),
                        body,
                    };
                    let retry = err.is_recoverable();
                    last_error = Some(err);

                    if !retry {
                        break;
                    }
                }
                Err(e) => {
                    last_error = Some(WebhookError::Http(e));
                }
            }
        }

        let err = last_error.unwrap_or_else(|| WebhookError::Status {
            status: 0,
            body: "no attempt made".to_string(),
        });
        (attempts, Err(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_webhook_url() {
        assert!(validate_webhook_url("https://example.com/webhook").is_ok());
        assert!(validate_webhook_url("http://localhost:8080/hook").is_ok());

        assert!(validate_webhook_url("").is_err());
        assert!(validate_webhook_url("example.com/webhook").is_err());
        assert!(validate_webhook_url("ftp://example.com/file").is_err());
        assert!(validate_webhook_url("not a url").is_err());
    }

    #[test]
    fn test_config_from_settings() {
        let settings = WebhookSettings {
            timeout_secs: 5,
            max_retries: 2,
        };
        let config = WebhookConfig::from(&settings);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_base_delay_ms, 1000);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = WebhookConfig::default().with_retry_base_delay(Duration::from_millis(10));
        assert_eq!(config.backoff(1), Duration::from_millis(10));
        assert_eq!(config.backoff(2), Duration::from_millis(20));
        assert_eq!(config.backoff(3), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_notify_rejects_invalid_url_without_sending() {
        let notifier = WebhookNotifier::new(WebhookConfig::default()).unwrap();
        let status = notifier
            .notify("javascript:alert(1)", &serde_json::json!({}))
            .await;
        assert!(!status.success);
        assert_eq!(status.attempts, 0);
    }
}
