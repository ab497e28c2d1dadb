//! HTTP server implementation
//!
//! Wires configuration into storage, providers and the analyzer, then
//! serves the router built in [`super::handlers`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ai::ProviderRegistry;
use crate::config::{Config, ServerConfig};
use crate::notifications::{WebhookConfig, WebhookNotifier};
use crate::platforms::PlatformRegistry;
use crate::services::TrendsAnalyzer;
use crate::storage::TrendStore;

use super::handlers::create_router;

/// Interval between retention sweeps
const PURGE_INTERVAL_SECS: u64 = 60 * 60;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Analysis pipeline and its collaborators
    pub analyzer: TrendsAnalyzer,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(analyzer: TrendsAnalyzer) -> Self {
        Self {
            analyzer,
            start_time: Instant::now(),
        }
    }

    /// Build every component from configuration
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let store = Arc::new(
            TrendStore::new(&config.database.sqlite_path)
                .map_err(|e| ServerError::InitError(format!("{e:#}")))?,
        );

        let providers = ProviderRegistry::from_config(&config.ai)
            .map_err(|e| ServerError::InitError(e.to_string()))?;

        let notifier = WebhookNotifier::new(WebhookConfig::from(&config.webhook))
            .map_err(|e| ServerError::InitError(e.to_string()))?;

        let analyzer = TrendsAnalyzer::new(
            store,
            PlatformRegistry::with_defaults(),
            providers,
            notifier,
            config.analysis.clone(),
        );

        Ok(Self::new(analyzer))
    }
}

// ============================================================================
// API Server
// ============================================================================

/// Main HTTP server
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a server from the full configuration
    pub fn new(config: &Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let state = AppState::from_config(config)?;
        Ok(Self::with_state(config.server.clone(), state))
    }

    /// Create a server around an already assembled state
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting trendscope API on {}", addr);

        self.start_background_tasks();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("trendscope API shutdown complete");
        Ok(())
    }

    /// Periodically drop analyses past the retention window
    fn start_background_tasks(&self) {
        let analyzer = self.state.analyzer.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(PURGE_INTERVAL_SECS));
            loop {
                interval.tick().await;
                if let Err(e) = analyzer.purge_expired() {
                    tracing::warn!(error = %e, "Retention sweep failed");
                }
            }
        });

        tracing::info!("Background tasks started");
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        let providers = self.state.analyzer.providers();
        ServerInfo {
            bind_address: self.config.bind_address,
            providers: providers.available(),
            default_provider: providers.default_provider().to_string(),
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub providers: Vec<String>,
    pub default_provider: String,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        let providers = if self.providers.is_empty() {
            "none".to_string()
        } else {
            self.providers.join(", ")
        };

        format!(
            "trendscope API\n\
             {:-<40}\n\
             Bind Address: {}\n\
             AI Providers: {}\n\
             Default Provider: {}\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            providers,
            self.default_provider,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Initialization error
    InitError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::InitError(msg) => write!(f, "Initialization error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.database.sqlite_path = dir.path().join("trends.db");
        config
    }

    #[test]
    fn test_server_creation_without_keys() {
        let dir = TempDir::new().unwrap();
        let server = ApiServer::new(&config_in(&dir)).unwrap();
        let info = server.info();

        assert!(info.providers.is_empty());
        assert_eq!(info.default_provider, "anthropic");
        assert!(info.cors_enabled);
        assert!(info.display().contains("AI Providers: none"));
    }

    #[test]
    fn test_server_registers_configured_provider() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.ai.openai = config.ai.openai.with_api_key("sk-test");
        config.ai.default_provider = "openai".to_string();

        let server = ApiServer::new(&config).unwrap();
        assert_eq!(server.info().providers, vec!["openai"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.ai.default_provider = "gemini".to_string();

        let err = ApiServer::new(&config).err().unwrap();
        assert!(matches!(err, ServerError::ConfigError(_)));
    }
}
