//! Configuration management for trendscope
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Every section has defaults, so a TOML file only
//! needs to name the values it overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Names of the AI providers the service knows how to build
pub const KNOWN_PROVIDERS: &[&str] = &["anthropic", "openai"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// AI provider configuration
    pub ai: AiConfig,

    /// Analysis pipeline configuration
    pub analysis: AnalysisConfig,

    /// Outgoing webhook configuration
    pub webhook: WebhookSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable permissive CORS
    pub enable_cors: bool,

    /// Enable per-request tracing
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/trendscope.db"),
        }
    }
}

/// AI provider selection and per-vendor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Provider used when a request does not name one
    pub default_provider: String,

    pub anthropic: AiProviderConfig,

    pub openai: AiProviderConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            default_provider: "anthropic".to_string(),
            anthropic: AiProviderConfig::anthropic(),
            openai: AiProviderConfig::openai(),
        }
    }
}

/// Settings for one AI vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    /// API key; the provider is not registered without one
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// API base URL (without the version path)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl AiProviderConfig {
    /// Defaults for the Anthropic messages API
    pub fn anthropic() -> Self {
        Self {
            api_key: None,
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            base_url: "https://api.anthropic.com".to_string(),
            timeout_secs: 120,
        }
    }

    /// Defaults for the OpenAI chat completions API
    pub fn openai() -> Self {
        Self {
            api_key: None,
            model: "gpt-4-turbo-preview".to_string(),
            max_tokens: 4096,
            base_url: "https://api.openai.com".to_string(),
            timeout_secs: 120,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// The API key, ignoring a blank value
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Point the provider at another endpoint (used against mock servers)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Request timeout as Duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn overlay_env(mut self, prefix: &str) -> Self {
        self.api_key = std::env::var(format!("{prefix}_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        self.model = std::env::var(format!("{prefix}_MODEL")).unwrap_or(self.model);
        self.max_tokens = env_parse(&format!("{prefix}_MAX_TOKENS"), self.max_tokens);
        self.base_url = std::env::var(format!("{prefix}_BASE_URL")).unwrap_or(self.base_url);
        self.timeout_secs = env_parse(&format!("{prefix}_TIMEOUT"), self.timeout_secs);
        self
    }
}

/// Analysis pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Reuse recent analyses of the same topic
    pub cache_enabled: bool,

    /// How old (seconds) a stored analysis may be and still be served
    pub cache_ttl_secs: u64,

    /// Analyses older than this many days are purged
    pub retention_days: u32,

    /// Trending topics fetched per platform
    pub max_trends_per_platform: usize,

    /// Posts fetched per platform for the requested topic
    pub max_posts_per_trend: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_secs: 3600,
            retention_days: 90,
            max_trends_per_platform: 10,
            max_posts_per_trend: 20,
        }
    }
}

impl AnalysisConfig {
    /// Cache window as a chrono duration
    pub fn cache_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }
}

/// Outgoing webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Parse an environment variable, keeping `default` when unset or malformed
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port: u16 = env_parse("PORT", defaults.server.bind_address.port());
        let bind_address = match std::env::var("TRENDSCOPE_BIND") {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("Invalid TRENDSCOPE_BIND address: {addr}"))?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], port)),
        };

        let sqlite_path = std::env::var("TRENDSCOPE_SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database.sqlite_path);

        let default_provider = std::env::var("AI_DEFAULT_PROVIDER")
            .unwrap_or(defaults.ai.default_provider)
            .to_lowercase();

        let cache_enabled = std::env::var("CACHE_ENABLED")
            .map(|v| v.trim() != "false")
            .unwrap_or(defaults.analysis.cache_enabled);

        let log_level =
            std::env::var("TRENDSCOPE_LOG_LEVEL").unwrap_or(defaults.logging.level);
        let log_format =
            std::env::var("TRENDSCOPE_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            server: ServerConfig {
                bind_address,
                enable_cors: env_parse("TRENDSCOPE_ENABLE_CORS", defaults.server.enable_cors),
                enable_request_logging: env_parse(
                    "TRENDSCOPE_REQUEST_LOGGING",
                    defaults.server.enable_request_logging,
                ),
            },
            database: DatabaseConfig { sqlite_path },
            ai: AiConfig {
                default_provider,
                anthropic: defaults.ai.anthropic.overlay_env("ANTHROPIC"),
                openai: defaults.ai.openai.overlay_env("OPENAI"),
            },
            analysis: AnalysisConfig {
                cache_enabled,
                cache_ttl_secs: env_parse("ANALYSIS_CACHE_TTL", defaults.analysis.cache_ttl_secs),
                retention_days: env_parse(
                    "ANALYSIS_RETENTION_DAYS",
                    defaults.analysis.retention_days,
                ),
                max_trends_per_platform: env_parse(
                    "MAX_TRENDS_PER_PLATFORM",
                    defaults.analysis.max_trends_per_platform,
                ),
                max_posts_per_trend: env_parse(
                    "MAX_POSTS_PER_TREND",
                    defaults.analysis.max_posts_per_trend,
                ),
            },
            webhook: WebhookSettings {
                timeout_secs: env_parse("WEBHOOK_TIMEOUT", defaults.webhook.timeout_secs),
                max_retries: env_parse("WEBHOOK_MAX_RETRIES", defaults.webhook.max_retries),
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !KNOWN_PROVIDERS.contains(&self.ai.default_provider.as_str()) {
            anyhow::bail!(
                "default_provider must be one of {}, got '{}'",
                KNOWN_PROVIDERS.join(", "),
                self.ai.default_provider
            );
        }

        for (name, provider) in [("anthropic", &self.ai.anthropic), ("openai", &self.ai.openai)] {
            if provider.max_tokens == 0 {
                anyhow::bail!("{name}.max_tokens must be greater than 0");
            }
            if provider.timeout_secs == 0 {
                anyhow::bail!("{name}.timeout_secs must be greater than 0");
            }
            if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://")
            {
                anyhow::bail!("{name}.base_url must start with http:// or https://");
            }
        }

        if self.analysis.cache_enabled && self.analysis.cache_ttl_secs == 0 {
            anyhow::bail!("cache_ttl_secs must be greater than 0 when caching is enabled");
        }

        if self.analysis.max_trends_per_platform == 0 {
            anyhow::bail!("max_trends_per_platform must be greater than 0");
        }

        if self.analysis.max_posts_per_trend == 0 {
            anyhow::bail!("max_posts_per_trend must be greater than 0");
        }

        if self.analysis.retention_days == 0 {
            anyhow::bail!("retention_days must be greater than 0");
        }

        if self.webhook.timeout_secs == 0 {
            anyhow::bail!("webhook timeout_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Providers that have an API key configured
    pub fn configured_providers(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.ai.anthropic.api_key().is_some() {
            names.push("anthropic");
        }
        if self.ai.openai.api_key().is_some() {
            names.push("openai");
        }
        names
    }
}
