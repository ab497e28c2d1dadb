use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trendscope::api::{ApiServer, AppState};
use trendscope::config::Config;
use trendscope::services::AnalyzeRequest;
use trendscope::PlatformType;

#[derive(Parser)]
#[command(
    name = "trendscope",
    version,
    about = "Social media trends analyzer with AI-backed insights",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Host to bind, overrides configuration
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overrides configuration
        #[arg(short, long)]
        port: Option<u16>,

        /// Disable CORS headers
        #[arg(long, default_value = "false")]
        no_cors: bool,
    },

    /// Run one analysis and print the JSON result
    Analyze {
        /// Topic to analyze
        topic: String,

        /// Comma-separated platforms
        #[arg(short, long, default_value = "twitter,instagram")]
        platforms: String,

        /// AI provider to use
        #[arg(long)]
        provider: Option<String>,

        /// Ignore cached analyses
        #[arg(long, default_value = "false")]
        no_cache: bool,
    },

    /// Delete analyses older than the retention window
    Purge,

    /// Validate configuration and print a summary
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = trendscope::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => {
            tracing::info!(host = ?host, port = ?port, no_cors = %no_cors, "Starting serve command");
            serve(config, host, port, no_cors).await?;
        }

        Commands::Analyze {
            topic,
            platforms,
            provider,
            no_cache,
        } => {
            tracing::info!(
                topic = %topic,
                platforms = %platforms,
                provider = ?provider,
                "Starting analyze command"
            );
            analyze(config, topic, platforms, provider, no_cache).await?;
        }

        Commands::Purge => {
            config.validate()?;
            let state = AppState::from_config(&config)?;
            let deleted = state.analyzer.purge_expired()?;
            println!(
                "Deleted {deleted} analyses older than {} days",
                config.analysis.retention_days
            );
        }

        Commands::CheckConfig => check_config(&config)?,
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("trendscope=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("trendscope={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>, no_cors: bool) -> Result<()> {
    if host.is_some() || port.is_some() {
        let host = host.unwrap_or_else(|| config.server.bind_address.ip().to_string());
        let port = port.unwrap_or(config.server.bind_address.port());
        config.server.bind_address = format!("{host}:{port}")
            .parse()
            .context("Invalid bind address")?;
    }
    if no_cors {
        config.server.enable_cors = false;
    }

    let server = ApiServer::new(&config).context("Failed to create API server")?;

    println!("{}", server.info().display());
    println!();
    println!("Listening on http://{}", config.server.bind_address);
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Server stopped.");
    Ok(())
}

async fn analyze(
    config: Config,
    topic: String,
    platforms: String,
    provider: Option<String>,
    no_cache: bool,
) -> Result<()> {
    config.validate()?;

    let platforms = platforms
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|name| {
            PlatformType::parse(name).with_context(|| format!("Unknown platform '{}'", name.trim()))
        })
        .collect::<Result<Vec<_>>>()?;

    let state = AppState::from_config(&config)?;
    let mut request = AnalyzeRequest::new(topic, platforms).with_cache(!no_cache);
    if let Some(provider) = provider {
        request = request.with_provider(provider);
    }

    let response = state.analyzer.analyze_trends(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    config.validate()?;

    let providers = config.configured_providers();
    println!("Configuration OK");
    println!("  Bind Address: {}", config.server.bind_address);
    println!("  SQLite: {}", config.database.sqlite_path.display());
    println!("  Default Provider: {}", config.ai.default_provider);
    println!(
        "  Configured Providers: {}",
        if providers.is_empty() {
            "none".to_string()
        } else {
            providers.join(", ")
        }
    );
    println!(
        "  Cache: {} ({}s)",
        if config.analysis.cache_enabled { "enabled" } else { "disabled" },
        config.analysis.cache_ttl_secs
    );
    println!("  Retention: {} days", config.analysis.retention_days);

    if !providers.contains(&config.ai.default_provider.as_str()) {
        println!(
            "  Warning: default provider '{}' has no API key",
            config.ai.default_provider
        );
    }
    Ok(())
}
