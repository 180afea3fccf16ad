//! Question Verification Dashboard API (qvd-api) - Main entry point
//!
//! Loads configuration (CLI > environment > TOML file > defaults), opens the
//! SQLite database, wires the Gemini explanation client and the optional S3
//! image store into the router, and serves until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qvd_api::services::{ExplanationGenerator, GeminiClient, ImageStore, S3ImageStore};
use qvd_api::{build_router, AppState};
use qvd_common::config::{load_toml_config, ConfigOverrides, ServiceConfig};

/// Command-line arguments for qvd-api
#[derive(Parser, Debug)]
#[command(name = "qvd-api")]
#[command(about = "Question verification dashboard backend")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "QVD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "QVD_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "QVD_PORT")]
    port: Option<u16>,

    /// SQLite database URL
    #[arg(long, env = "QVD_DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL")]
    gemini_model: Option<String>,

    /// Bucket for uploaded question images; uploads are disabled without one
    #[arg(long, env = "S3_BUCKET")]
    s3_bucket: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    aws_region: Option<String>,

    #[arg(long, env = "CLOUDFRONT_DOMAIN")]
    cloudfront_domain: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "QVD_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database_url: self.database_url.clone(),
            gemini_api_key: self.gemini_api_key.clone(),
            gemini_model: self.gemini_model.clone(),
            s3_bucket: self.s3_bucket.clone(),
            aws_region: self.aws_region.clone(),
            cloudfront_domain: self.cloudfront_domain.clone(),
            aws_access_key_id: self.aws_access_key_id.clone(),
            aws_secret_access_key: self.aws_secret_access_key.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let config = ServiceConfig::resolve(args.overrides(), toml_config)
        .context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting qvd-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db = qvd_common::db::init_database(&config.database_url, config.max_connections)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready: {}", config.database_url);

    let gemini = GeminiClient::new(&config.gemini).context("Failed to build Gemini client")?;
    info!(model = %config.gemini.model, "Explanation generator: Gemini");
    let generator: Arc<dyn ExplanationGenerator> = Arc::new(gemini);

    let image_store: Option<Arc<dyn ImageStore>> = match &config.storage {
        Some(storage) => {
            info!(bucket = %storage.bucket, "Image uploads go to S3");
            Some(Arc::new(S3ImageStore::new(storage).await))
        }
        None => {
            warn!("No S3 bucket configured; image uploads are disabled");
            None
        }
    };

    let state = AppState::new(db, generator, image_store, config.cache);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
