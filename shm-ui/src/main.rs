//! Soil Health Monitoring (shm-ui) - Main entry point
//!
//! Loads configuration and the soil classifier, then serves the web UI.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use shm_common::config::{ConfigOverrides, TomlConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shm_ui::api::buildinfo::BUILD_INFO;
use shm_ui::classifier::OnnxClassifier;
use shm_ui::session::spawn_session_sweeper;
use shm_ui::{build_router, AppState};

/// Command-line arguments for shm-ui
#[derive(Parser, Debug)]
#[command(name = "shm-ui")]
#[command(about = "Soil Health Monitoring web service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SHM_PORT")]
    port: Option<u16>,

    /// Interface to bind to
    #[arg(short, long, env = "SHM_BIND_ADDRESS")]
    bind: Option<String>,

    /// ONNX soil classifier
    #[arg(short, long, env = "SHM_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// Config file (default: <config dir>/shm/shm-ui.toml)
    #[arg(short, long, env = "SHM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;
    config.apply_overrides(ConfigOverrides {
        bind_address: args.bind,
        port: args.port,
        model_path: args.model_path,
        log_level: args.log_level,
    });
    config.validate().context("Invalid configuration")?;

    // Initialize tracing
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("shm_ui={level},shm_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(build = %BUILD_INFO, "shm-ui starting");
    if let Some(path) = args.config.or_else(shm_common::config::default_config_path) {
        info!("Config file: {}", path.display());
    }

    // Classifier load failure is fatal: there is no degraded mode
    let classifier = OnnxClassifier::load(&config.model_path, config.classifier.input_size)
        .with_context(|| format!("Failed to load classifier {}", config.model_path.display()))?;
    info!(
        "✓ Loaded classifier {} ({} outputs)",
        config.model_path.display(),
        shm_ui::classifier::Classifier::output_len(&classifier)
    );

    let state = AppState::new(&config, Arc::new(classifier))
        .context("Classifier does not match the configured labels")?;
    let policy = state.predictor.policy();
    info!(
        enabled = policy.enabled,
        min_confidence = policy.min_confidence,
        "Acceptance policy"
    );

    spawn_session_sweeper(
        state.sessions.clone(),
        Duration::from_secs(config.session_ttl_secs),
    );

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("shm-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
