#![forbid(unsafe_code)]

//! `email-tracker`: read-receipt tracking server binary.
//!
//! Bootstraps configuration, opens the task store, builds the notifier,
//! and serves the pixel, submit, and status endpoints until shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use email_tracker::config::GlobalConfig;
use email_tracker::http::{self, AppState};
use email_tracker::notify;
use email_tracker::persistence::{db, store::SqliteStore, Database};
use email_tracker::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "email-tracker", about = "Email read-receipt tracking server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured HTTP port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("email-tracker server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    config.load_credentials().await?;
    info!(provider = ?config.notifier.provider, "configuration loaded");

    // ── Initialize database ─────────────────────────────
    let pool = Arc::new(db::connect(&config.db_path).await?);
    let store: Arc<dyn Database> = Arc::new(SqliteStore::new(pool));
    info!(path = %config.db_path.display(), "database connected");

    // ── Build shared application state ──────────────────
    let notifier = notify::from_config(&config.notifier)?;
    let state = Arc::new(AppState::new(&config, store, notifier)?);

    // ── Start HTTP server ───────────────────────────────
    let bind = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;

    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(err) = http::serve(listener, state, server_ct).await {
            error!(%err, "http server failed");
        }
    });

    info!(%bind, link_prefix = config.link_prefix(), "email-tracker ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = server_handle.await;
    info!("email-tracker shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
