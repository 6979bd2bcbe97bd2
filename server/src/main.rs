use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use database::{SqliteSessionStore, SqliteTaskStore};
use orchestrator_server::config::Config;
use orchestrator_server::telemetry::{init_telemetry, log_config_validation, log_startup_info};
use orchestrator_server::{Backends, Orchestrator};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "orchestratord")]
#[command(about = "Work-task orchestration service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// Database URL override
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Listen address override
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory deliverable blobs are stored under
    #[arg(long, env = "OBJECT_STORE_ROOT", default_value = "./data/objects")]
    object_store_root: String,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => {
            info!(config_file, "loading configuration from file");
            Config::from_file(config_file)?
        }
        None => {
            info!("loading configuration from environment");
            Config::from_env()?
        }
    };

    if let Some(ref database_url) = cli.database_url {
        config.database.url = Some(database_url.clone());
    }
    if let Some(ref listen_addr) = cli.listen_addr {
        config.server.listen_addr = listen_addr.clone();
    }
    if let Some(ref log_level) = cli.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli).context("failed to load configuration")?;

    init_telemetry(&config.logging).context("failed to initialize telemetry")?;
    log_config_validation(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "configuration validation failed");
        std::process::exit(1);
    }

    log_startup_info(&config);

    let database_url = config.database_url();
    let task_store = SqliteTaskStore::new(&database_url)
        .await
        .context("failed to open task store")?;
    task_store
        .migrate()
        .await
        .context("failed to run database migrations")?;
    let session_store = SqliteSessionStore::new(task_store.pool().clone());

    let backends = Backends::local(cli.object_store_root.clone());
    let orchestrator = Orchestrator::new(
        Arc::new(task_store),
        Arc::new(session_store),
        backends,
        vec![],
    );

    info!("orchestration service ready");

    let idle_timeout = chrono::Duration::hours(config.orchestration.session_idle_timeout_hours);
    let sweep_orchestrator = orchestrator.clone();
    let sweep_interval = std::time::Duration::from_secs(config.orchestration.progress_cache_ttl_secs);
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            match sweep_orchestrator.expire_idle_sessions(idle_timeout).await {
                Ok(expired) if !expired.is_empty() => {
                    info!(count = expired.len(), "expired idle sessions")
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "idle session sweep failed"),
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                    .expect("failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
        }

        #[cfg(windows)]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl+c");
            info!("received Ctrl+C, shutting down");
        }

        let _ = shutdown_tx.send(());
    });

    let _ = shutdown_rx.await;
    sweeper.abort();
    info!("orchestration service shut down cleanly");
    Ok(())
}
