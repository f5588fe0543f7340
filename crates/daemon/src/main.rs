//! ELOG daemon entry point.
//!
//! Loads configuration, initializes all subsystems, starts the web server
//! and cleanup scheduler, and handles graceful shutdown.

mod scheduler;
mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use elog_core::config::AppConfig;
use elog_core::db::Database;
use elog_core::directory::Directory;
use elog_core::token::TokenIssuer;
use elog_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// ELOG service daemon.
#[derive(Parser, Debug)]
#[command(
    name = "elog-daemon",
    version,
    about = "Electronic logbook import and lookup service"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config =
        AppConfig::load_and_resolve(&args.config).context("failed to load configuration")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("  ELOG Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file   : {}", args.config.display());
    info!("Web listen    : {}", config.server.listen);
    info!("Data dir      : {}", config.server.data_dir.display());
    info!(
        "Directory     : {}",
        config.directory.url.as_deref().unwrap_or("(not configured)")
    );
    info!(
        "Cleanup       : {}",
        if config.cleanup.enabled { "enabled" } else { "disabled" }
    );
    info!("Log level     : {}", log_level);
    info!("========================================");

    std::fs::create_dir_all(&config.server.data_dir)
        .context("failed to create data directory")?;

    // Initialize database
    let db_path = config.server.database_path();
    let db = Database::new(&db_path).context("failed to open database")?;
    db.initialize()
        .context("failed to initialize database schema")?;
    info!("Database initialized at {}", db_path.display());

    let tokens = TokenIssuer::from_config(&config.auth).context("failed to set up token issuer")?;

    let directory =
        Directory::from_config(&config.directory).context("failed to set up directory lookup")?;

    // Start web server in background
    let listen_addr = config.server.listen.clone();
    let web_server = WebServer::new(db, tokens, directory);
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.start(&listen_addr).await {
            error!("Web server error: {}", e);
        }
    });

    // Cooperative cancellation for the scheduler
    let shutdown = Arc::new(Notify::new());

    let scheduler_handle = if config.cleanup.enabled {
        let sched = scheduler::CleanupScheduler::new(&config.cleanup);
        let scheduler_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            sched.run(scheduler_shutdown).await;
        }))
    } else {
        info!("attachment cleanup disabled");
        None
    };

    signals::wait_for_shutdown().await;

    info!("Shutdown signal received, stopping...");

    if let Some(handle) = scheduler_handle {
        shutdown.notify_one();
        match tokio::time::timeout(std::time::Duration::from_secs(10), handle).await {
            Ok(Ok(())) => info!("scheduler stopped gracefully"),
            Ok(Err(e)) => warn!("scheduler task error: {}", e),
            Err(_) => warn!("scheduler did not stop within 10s, forcing shutdown"),
        }
    }

    web_handle.abort();

    info!("ELOG daemon stopped.");
    Ok(())
}
