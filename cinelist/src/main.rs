//! cinelist - shared movie watch-list service
//!
//! Resolves free-text `/add` queries against TMDb, registers confident matches
//! in the SQLite catalog, and runs short-lived interactive choices for
//! ambiguous ones. A chat transport drives it over HTTP and reads outgoing
//! messages from the SSE stream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cinelist_common::config::{load_config, resolve_config_path};
use cinelist_common::events::EventBus;
use cinelist_common::time::TokioClock;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinelist::db::SqliteCatalogStore;
use cinelist::services::resolution::SWEEP_INTERVAL;
use cinelist::services::{EventBusSurface, ResolutionService, TmdbClient};
use cinelist::AppState;

/// Command-line arguments for cinelist
#[derive(Parser, Debug)]
#[command(name = "cinelist")]
#[command(about = "Shared movie watch-list service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite catalog file, overrides the config file
    #[arg(long)]
    database_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinelist=info,cinelist_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting cinelist");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Config: file, env, then flags
    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(path) = args.database_path {
        config.database_path = path;
    }
    config.validate().context("Invalid configuration")?;

    info!("Database: {}", config.database_path.display());
    let pool = cinelist_common::db::init_database(&config.database_path)
        .await
        .context("Failed to open catalog database")?;
    let store = Arc::new(SqliteCatalogStore::new(pool));

    let tmdb = TmdbClient::from_config(&config).context("Failed to configure TMDb client")?;
    if let Err(e) = tmdb.check_credentials().await {
        warn!(error = %e, "TMDb credential check failed, continuing");
    }

    let event_bus = EventBus::new(256);
    let surface = Arc::new(EventBusSurface::new(event_bus.clone()));

    let service = ResolutionService::new(
        &config,
        Arc::new(tmdb),
        store.clone(),
        surface,
        Arc::new(TokioClock),
    );

    let shutdown = CancellationToken::new();
    let sweeper = service.spawn_sweeper(SWEEP_INTERVAL, shutdown.clone());

    let state = AppState::new(service, store, event_bus);
    let app = cinelist::build_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("Listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Selection sweeper ended abnormally");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
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
