//! Queue Store (kq-qs) - Main entry point
//!
//! Serves the karaoke queue over HTTP: submissions from the form, snapshots
//! and advance/delete/auto-fill requests from the display.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kq_common::config::{queue_file_path, resolve_root_folder, TomlConfig};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kq_qs::metadata::{NoopTitleLookup, OEmbedClient, TitleLookup};
use kq_qs::{create_router, AppState, FallbackCatalog, QueueStore};

/// Command-line arguments for kq-qs
#[derive(Parser, Debug)]
#[command(name = "kq-qs")]
#[command(about = "Karaoke queue store and HTTP API")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "KQ_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the queue file (also KQ_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "KQ_QS_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "KQ_QS_BIND")]
    bind: Option<String>,

    /// Skip title lookups; titles fall back to the media id
    #[arg(long)]
    no_metadata: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("kq_qs={0},kq_common={0},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting Karaoke Queue Store (kq-qs) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;

    let queue_path = queue_file_path(&root_folder);
    info!("Queue file: {}", queue_path.display());

    let server = &config.server;
    let lookup: Arc<dyn TitleLookup> = if args.no_metadata || !server.metadata_lookup {
        info!("Title lookups disabled");
        Arc::new(NoopTitleLookup)
    } else {
        Arc::new(
            OEmbedClient::new(server.metadata_timeout())
                .context("Failed to initialize title lookup client")?,
        )
    };

    let store = QueueStore::new(queue_path).with_title_lookup(lookup, server.metadata_timeout());
    info!("Queue holds {} entries", store.count().await);

    let catalog = FallbackCatalog::from_config(&config.auto_fill);
    info!(
        "Fallback catalog: {} links, auto-fill submitter '{}'",
        catalog.len(),
        config.auto_fill.submitter_name
    );

    let state = AppState::new(store, catalog, config.auto_fill.submitter_name.clone());
    let app = create_router(state);

    let bind = args.bind.unwrap_or_else(|| server.bind.clone());
    let port = args.port.unwrap_or(server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("kq-qs listening on http://{}", addr);
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
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
