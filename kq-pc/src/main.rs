//! Playback Controller (kq-pc) - Main entry point
//!
//! Headless display: keeps the player in step with the Queue Store and reads
//! player/viewer events from stdin.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kq_common::config::TomlConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kq_pc::player::{parse_command, ViewerCommand};
use kq_pc::{spawn, EventFollower, HttpQueueClient, LogPlayer, RuntimeConfig};

/// Command-line arguments for kq-pc
#[derive(Parser, Debug)]
#[command(name = "kq-pc")]
#[command(about = "Karaoke playback controller")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "KQ_CONFIG")]
    config: Option<PathBuf>,

    /// Queue Store base URL
    #[arg(short, long, env = "KQ_QS_URL")]
    server_url: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Empty-queue time before an auto-fill, in milliseconds
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Rely on polling alone; do not follow the store's event stream
    #[arg(long)]
    no_live_updates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("kq_pc={0},kq_common={0}", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Karaoke Playback Controller (kq-pc) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut display = config.display.clone();
    if let Some(url) = args.server_url {
        display.server_url = url;
    }
    if let Some(ms) = args.poll_interval_ms {
        display.poll_interval_ms = ms;
    }
    if let Some(ms) = args.idle_timeout_ms {
        display.idle_timeout_ms = ms;
    }
    if args.no_live_updates {
        display.live_updates = false;
    }

    let runtime_config = RuntimeConfig::from(&display);
    // Requests time out after one poll interval, at least 1 s
    let request_timeout = runtime_config.poll_interval.max(Duration::from_secs(1));
    let client = HttpQueueClient::new(&display.server_url, request_timeout)
        .context("Failed to create Queue Store client")?;
    info!("Queue Store: {}", client.base_url());

    let follower = if display.live_updates {
        Some(EventFollower::new(client.base_url()).context("Failed to create event follower")?)
    } else {
        info!("Live updates disabled; polling only");
        None
    };

    let handle = spawn(client, LogPlayer, runtime_config);
    let follower_task = follower.map(|f| f.spawn(handle.notifier()));

    info!("Commands: ended | error <code> | next | open | delete <id> | confirm <id> | cancel | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Some(ViewerCommand::Quit)) => break,
                    Ok(Some(ViewerCommand::Input(input))) => {
                        if !handle.send(input).await {
                            error!("Controller loop is not running");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{}", e),
                },
                Ok(None) => {
                    info!("stdin closed; running until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    if let Some(task) = follower_task {
        task.abort();
    }
    handle.shutdown().await;
    info!("Shutdown complete");
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
