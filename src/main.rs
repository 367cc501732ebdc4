//! geofront-lite/src/main.rs
//! Process entry point: CLI flags, config load, logging init, accept loop.

use clap::Parser;
use geofront_lite::config::ConfigHandle;
use geofront_lite::connection::handle_connection;
use geofront_lite::logging::init_logging;
use geofront_lite::state::CONN_COUNTER;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "geofront-lite", about = "Lite-mode Minecraft reverse proxy core")]
struct Cli {
    /// Path to the TOML route configuration.
    #[arg(long, default_value = "geofront.toml")]
    config: String,

    /// Address to accept connections on.
    #[arg(long, default_value = "0.0.0.0:25565")]
    bind: String,

    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "geofront_lite=debug".
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let config = match ConfigHandle::load(&cli.config) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            error!(config = %cli.config, error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let listener = TcpListener::bind(&cli.bind).await?;
    info!(bind = %cli.bind, config = %cli.config, "geofront-lite listening");

    spawn_reload_signal_handler(config.clone());

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        continue;
                    }
                };
                let _ = socket.set_nodelay(true);
                let conn_id = CONN_COUNTER.fetch_add(1, Ordering::Relaxed);
                let snapshot = config.snapshot();
                tokio::spawn(async move {
                    handle_connection(conn_id, socket, peer_addr, snapshot).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
fn spawn_reload_signal_handler(config: Arc<ConfigHandle>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(err) => {
                warn!(error = %err, "failed to install SIGHUP handler, config reload unavailable");
                return;
            }
        };
        loop {
            hangup.recv().await;
            match config.reload() {
                Ok(()) => info!("configuration reloaded"),
                Err(err) => error!(error = %err, "configuration reload failed, keeping previous snapshot"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_signal_handler(_config: Arc<ConfigHandle>) {}
