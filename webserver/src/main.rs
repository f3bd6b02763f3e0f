//! WebServer entry point
//!
//! Loads the engine configuration, opens the store snapshot and serves the
//! API and WebSocket feed until Ctrl+C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use engine::config::EngineConfig;
use engine::SalesEngine;
use shared::{logging, ProcessId};
use tokio::signal;

use webserver::{RealWebSocketManager, WebServer, WebServerError, WebServerResult};

#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "HTTP and WebSocket front end for the sales engine")]
struct Args {
    /// Port for HTTP server (browser connections)
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store snapshot, locked for the life of the server and rewritten on every commit
    #[arg(long, default_value = "data/store.json")]
    snapshot: PathBuf,
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    let args = Args::parse();

    ProcessId::init_webserver();
    logging::init_tracing_with_level(Some(args.log_level.as_str()));
    logging::log_startup(ProcessId::current(), &format!("HTTP port {}", args.port));

    let http_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| WebServerError::config(format!("Invalid bind address: {e}")))?;

    let config = EngineConfig::load(args.config.as_deref())?;
    let engine = Arc::new(SalesEngine::open(config, Some(args.snapshot.as_path())).await?);

    let websocket_manager = Arc::new(RealWebSocketManager::new());
    let _cleanup = websocket_manager.start_cleanup_task();

    let webserver = WebServer::new(engine, websocket_manager);
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
            Err(err) => logging::log_error(ProcessId::current(), "Signal handling", &err),
        }
    };

    webserver.run(http_addr, shutdown).await?;

    logging::log_success(ProcessId::current(), "WebServer stopped gracefully");
    Ok(())
}
