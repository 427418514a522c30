//! Arcana Web - HTTP front door for the reading service.
//!
//! Accepts submissions, hands them to the worker over the framed RPC link,
//! and serves polling reads while the worker grinds through its queue.

use anyhow::Result;
use arcana_web::server;
use arcana_core::{RpcClient, RpcConfig, WebConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "arcana-web")]
#[command(about = "HTTP front door for the Arcana reading service")]
struct Args {
    /// Host to bind to (0.0.0.0 lets phones on the LAN reach it)
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = WebConfig::DEFAULT_PORT)]
    port: u16,

    /// Worker RPC host (often the local end of an SSH tunnel)
    #[arg(long, default_value = "127.0.0.1")]
    rpc_host: String,

    /// Worker RPC port
    #[arg(long, default_value_t = RpcConfig::DEFAULT_PORT)]
    rpc_port: u16,

    /// Timeout for one reading RPC, in seconds
    #[arg(long, default_value_t = RpcConfig::CALL_TIMEOUT.as_secs())]
    rpc_timeout_secs: u64,

    /// Directory of card scan images to serve under /card-scan
    #[arg(long)]
    card_scan_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Starting Arcana front door");

    let rpc = RpcClient::new(
        &args.rpc_host,
        args.rpc_port,
        Duration::from_secs(args.rpc_timeout_secs),
    );
    info!("RPC target: {}", rpc.addr());

    let addr = server::start_server(rpc, args.card_scan_dir, &args.host, args.port).await?;
    info!("Front door running on http://{}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
