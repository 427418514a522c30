//! Arcana Worker - GPU-side reading worker.
//!
//! Hosts the framed RPC endpoint the front door dials. Loads the card deck
//! at startup, drives the Ollama backend for generation, and serves one
//! reading per connection.

mod deck;
mod engine;
mod llm;
mod prompt;

use anyhow::{Context, Result};
use arcana_core::{RpcConfig, RpcServer};
use clap::Parser;
use deck::Deck;
use engine::ReadingEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "arcana-worker")]
#[command(about = "GPU-side reading worker for the Arcana service")]
struct Args {
    /// Host to bind to. The front door usually dials through an SSH
    /// tunnel, so loopback is the safe default.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = RpcConfig::DEFAULT_PORT)]
    port: u16,

    /// Directory holding the card meaning files (0.json .. 77.json)
    #[arg(long, default_value = "card-meanings")]
    deck_dir: PathBuf,

    /// Ollama base URL (default http://127.0.0.1:11434)
    #[arg(long)]
    ollama_url: Option<String>,

    /// Model tag to generate with (default qwen2.5:7b-instruct)
    #[arg(long)]
    model: Option<String>,

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

    info!("Starting Arcana worker");

    let deck = Deck::load(&args.deck_dir)
        .with_context(|| format!("loading deck from {}", args.deck_dir.display()))?;
    info!("Deck loaded: {} cards", deck.len());

    let engine = Arc::new(ReadingEngine::new(deck, args.ollama_url, args.model));

    let mut handle = RpcServer::start(&args.host, args.port, engine).await?;
    info!("Worker serving readings on {}", handle.addr());

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    handle.shutdown();

    Ok(())
}
