//! ftserver
//!
//! Serves a directory listing and file retrieval over the tagged-packet protocol.

use std::sync::atomic::Ordering;

use clap::Parser;
use ftlite::{Server, ServerConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// ftlite file-transfer server
#[derive(Parser, Debug)]
#[command(name = "ftserver")]
#[command(about = "Serve files over split control/data connections")]
#[command(version)]
struct Args {
    /// Control port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory to serve
    #[arg(short, long, default_value = ".")]
    dir: String,

    /// Bytes per CHUNK packet
    #[arg(short, long, default_value = "512")]
    chunk_size: usize,

    /// Read/write timeout in milliseconds (0 disables)
    #[arg(short, long, default_value = "30000")]
    timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ftlite=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    tracing::info!("ftserver v{}", ftlite::VERSION);
    tracing::info!("Serving directory: {}", args.dir);

    // Build config from args
    let config = ServerConfig::builder()
        .listen_addr(format!("{}:{}", args.host, args.port))
        .serve_dir(&args.dir)
        .chunk_size(args.chunk_size)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .build();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown_flag = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown_flag.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
