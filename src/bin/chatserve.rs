//! chatserve
//!
//! Listening side of the two-peer chat.

use std::sync::atomic::Ordering;

use clap::Parser;
use ftlite::chat::{ChatServer, ConsoleInput};
use ftlite::ChatConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// ftlite chat server
#[derive(Parser, Debug)]
#[command(name = "chatserve")]
#[command(about = "Wait for a chat peer and take turns exchanging messages")]
#[command(version)]
struct Args {
    /// Address to bind
    host: String,

    /// Port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    port: u16,

    /// Name shown before outgoing messages
    #[arg(long, default_value = "chatserve")]
    handle: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let server = ChatConfig::new(args.handle)
        .and_then(|config| ChatServer::bind((args.host.as_str(), args.port), config));
    let server = match server {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start chat server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown_flag = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::Relaxed);
        // A blocked console read cannot observe the flag
        std::process::exit(0);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let mut input = ConsoleInput;
    if let Err(e) = server.run(&mut input, |message| println!("{}", message)) {
        tracing::error!("Chat server error: {}", e);
        std::process::exit(1);
    }
}
