//! chatclient
//!
//! Connecting side of the two-peer chat; speaks first.

use clap::Parser;
use ftlite::chat::{converse, ChatEnd, ChatSession, ConsoleInput, LineSource, Turn};
use ftlite::config::validate_handle;
use ftlite::{ChatConfig, FtError};
use tracing_subscriber::{fmt, EnvFilter};

/// ftlite chat client
#[derive(Parser, Debug)]
#[command(name = "chatclient")]
#[command(about = "Connect to a chatserve peer and take turns exchanging messages")]
#[command(version)]
struct Args {
    /// Chat server host name or address
    host: String,

    /// Chat server port
    port: u16,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
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

    if let Err(e) = run(args) {
        eprintln!("chatclient: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), FtError> {
    let mut input = ConsoleInput;
    let handle = loop {
        let handle = input
            .read_line("Please enter a user handle: ")?
            .ok_or_else(|| FtError::Usage("No handle given".to_string()))?;
        match validate_handle(&handle) {
            Ok(()) => break handle,
            Err(e) => eprintln!("error: {}", e),
        }
    };

    let mut session = ChatSession::connect((args.host.as_str(), args.port), ChatConfig::new(handle)?)?;
    println!("Connected to the remote host");

    match converse(&mut session, &mut input, Turn::Local, |message| println!("{}", message))? {
        ChatEnd::LocalQuit => println!("connection closed by client"),
        ChatEnd::PeerQuit => println!("connection closed by server"),
        ChatEnd::PeerClosed => println!("end of data from server"),
    }
    Ok(())
}
