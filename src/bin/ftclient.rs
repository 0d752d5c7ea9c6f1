//! ftclient
//!
//! Lists or retrieves files from an ftserver.
//!
//! Usage: `ftclient <host> <port> (-l | -g <filename>) <data-port>`

use clap::{ArgGroup, Parser};
use ftlite::{Client, ClientConfig, DataOutcome, FtError, Request};
use tracing_subscriber::{fmt, EnvFilter};

/// ftlite file-transfer client
#[derive(Parser, Debug)]
#[command(name = "ftclient")]
#[command(about = "List or fetch files from an ftserver")]
#[command(version)]
#[command(group(ArgGroup::new("command").required(true).args(["list", "get"])))]
struct Args {
    /// Server host name or address
    host: String,

    /// Server control port
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    port: u16,

    /// List the server's files
    #[arg(short = 'l')]
    list: bool,

    /// Retrieve a file
    #[arg(short = 'g', value_name = "FILENAME")]
    get: Option<String>,

    /// Local port for the data connection
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    data_port: u16,

    /// Directory retrieved files are saved into
    #[arg(long, default_value = ".")]
    download_dir: String,
}

fn main() {
    // Initialize tracing/logging
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
        eprintln!("ftclient: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), FtError> {
    let request = match args.get {
        Some(filename) => Request::Get { filename },
        None => Request::List,
    };

    let config = ClientConfig::builder(&args.host, args.port, request, args.data_port)
        .download_dir(&args.download_dir)
        .build()?;

    match Client::new(config).run()? {
        DataOutcome::Listing(names) => {
            println!("File listing on \"{}:{}\"", args.host, args.port);
            for name in names {
                println!("  {}", name);
            }
        }
        DataOutcome::Saved { path, bytes } => {
            println!("File transfer complete: {} ({} bytes)", path.display(), bytes);
        }
    }
    Ok(())
}
