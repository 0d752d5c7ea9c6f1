//! Network Module
//!
//! TCP server and client for the file-transfer service.
//!
//! ## Architecture
//! - Single acceptor loop; one control session serviced at a time
//! - Active mode: the client listens, the server opens the data connection
//! - Per-session failures are logged and never stop the server

mod server;
mod connection;
mod client;
mod data;
mod listing;

pub use server::Server;
pub use connection::{ControlSession, ControlState, BAD_COMMAND, BAD_DATA_PORT, EXPECTED_DPORT};
pub use client::Client;
pub use data::{receive, send_file, send_listing, DataOutcome};
pub use listing::{is_bare_filename, list_files, open_for_transfer, Listing, FILE_NOT_FOUND, UNABLE_TO_OPEN};
