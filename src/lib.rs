//! # ftlite
//!
//! A small file-transfer service and a two-peer chat relay:
//! - Length-prefixed, tagged packets on every connection
//! - Separate control and data connections (active mode)
//! - Directory listing and single-file retrieval
//! - Sequential server that survives per-session failures
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐        control (DPORT, LIST|GET, ACK, CLOSE)      ┌──────────────┐
//! │   ftclient   │◀─────────────────────────────────────────────────▶│   ftserver   │
//! │              │                                                   │              │
//! │  data port   │◀══════════ data (FNAME* | FILE CHUNK*) DONE ══════│  serve dir   │
//! │  (listens)   │                                                   │  (connects)  │
//! └──────────────┘                                                   └──────────────┘
//!          │                                                                │
//!          └──────────────────────┐                ┌────────────────────────┘
//!                                 ▼                ▼
//!                          ┌─────────────────────────────┐
//!                          │   protocol (Tag, Packet,    │
//!                          │   codec: len | tag | data)  │
//!                          └─────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod chat;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FtError, Result};
pub use config::{ChatConfig, ClientConfig, ServerConfig};
pub use network::{Client, DataOutcome, Server};
pub use protocol::{Packet, Request, Tag};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ftlite
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
