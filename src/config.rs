//! Configuration for ftlite
//!
//! Explicit, immutable configuration for the file-transfer server, the
//! file-transfer client and the chat peers. Built once from parsed arguments
//! and passed down into the session functions.

use std::path::PathBuf;

use crate::error::{FtError, Result};
use crate::protocol::{Request, MAX_PAYLOAD_SIZE};

/// Lowest port a user may pick for a control or data connection
pub const MIN_USER_PORT: u16 = 1024;

/// Default number of bytes carried by each CHUNK packet
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default number of data-connection attempts made by the server
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 12;

/// Longest accepted chat handle
pub const MAX_HANDLE_LEN: usize = 10;

/// Check that a port lies in the unprivileged range [1024, 65535]
pub fn validate_port(port: u16, what: &str) -> Result<()> {
    if port < MIN_USER_PORT {
        return Err(FtError::Usage(format!(
            "{} must be in the range [{}, 65535]",
            what, MIN_USER_PORT
        )));
    }
    Ok(())
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the file-transfer server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address for control connections
    pub listen_addr: String,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Timeout for each data-connection attempt (milliseconds)
    pub connect_timeout_ms: u64,

    /// How many times to try opening the data connection
    pub connect_attempts: u32,

    /// How often the accept loop checks for shutdown (milliseconds)
    pub accept_poll_ms: u64,

    // -------------------------------------------------------------------------
    // Transfer Configuration
    // -------------------------------------------------------------------------
    /// Directory whose regular files are listed and served
    pub serve_dir: PathBuf,

    /// Bytes per CHUNK packet
    pub chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:30021".to_string(),
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            connect_timeout_ms: 2_000,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            accept_poll_ms: 100,
            serve_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the directory to serve
    pub fn serve_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.serve_dir = path.into();
        self
    }

    /// Set the CHUNK payload size (clamped to the packet payload cap)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size.clamp(1, MAX_PAYLOAD_SIZE);
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the per-attempt data connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the number of data connect attempts
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.config.connect_attempts = attempts.max(1);
        self
    }

    /// Set the shutdown poll interval of the accept loop (in milliseconds)
    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms.max(1);
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for a single file-transfer client run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or address
    pub server_host: String,

    /// Server control port
    pub server_port: u16,

    /// What to ask the server for
    pub request: Request,

    /// Local port the client listens on for the data connection
    pub data_port: u16,

    /// Where retrieved files are written
    pub download_dir: PathBuf,

    /// Control connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// How long to wait for the server to open the data connection (milliseconds)
    pub accept_timeout_ms: u64,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl ClientConfig {
    /// Create a new config builder for the given server and request
    pub fn builder(
        server_host: impl Into<String>,
        server_port: u16,
        request: Request,
        data_port: u16,
    ) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: ClientConfig {
                server_host: server_host.into(),
                server_port,
                request,
                data_port,
                download_dir: PathBuf::from("."),
                connect_timeout_ms: 5_000,
                accept_timeout_ms: 30_000,
                read_timeout_ms: 30_000,
                write_timeout_ms: 30_000,
            },
        }
    }

    /// Reject argument combinations before any connection is attempted
    pub fn validate(&self) -> Result<()> {
        if self.server_host.trim().is_empty() {
            return Err(FtError::Usage("Server host must not be empty".to_string()));
        }
        validate_port(self.server_port, "Server port")?;
        validate_port(self.data_port, "Data port")?;
        if self.server_port == self.data_port {
            return Err(FtError::Usage(
                "Server port and data port cannot match".to_string(),
            ));
        }
        if let Request::Get { filename } = &self.request {
            if filename.is_empty() {
                return Err(FtError::Usage("Filename must not be empty".to_string()));
            }
            if filename.len() > MAX_PAYLOAD_SIZE {
                return Err(FtError::Usage(format!(
                    "Filename too long: {} bytes",
                    filename.len()
                )));
            }
        }
        Ok(())
    }
}

/// Builder for ClientConfig
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the directory retrieved files are saved into
    pub fn download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.download_dir = path.into();
        self
    }

    /// Set the control connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the data accept timeout (in milliseconds)
    pub fn accept_timeout_ms(mut self, ms: u64) -> Self {
        self.config.accept_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Validate and produce the config
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Chat Configuration
// =============================================================================

/// Configuration for one side of a chat
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Name prepended to every outgoing message
    pub handle: String,
}

impl ChatConfig {
    /// Create a chat config, validating the handle
    pub fn new(handle: impl Into<String>) -> Result<Self> {
        let handle = handle.into();
        validate_handle(&handle)?;
        Ok(Self { handle })
    }
}

/// A handle is a single word of 1 to 10 bytes
pub fn validate_handle(handle: &str) -> Result<()> {
    if handle.is_empty() {
        return Err(FtError::Usage("Handle must not be empty".to_string()));
    }
    // Bytes, not chars: the chat receive buffer is sized in bytes
    if handle.len() > MAX_HANDLE_LEN {
        return Err(FtError::Usage(format!(
            "Handle too long! Max length = {} bytes",
            MAX_HANDLE_LEN
        )));
    }
    if handle.chars().any(char::is_whitespace) {
        return Err(FtError::Usage("Handle must be a single word".to_string()));
    }
    Ok(())
}
