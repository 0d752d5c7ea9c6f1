//! Control Session
//!
//! Handles one client's control connection on the server side, including the
//! data connection it negotiates.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use crate::config::{ServerConfig, MIN_USER_PORT};
use crate::error::{FtError, Result};
use crate::protocol::{read_frame, read_packet, write_packet, Packet, Tag};

use super::data::{send_file, send_listing};
use super::listing::{list_files, open_for_transfer};

/// Reply text for any command other than LIST or GET
pub const BAD_COMMAND: &str = "Command must be either -l or -g";

/// Reply text for a DPORT payload that is not a usable port
pub const BAD_DATA_PORT: &str = "Invalid data port";

/// Reply text when the first control packet is not DPORT
pub const EXPECTED_DPORT: &str = "Expected DPORT";

/// Pause between data connection attempts
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Where a control session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    AwaitingDataPort,
    AwaitingCommand,
    Responding,
    Closed,
}

/// A validated command, ready for the data phase
enum Command {
    List,
    Get { filename: String, file: File },
}

/// Server side of one control connection
pub struct ControlSession<'a> {
    /// Control stream reader
    reader: BufReader<TcpStream>,

    /// Control stream writer
    writer: BufWriter<TcpStream>,

    /// Client address; the data connection goes to its IP
    peer_addr: SocketAddr,

    config: &'a ServerConfig,

    state: ControlState,
}

impl<'a> ControlSession<'a> {
    /// Wrap an accepted control connection and apply the configured timeouts
    pub fn new(stream: TcpStream, config: &'a ServerConfig) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        set_timeouts(&stream, config.read_timeout_ms, config.write_timeout_ms)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            peer_addr,
            config,
            state: ControlState::AwaitingDataPort,
        })
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn transition(&mut self, next: ControlState) {
        tracing::debug!("{}: {:?} -> {:?}", self.peer_addr, self.state, next);
        self.state = next;
    }

    /// Run the session to completion
    ///
    /// A rejected command is a normal outcome and returns `Ok`. Anything that
    /// breaks the exchange returns `Err`; the caller logs it and moves on.
    pub fn handle(&mut self) -> Result<()> {
        let result = self.run();
        self.transition(ControlState::Closed);
        result
    }

    fn run(&mut self) -> Result<()> {
        let data_port = self.receive_data_port()?;
        self.transition(ControlState::AwaitingCommand);

        let command = match self.receive_command()? {
            Some(command) => command,
            None => return Ok(()),
        };
        self.transition(ControlState::Responding);

        self.send(&Packet::empty(Tag::Ack))?;
        let data_stream = self.open_data_connection(data_port)?;
        tracing::info!("Data connection established with {}:{}", self.peer_addr.ip(), data_port);

        let streamed = self.stream_data(&data_stream, command);
        if let Err(ref e) = streamed {
            tracing::warn!("Data transfer to {} failed: {}", self.peer_addr, e);
            // Best effort; the client may already be gone
            let _ = self.send(&Packet::error("Data transfer failed"));
            return streamed;
        }

        self.send(&Packet::empty(Tag::Close))?;
        self.await_ack()?;

        // We opened the data connection, so we close it
        drop(data_stream);
        Ok(())
    }

    fn send(&mut self, packet: &Packet) -> Result<()> {
        write_packet(&mut self.writer, packet)
    }

    fn receive(&mut self, what: &str) -> Result<Packet> {
        read_packet(&mut self.reader).map_err(|e| e.with_timeout_context(what))
    }

    /// Read one control packet; tags outside the vocabulary come back as `None`
    fn receive_raw(&mut self, what: &str) -> Result<(Option<Tag>, String, Vec<u8>)> {
        let (name, payload) =
            read_frame(&mut self.reader).map_err(|e| e.with_timeout_context(what))?;
        let tag = Tag::from_wire(&name);
        tracing::trace!("<- {:?} ({} bytes)", name, payload.len());
        Ok((tag, name, payload))
    }

    fn receive_data_port(&mut self) -> Result<u16> {
        let (tag, name, payload) = self.receive_raw("waiting for DPORT")?;
        if tag != Some(Tag::Dport) {
            let _ = self.send(&Packet::error(EXPECTED_DPORT));
            return Err(FtError::Protocol(format!("Expected DPORT, got {:?}", name)));
        }

        let text = String::from_utf8_lossy(&payload);
        match text.trim().parse::<u16>() {
            Ok(port) if port >= MIN_USER_PORT => {
                tracing::debug!("{} announced data port {}", self.peer_addr, port);
                Ok(port)
            }
            _ => {
                let _ = self.send(&Packet::error(BAD_DATA_PORT));
                Err(FtError::Protocol(format!("Invalid data port {:?}", text)))
            }
        }
    }

    /// Read and validate the command; on rejection, reply ERROR and return None
    fn receive_command(&mut self) -> Result<Option<Command>> {
        let (tag, name, payload) = self.receive_raw("waiting for command")?;

        // Unknown tags are treated like NULL
        let verdict = match tag {
            Some(Tag::List) => Ok(Command::List),
            Some(Tag::Get) => {
                let filename = String::from_utf8(payload)
                    .map_err(|_| super::listing::FILE_NOT_FOUND);
                filename.and_then(|filename| {
                    open_for_transfer(&self.config.serve_dir, &filename)
                        .map(|(_, file)| Command::Get { filename, file })
                })
            }
            _ => Err(BAD_COMMAND),
        };

        match verdict {
            Ok(command) => {
                match &command {
                    Command::List => tracing::info!("{} requested a listing", self.peer_addr),
                    Command::Get { filename, .. } => {
                        tracing::info!("{} requested {:?}", self.peer_addr, filename)
                    }
                }
                Ok(Some(command))
            }
            Err(message) => {
                tracing::info!("Rejecting {:?} command from {}: {}", name, self.peer_addr, message);
                self.send(&Packet::error(message))?;
                Ok(None)
            }
        }
    }

    /// Connect to the client's data port, retrying while it comes up
    fn open_data_connection(&self, port: u16) -> Result<TcpStream> {
        let addr = SocketAddr::new(self.peer_addr.ip(), port);
        let timeout = Duration::from_millis(self.config.connect_timeout_ms.max(1));
        let attempts = self.config.connect_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    set_timeouts(&stream, self.config.read_timeout_ms, self.config.write_timeout_ms)?;
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("Data connect to {} attempt {}/{} failed: {}", addr, attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        thread::sleep(CONNECT_RETRY_DELAY);
                    }
                }
            }
        }

        Err(FtError::Connection(format!(
            "data connection to {} failed after {} attempts: {}",
            addr,
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn stream_data(&self, data_stream: &TcpStream, command: Command) -> Result<()> {
        let mut writer = BufWriter::new(data_stream);
        match command {
            Command::List => {
                let count = send_listing(&mut writer, list_files(&self.config.serve_dir)?)?;
                tracing::info!("Sent {} filenames to {}", count, self.peer_addr);
            }
            Command::Get { filename, mut file } => {
                let bytes = send_file(&mut writer, &filename, &mut file, self.config.chunk_size)?;
                tracing::info!("Sent {:?} ({} bytes) to {}", filename, bytes, self.peer_addr);
            }
        }
        Ok(())
    }

    fn await_ack(&mut self) -> Result<()> {
        let packet = self.receive("waiting for ACK")?;
        match packet.tag {
            Tag::Ack => Ok(()),
            other => Err(FtError::Protocol(format!("Expected ACK, got {}", other))),
        }
    }
}

/// Apply read/write timeouts; 0 leaves a direction blocking
pub(crate) fn set_timeouts(stream: &TcpStream, read_ms: u64, write_ms: u64) -> Result<()> {
    if read_ms > 0 {
        stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
    }
    if write_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
    }
    Ok(())
}
