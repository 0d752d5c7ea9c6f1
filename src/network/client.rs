//! File-transfer client
//!
//! Runs one request against a server: control negotiation, the active-mode
//! data connection, and the closing handshake.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::error::{FtError, Result};
use crate::protocol::{read_packet, write_packet, Packet, Tag};

use super::connection::set_timeouts;
use super::data::{receive, DataOutcome};

/// How often a pending data accept is re-checked
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Client for a single request
pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform the configured request (blocking)
    ///
    /// `FileExists` is reported only after the session has been acknowledged
    /// and closed normally.
    pub fn run(&self) -> Result<DataOutcome> {
        self.config.validate()?;

        let control = self.connect_control()?;
        let peer = control.peer_addr()?;
        tracing::info!("Control connection established with {}", peer);

        // Listen before announcing the port so the server cannot connect too early
        let data_listener = self.bind_data_listener(&peer)?;

        let mut reader = BufReader::new(control.try_clone()?);
        let mut writer = BufWriter::new(control);

        tracing::debug!("Transmitting data port {}", self.config.data_port);
        write_packet(&mut writer, &Packet::dport(self.config.data_port))?;
        tracing::debug!("Transmitting command {:?}", self.config.request);
        write_packet(&mut writer, &self.config.request.command_packet())?;

        let reply = read_packet(&mut reader).map_err(|e| e.with_timeout_context("waiting for reply"))?;
        match reply.tag {
            Tag::Ack => {}
            Tag::Error => return Err(FtError::Server(reply.text())),
            other => {
                return Err(FtError::Protocol(format!(
                    "Expected ACK or ERROR, got {}",
                    other
                )))
            }
        }

        let data_stream = self.accept_data(&data_listener)?;
        tracing::info!("Data connection established with {}", data_stream.peer_addr()?);

        let outcome = {
            let mut data_reader = BufReader::new(&data_stream);
            receive(&mut data_reader, &self.config.download_dir)
                .map_err(|e| e.with_timeout_context("receiving data"))
        };
        // FileExists still finishes the handshake; anything else ends the run
        let fatal = matches!(&outcome, Err(e) if !matches!(e, FtError::FileExists(_)));
        if fatal {
            return outcome;
        }

        write_packet(&mut writer, &Packet::empty(Tag::Ack))?;
        let server_errors = wait_for_close(&mut reader)?;
        tracing::info!("Control connection closed");

        if !server_errors.is_empty() {
            if let Ok(DataOutcome::Saved { path, .. }) = &outcome {
                tracing::warn!("Server reported errors after transfer of {:?}", path);
            }
            return Err(FtError::Server(server_errors.join("; ")));
        }
        outcome
    }

    fn connect_control(&self) -> Result<TcpStream> {
        let host = (self.config.server_host.as_str(), self.config.server_port);
        let addrs: Vec<SocketAddr> = host
            .to_socket_addrs()
            .map_err(|e| {
                FtError::Connection(format!("cannot resolve {}: {}", self.config.server_host, e))
            })?
            .collect();
        if addrs.is_empty() {
            return Err(FtError::Connection(format!(
                "no addresses for {}",
                self.config.server_host
            )));
        }

        let timeout = Duration::from_millis(self.config.connect_timeout_ms.max(1));
        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    set_timeouts(&stream, self.config.read_timeout_ms, self.config.write_timeout_ms)?;
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some((addr, e));
                }
            }
        }

        Err(FtError::Connection(match last_error {
            Some((addr, e)) => format!("cannot connect to {}: {}", addr, e),
            None => format!("cannot connect to {}", self.config.server_host),
        }))
    }

    fn bind_data_listener(&self, peer: &SocketAddr) -> Result<TcpListener> {
        let any = match peer.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let addr = SocketAddr::new(any, self.config.data_port);
        let listener = TcpListener::bind(addr)
            .map_err(|e| FtError::Connection(format!("cannot listen on data port {}: {}", addr, e)))?;
        listener.set_nonblocking(true)?;
        Ok(listener)
    }

    fn accept_data(&self, listener: &TcpListener) -> Result<TcpStream> {
        let deadline = Instant::now() + Duration::from_millis(self.config.accept_timeout_ms);
        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(false)?;
                    set_timeouts(&stream, self.config.read_timeout_ms, self.config.write_timeout_ms)?;
                    return Ok(stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                    if Instant::now() >= deadline {
                        return Err(FtError::Timeout("waiting for data connection".to_string()));
                    }
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    return Err(FtError::Connection(format!("data accept failed: {}", e)))
                }
            }
        }
    }
}

/// Read the control connection up to CLOSE, collecting queued ERROR messages
fn wait_for_close<R: std::io::Read>(reader: &mut R) -> Result<Vec<String>> {
    let mut errors = Vec::new();
    loop {
        let packet = read_packet(reader).map_err(|e| e.with_timeout_context("waiting for CLOSE"))?;
        match packet.tag {
            Tag::Close => return Ok(errors),
            Tag::Error => {
                let message = packet.text();
                tracing::warn!("Server: {}", message);
                errors.push(message);
            }
            other => {
                return Err(FtError::Protocol(format!(
                    "Expected CLOSE or ERROR, got {}",
                    other
                )))
            }
        }
    }
}
