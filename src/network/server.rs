//! TCP Server
//!
//! Accepts control connections and services them one at a time.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{FtError, Result};

use super::connection::ControlSession;

/// File-transfer server
///
/// Sessions are handled sequentially: accept, service fully, close, repeat.
/// A failed session is logged and the server keeps accepting.
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the control listener
    pub fn bind(config: ServerConfig) -> Result<Self> {
        if !config.serve_dir.is_dir() {
            return Err(FtError::Usage(format!(
                "Serve directory {:?} is not a directory",
                config.serve_dir
            )));
        }

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            FtError::Connection(format!("cannot listen on {}: {}", config.listen_addr, e))
        })?;
        // Polled accept so the shutdown flag is noticed
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops `run` when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown after the current session
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Serve until shutdown is signalled (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("FTP server open on {}", self.local_addr()?);
        let poll = Duration::from_millis(self.config.accept_poll_ms.max(1));

        while !self.shutdown.load(Ordering::Relaxed) {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(poll);
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(poll);
                    continue;
                }
            };

            tracing::info!("Control connection established with {}", peer);
            if let Err(e) = self.serve(stream) {
                if e.is_disconnect() {
                    tracing::info!("Client {} disconnected: {}", peer, e);
                } else {
                    tracing::warn!("Session with {} failed: {}", peer, e);
                }
            }
            tracing::info!("Control connection with {} closed", peer);
        }

        tracing::info!("FTP server shutting down");
        Ok(())
    }

    fn serve(&self, stream: std::net::TcpStream) -> Result<()> {
        // Some platforms hand back accepted sockets in the listener's mode
        stream.set_nonblocking(false)?;
        let mut session = ControlSession::new(stream, &self.config)?;
        session.handle()
    }
}
