//! Chat server
//!
//! Waits for one peer at a time; the peer speaks first.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::ChatConfig;
use crate::error::{FtError, Result};

use super::session::{converse, ChatEnd, ChatSession, LineSource, Turn};

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Listening side of the chat
pub struct ChatServer {
    config: ChatConfig,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl ChatServer {
    pub fn bind<A: ToSocketAddrs>(addr: A, config: ChatConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| FtError::Connection(format!("cannot listen for chat peers: {}", e)))?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            config,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Chat with successive peers until the local user quits or shutdown is signalled
    pub fn run<L, F>(&self, input: &mut L, mut on_message: F) -> Result<()>
    where
        L: LineSource,
        F: FnMut(&str),
    {
        tracing::info!("Listening for chat peers on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::Relaxed) {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                    thread::sleep(ACCEPT_POLL);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                    continue;
                }
            };

            tracing::info!("Connection made with {}", peer);
            stream.set_nonblocking(false)?;
            let mut session = ChatSession::new(stream, self.config.clone());
            match converse(&mut session, &mut *input, Turn::Remote, &mut on_message) {
                Ok(ChatEnd::LocalQuit) => break,
                Ok(_) => tracing::info!("Chat with {} ended", peer),
                Err(e) => tracing::warn!("Chat with {} failed: {}", peer, e),
            }
        }

        tracing::info!("Chat server closed");
        Ok(())
    }
}
