//! Chat session
//!
//! Alternating, unframed message exchange between two peers.

use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::config::ChatConfig;
use crate::error::{FtError, Result};

/// Literal that ends a conversation when sent by either side
pub const QUIT: &str = "quit";

/// Longest message text a user may send
pub const MAX_MESSAGE_LEN: usize = 512;

/// Largest read for one incoming message (handle + " > " + text)
pub const MAX_WIRE_LEN: usize = 525;

/// Something received from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Message(String),
    Quit,
    Closed,
}

/// Why a conversation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEnd {
    /// The local user sent `quit`
    LocalQuit,
    /// The peer sent `quit`
    PeerQuit,
    /// The peer closed the connection
    PeerClosed,
}

/// Who speaks first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Local,
    Remote,
}

/// Source of lines typed by the local user
pub trait LineSource {
    /// Show `prompt` and return the next line without its newline; `None` at end of input
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Lines from standard input, prompting on standard output
#[derive(Debug, Default)]
pub struct ConsoleInput;

impl LineSource for ConsoleInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// One side of a chat over any byte stream
pub struct ChatSession<S> {
    stream: S,
    config: ChatConfig,
}

impl<S: Read + Write> ChatSession<S> {
    pub fn new(stream: S, config: ChatConfig) -> Self {
        Self { stream, config }
    }

    pub fn handle(&self) -> &str {
        &self.config.handle
    }

    /// Prompt shown to the local user
    pub fn prompt(&self) -> String {
        format!("{} > ", self.config.handle)
    }

    /// Render outgoing text as it appears on the wire
    pub fn render(&self, text: &str) -> Result<String> {
        if text.len() > MAX_MESSAGE_LEN {
            return Err(FtError::Usage(format!(
                "Message too large! Max length = {}",
                MAX_MESSAGE_LEN
            )));
        }
        let wire = format!("{} > {}", self.config.handle, text);
        // One message must fit one receive buffer
        if wire.len() > MAX_WIRE_LEN {
            return Err(FtError::Usage(format!(
                "Message too large for handle {:?}! Max length = {}",
                self.config.handle,
                MAX_WIRE_LEN - (wire.len() - text.len())
            )));
        }
        Ok(wire)
    }

    /// Send one message; `quit` goes out bare
    pub fn send(&mut self, text: &str) -> Result<()> {
        let wire = if text == QUIT {
            QUIT.to_string()
        } else {
            self.render(text)?
        };
        self.stream.write_all(wire.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    /// Wait for the peer's next message
    pub fn recv(&mut self) -> Result<ChatEvent> {
        let mut buf = [0u8; MAX_WIRE_LEN];
        let n = loop {
            match self.stream.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = FtError::from(e);
                    if err.is_disconnect() {
                        return Ok(ChatEvent::Closed);
                    }
                    return Err(err);
                }
            }
        };

        if n == 0 {
            return Ok(ChatEvent::Closed);
        }
        let text = String::from_utf8_lossy(&buf[..n]);
        if text == QUIT {
            return Ok(ChatEvent::Quit);
        }
        Ok(ChatEvent::Message(text.into_owned()))
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl ChatSession<TcpStream> {
    /// Connect to a listening chat peer
    pub fn connect<A: ToSocketAddrs>(addr: A, config: ChatConfig) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| FtError::Connection(format!("cannot connect to chat peer: {}", e)))?;
        Ok(Self::new(stream, config))
    }
}

/// Alternate turns until someone quits or the peer goes away
///
/// End of local input counts as `quit`. Lines that are too long are rejected
/// and the user is prompted again.
pub fn converse<S, L, F>(
    session: &mut ChatSession<S>,
    input: &mut L,
    first: Turn,
    mut on_message: F,
) -> Result<ChatEnd>
where
    S: Read + Write,
    L: LineSource,
    F: FnMut(&str),
{
    let prompt = session.prompt();
    let mut turn = first;
    loop {
        match turn {
            Turn::Local => {
                let line = loop {
                    let line = input.read_line(&prompt)?.unwrap_or_else(|| QUIT.to_string());
                    match session.send(&line) {
                        Ok(()) => break line,
                        Err(FtError::Usage(msg)) => tracing::warn!("{}", msg),
                        Err(e) => return Err(e),
                    }
                };
                if line == QUIT {
                    tracing::info!("Connection closed by {}", session.handle());
                    return Ok(ChatEnd::LocalQuit);
                }
                turn = Turn::Remote;
            }
            Turn::Remote => match session.recv()? {
                ChatEvent::Message(text) => {
                    on_message(&text);
                    turn = Turn::Local;
                }
                ChatEvent::Quit => {
                    tracing::info!("Connection closed by peer");
                    return Ok(ChatEnd::PeerQuit);
                }
                ChatEvent::Closed => {
                    tracing::info!("Peer went away");
                    return Ok(ChatEnd::PeerClosed);
                }
            },
        }
    }
}
