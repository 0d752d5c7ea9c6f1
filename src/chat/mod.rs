//! Chat Module
//!
//! A line-oriented relay between two peers over one persistent socket.
//! Messages are raw strings with no framing; the peers take turns, and
//! either one ends the session by sending the literal `quit`.

mod session;
mod server;

pub use session::{
    converse, ChatEnd, ChatEvent, ChatSession, ConsoleInput, LineSource, Turn, MAX_MESSAGE_LEN,
    MAX_WIRE_LEN, QUIT,
};
pub use server::ChatServer;
