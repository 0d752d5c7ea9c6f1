//! Packet definitions
//!
//! Typed packets built on the raw codec, and the client's request.

use std::io::{Read, Write};

use crate::error::{FtError, Result};

use super::codec::{decode, encode, read_frame, write_frame};
use super::Tag;

/// A packet whose tag belongs to the closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub tag: Tag,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a packet with an arbitrary payload
    pub fn new(tag: Tag, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    /// Create a packet with an empty payload
    pub fn empty(tag: Tag) -> Self {
        Self::new(tag, Vec::new())
    }

    pub fn dport(port: u16) -> Self {
        Self::new(Tag::Dport, port.to_string())
    }

    pub fn error(message: &str) -> Self {
        Self::new(Tag::Error, message.as_bytes())
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self.tag.as_str(), &self.payload)
    }

    /// Decode from wire bytes; unknown tags are a protocol error
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (tag, payload) = decode(bytes)?;
        Self::from_frame(tag, payload)
    }

    fn from_frame(tag: String, payload: Vec<u8>) -> Result<Self> {
        match Tag::from_wire(&tag) {
            Some(tag) => Ok(Self { tag, payload }),
            None => Err(FtError::Protocol(format!("Unknown tag: {:?}", tag))),
        }
    }
}

/// Read a complete typed packet from a stream
pub fn read_packet<R: Read>(reader: &mut R) -> Result<Packet> {
    let (tag, payload) = read_frame(reader)?;
    let packet = Packet::from_frame(tag, payload)?;
    tracing::trace!("<- {} ({} bytes)", packet.tag, packet.payload.len());
    Ok(packet)
}

/// Write a typed packet to a stream
pub fn write_packet<W: Write>(writer: &mut W, packet: &Packet) -> Result<()> {
    tracing::trace!("-> {} ({} bytes)", packet.tag, packet.payload.len());
    write_frame(writer, packet.tag.as_str(), &packet.payload)
}

// =============================================================================
// Requests
// =============================================================================

/// What a client asks the server for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List the regular files in the served directory
    List,

    /// Retrieve one file
    Get { filename: String },
}

impl Request {
    /// The command packet sent on the control connection
    pub fn command_packet(&self) -> Packet {
        match self {
            Request::List => Packet::empty(Tag::List),
            Request::Get { filename } => Packet::new(Tag::Get, filename.as_bytes()),
        }
    }
}
