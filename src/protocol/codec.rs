//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────────────┬─────────────────────────────┐
//! │ Len (2)  │  Tag (8, NUL pad)│     Payload (Len - 10)      │
//! └──────────┴──────────────────┴─────────────────────────────┘
//! ```
//!
//! `Len` is big-endian and counts the whole packet, header included.
//!
//! This layer works on raw `(tag, payload)` pairs so that any ASCII tag of up
//! to 8 bytes can be carried. The typed layer in `packet` maps tags onto the
//! closed [`Tag`](super::Tag) vocabulary.

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FtError, Result};

/// Size of the length field
pub const LENGTH_SIZE: usize = 2;

/// Size of the NUL-padded tag field
pub const TAG_LEN: usize = 8;

/// Header size: 2 bytes length + 8 bytes tag
pub const HEADER_SIZE: usize = LENGTH_SIZE + TAG_LEN;

/// Largest packet the 16-bit length field can describe
pub const MAX_PACKET_SIZE: usize = u16::MAX as usize;

/// Largest payload that fits in one packet
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - HEADER_SIZE;

// =============================================================================
// Encoding
// =============================================================================

/// Check a tag for the wire: ASCII, no NUL, at most 8 bytes
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.len() > TAG_LEN {
        return Err(FtError::TagTooLong(tag.len()));
    }
    if !tag.is_ascii() || tag.bytes().any(|b| b == 0) {
        return Err(FtError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Encode a packet to bytes
///
/// Format: length (2) + tag (8, NUL padded) + payload
pub fn encode(tag: &str, payload: &[u8]) -> Result<Vec<u8>> {
    validate_tag(tag)?;
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FtError::PayloadTooLarge(payload.len()));
    }

    let total_len = HEADER_SIZE + payload.len();
    let mut message = BytesMut::with_capacity(total_len);
    message.put_u16(total_len as u16);
    message.put_slice(tag.as_bytes());
    message.put_bytes(0, TAG_LEN - tag.len());
    message.put_slice(payload);

    Ok(message.to_vec())
}

// =============================================================================
// Decoding
// =============================================================================

/// Parse the length field, rejecting values too small to hold a header
fn payload_len(length_field: u16) -> Result<usize> {
    let total_len = length_field as usize;
    if total_len < HEADER_SIZE {
        return Err(FtError::Protocol(format!(
            "Malformed length field: {} (minimum {})",
            total_len, HEADER_SIZE
        )));
    }
    Ok(total_len - HEADER_SIZE)
}

/// Turn the raw tag field into a string, dropping the NUL padding
fn decode_tag(field: &[u8]) -> Result<String> {
    let end = field
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    let trimmed = &field[..end];

    if !trimmed.is_ascii() {
        return Err(FtError::Protocol(format!(
            "Non-ASCII tag field: {:02x?}",
            field
        )));
    }
    // is_ascii guarantees valid UTF-8
    Ok(trimmed.iter().map(|&b| b as char).collect())
}

/// Decode one packet from the front of `bytes`
///
/// Trailing bytes beyond the packet's length field are ignored.
pub fn decode(bytes: &[u8]) -> Result<(String, Vec<u8>)> {
    if bytes.len() < HEADER_SIZE {
        return Err(FtError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let payload_len = payload_len(buf.get_u16())?;
    let tag = decode_tag(&buf[..TAG_LEN])?;
    buf.advance(TAG_LEN);

    if buf.len() < payload_len {
        return Err(FtError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            payload_len,
            buf.len()
        )));
    }

    Ok((tag, buf[..payload_len].to_vec()))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Fill `buf` completely, looping over short reads
///
/// `already` is the number of bytes of the current packet consumed before this
/// call, so a premature EOF reports how far into the packet the peer got.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8], already: usize, total: usize) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FtError::ConnectionClosed {
                    expected: total,
                    received: already + filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read a complete packet from a stream
///
/// Blocks until the whole packet has arrived. A peer that closes before that
/// yields `ConnectionClosed`, never a partial packet.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<(String, Vec<u8>)> {
    // Length first; total is unknown until it arrives
    let mut length = [0u8; LENGTH_SIZE];
    read_full(reader, &mut length, 0, LENGTH_SIZE)?;
    let length_field = u16::from_be_bytes(length);
    let payload_len = payload_len(length_field)?;
    let total = length_field as usize;

    let mut tag_field = [0u8; TAG_LEN];
    read_full(reader, &mut tag_field, LENGTH_SIZE, total)?;
    let tag = decode_tag(&tag_field)?;

    let mut payload = vec![0u8; payload_len];
    read_full(reader, &mut payload, HEADER_SIZE, total)?;

    Ok((tag, payload))
}

/// Write a packet to a stream
pub fn write_frame<W: Write>(writer: &mut W, tag: &str, payload: &[u8]) -> Result<()> {
    let bytes = encode(tag, payload)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
