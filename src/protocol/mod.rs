//! Protocol Module
//!
//! Defines the wire protocol shared by the control and data connections.
//!
//! ## Packet Format
//! ```text
//! offset 0   length  : u16 (big-endian) - whole packet, header included
//! offset 2   tag     : 8 bytes ASCII, NUL padded
//! offset 10  payload : length - 10 bytes
//! ```
//!
//! ### Tags
//! - DPORT: client announces its data port
//! - LIST / GET / NULL: command selection
//! - FNAME: one directory entry
//! - FILE: filename preceding content
//! - CHUNK: a slice of file content
//! - DONE: end of a data stream
//! - ACK / ERROR / CLOSE: control replies
//!
//! ### Session
//! ```text
//! client                          server
//!   │── DPORT ──────────────────────▶│   control
//!   │── LIST | GET ─────────────────▶│   control
//!   │◀──────────────── ACK | ERROR ──│   control
//!   │◀═════ FNAME* DONE ════════════│   data (server connects)
//!   │◀═════ FILE CHUNK* DONE ═══════│   data
//!   │◀──────────────────── CLOSE ────│   control
//!   │── ACK ────────────────────────▶│   control
//! ```

mod tag;
mod packet;
mod codec;

pub use tag::Tag;
pub use packet::{read_packet, write_packet, Packet, Request};
pub use codec::{
    decode, encode, read_frame, validate_tag, write_frame, HEADER_SIZE, LENGTH_SIZE,
    MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, TAG_LEN,
};
