//! Tag definitions
//!
//! The closed vocabulary of packet kinds.

use std::fmt;

/// Packet kinds understood by client and server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Client announces its data port (payload: decimal port)
    Dport,

    /// Request a directory listing
    List,

    /// Request a file (payload: filename)
    Get,

    /// Placeholder command; always rejected by the server
    Null,

    /// One directory entry (payload: filename)
    Fname,

    /// Start of a file transfer (payload: filename)
    File,

    /// A slice of file content
    Chunk,

    /// End of a data stream
    Done,

    /// Go-ahead from the server, or receipt confirmation from the client
    Ack,

    /// Failure report (payload: human-readable message)
    Error,

    /// Server is finished with the control connection
    Close,
}

impl Tag {
    /// All tags, in declaration order
    pub const ALL: [Tag; 11] = [
        Tag::Dport,
        Tag::List,
        Tag::Get,
        Tag::Null,
        Tag::Fname,
        Tag::File,
        Tag::Chunk,
        Tag::Done,
        Tag::Ack,
        Tag::Error,
        Tag::Close,
    ];

    /// The identifier written into the tag field
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Dport => "DPORT",
            Tag::List => "LIST",
            Tag::Get => "GET",
            Tag::Null => "NULL",
            Tag::Fname => "FNAME",
            Tag::File => "FILE",
            Tag::Chunk => "CHUNK",
            Tag::Done => "DONE",
            Tag::Ack => "ACK",
            Tag::Error => "ERROR",
            Tag::Close => "CLOSE",
        }
    }

    /// Look up a decoded (NUL-trimmed) tag field
    pub fn from_wire(s: &str) -> Option<Tag> {
        Tag::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
