//! Data session
//!
//! Producers (server side) and consumers (client side) of the data stream.
//!
//! ```text
//! LIST:  FNAME* DONE
//! GET:   FILE CHUNK* DONE
//! ```

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{FtError, Result};
use crate::protocol::{read_packet, write_packet, Packet, Tag};

use super::listing::is_bare_filename;

/// What the client got out of a data session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOutcome {
    /// Filenames announced by the server, in arrival order
    Listing(Vec<String>),

    /// A file written to disk
    Saved { path: PathBuf, bytes: u64 },
}

// =============================================================================
// Producers
// =============================================================================

/// Send one FNAME per entry, then DONE
///
/// Returns the number of entries sent.
pub fn send_listing<W, I>(writer: &mut W, entries: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = String>,
{
    let mut count = 0;
    for name in entries {
        write_packet(writer, &Packet::new(Tag::Fname, name))?;
        count += 1;
    }
    write_packet(writer, &Packet::empty(Tag::Done))?;
    Ok(count)
}

/// Send FILE naming the file, its content as CHUNK packets, then DONE
///
/// A read failure aborts before DONE so the consumer never mistakes a
/// truncated file for a complete one. Returns the content bytes sent.
pub fn send_file<W, R>(writer: &mut W, name: &str, source: &mut R, chunk_size: usize) -> Result<u64>
where
    W: Write,
    R: Read,
{
    write_packet(writer, &Packet::new(Tag::File, name))?;

    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut sent = 0u64;
    loop {
        let n = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        write_packet(writer, &Packet::new(Tag::Chunk, &buffer[..n]))?;
        sent += n as u64;
    }

    write_packet(writer, &Packet::empty(Tag::Done))?;
    Ok(sent)
}

// =============================================================================
// Consumers
// =============================================================================

/// Consume a whole data stream
///
/// The first packet decides between a listing and a file. A file that already
/// exists in `download_dir` is left untouched: the stream is drained and
/// `FileExists` is returned.
pub fn receive<R: Read>(reader: &mut R, download_dir: &Path) -> Result<DataOutcome> {
    let first = read_packet(reader)?;
    match first.tag {
        Tag::Fname | Tag::Done => receive_listing(reader, first).map(DataOutcome::Listing),
        Tag::File => receive_file(reader, &first.text(), download_dir),
        Tag::Error => Err(FtError::Server(first.text())),
        other => Err(unexpected(other, "FNAME, FILE or DONE")),
    }
}

fn unexpected(tag: Tag, wanted: &str) -> FtError {
    FtError::Protocol(format!("Unexpected {} packet, expected {}", tag, wanted))
}

/// Collect FNAME payloads up to DONE, starting from an already-read packet
fn receive_listing<R: Read>(reader: &mut R, first: Packet) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut packet = first;
    loop {
        match packet.tag {
            Tag::Fname => names.push(packet.text()),
            Tag::Done => return Ok(names),
            other => return Err(unexpected(other, "FNAME or DONE")),
        }
        packet = read_packet(reader)?;
    }
}

/// Read and discard packets up to DONE
fn drain<R: Read>(reader: &mut R) -> Result<()> {
    loop {
        let packet = read_packet(reader)?;
        if packet.tag == Tag::Done {
            return Ok(());
        }
    }
}

fn receive_file<R: Read>(reader: &mut R, name: &str, download_dir: &Path) -> Result<DataOutcome> {
    if !is_bare_filename(name) {
        return Err(FtError::Protocol(format!(
            "Refusing to write server-supplied path {:?}",
            name
        )));
    }

    let path = download_dir.join(name);
    let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::info!("{:?} already exists, discarding transfer", path);
            drain(reader)?;
            return Err(FtError::FileExists(path));
        }
        Err(e) => return Err(e.into()),
    };

    match write_chunks(reader, BufWriter::new(file)) {
        Ok(bytes) => Ok(DataOutcome::Saved { path, bytes }),
        Err(e) => {
            if let Err(rm) = fs::remove_file(&path) {
                tracing::warn!("Could not remove partial file {:?}: {}", path, rm);
            }
            Err(e)
        }
    }
}

fn write_chunks<R: Read, W: Write>(reader: &mut R, mut out: W) -> Result<u64> {
    let mut bytes = 0u64;
    loop {
        let packet = read_packet(reader)?;
        match packet.tag {
            Tag::Chunk => {
                out.write_all(&packet.payload)?;
                bytes += packet.payload.len() as u64;
            }
            Tag::Done => break,
            other => return Err(unexpected(other, "CHUNK or DONE")),
        }
    }
    out.flush()?;
    Ok(bytes)
}
