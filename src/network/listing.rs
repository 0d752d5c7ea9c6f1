//! Served directory access
//!
//! Lazy enumeration of the served directory and validation of requested
//! filenames before any data connection is opened.

use std::fs::{self, File, ReadDir};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::protocol::MAX_PAYLOAD_SIZE;

/// Reply text for a GET naming no regular file in the served directory
pub const FILE_NOT_FOUND: &str = "File not found";

/// Reply text for a GET naming a file that exists but cannot be opened
pub const UNABLE_TO_OPEN: &str = "Unable to open file";

/// True for a plain name with no directory component
pub fn is_bare_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Regular files in a directory, yielded one at a time
///
/// Order follows the underlying directory enumeration and is unspecified.
pub struct Listing {
    entries: ReadDir,
}

impl Iterator for Listing {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            // Follow symlinks, like stat(2)
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", entry.path(), e);
                    continue;
                }
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("Skipping non UTF-8 filename {:?}", raw);
                    continue;
                }
            };
            if name.len() > MAX_PAYLOAD_SIZE {
                tracing::warn!("Skipping filename of {} bytes", name.len());
                continue;
            }

            return Some(name);
        }
    }
}

/// Start enumerating the regular files in `dir`
pub fn list_files(dir: &Path) -> Result<Listing> {
    Ok(Listing {
        entries: fs::read_dir(dir)?,
    })
}

/// Open a requested file for transfer
///
/// On failure returns the message to send back in an ERROR packet.
pub fn open_for_transfer(dir: &Path, name: &str) -> std::result::Result<(PathBuf, File), &'static str> {
    if !is_bare_filename(name) {
        return Err(FILE_NOT_FOUND);
    }

    let path = dir.join(name);
    match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(FILE_NOT_FOUND),
    }

    match File::open(&path) {
        Ok(file) => Ok((path, file)),
        Err(e) => {
            tracing::debug!("Cannot open {:?}: {}", path, e);
            Err(UNABLE_TO_OPEN)
        }
    }
}
