//! Error types and the related `Result<T>`s
//!
//! [`ZipError`] covers everything that can go wrong while reading the ZIP
//! container itself. [`Error`] is what the renaming pipeline reports,
//! one variant per stage that can fail.

use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use thiserror::Error;

pub type ZipResult<T> = std::result::Result<T, ZipError>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum ZipError {
    /// An error from underlying I/O
    #[error("I/O Error")]
    Io(#[from] io::Error),

    /// The ZIP archive contained invalid data per the format.
    #[error("Invalid Zip archive: {0}")]
    InvalidArchive(&'static str),

    /// Decoding a UTF-8 name failed
    #[error("Invalid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    /// The ZIP archive uses an unsupported feature
    #[error("Unsupported Zip archive: {0}")]
    UnsupportedArchive(String),

    /// A cast from a 64-bit int to a usize failed, probably on a 32-bit system.
    #[error("Zip archive too large for address space")]
    InsufficientAddressSpace,
}

/// Why a single book couldn't be renamed.
#[derive(Debug, Error)]
pub enum Error {
    /// The path given on the command line doesn't exist.
    #[error("File not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The book couldn't be opened, mapped, or read as a ZIP archive.
    #[error("Couldn't open {} as an archive", .path.display())]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    /// A required entry (the container or package document) is missing.
    #[error("No entry named {0} in the archive")]
    EntryNotFound(Utf8PathBuf),

    /// The entry exists but couldn't be decompressed or failed its checksum.
    #[error("Couldn't read archive entry {name}")]
    EntryRead {
        name: Utf8PathBuf,
        #[source]
        source: ZipError,
    },

    /// The container document isn't well-formed XML.
    #[error("Couldn't parse container document: {0}")]
    Parse(String),

    /// The container document parsed, but names no package document.
    #[error("Container document has no rootfile with a full-path")]
    MissingRootfile,

    /// Something already lives at the destination.
    #[error("Target file already exists: {}", .0.display())]
    Collision(PathBuf),

    /// The OS refused the rename.
    #[error("Couldn't rename {} to {}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}
