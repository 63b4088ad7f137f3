//! Tools for reading entries out of a book's ZIP container.
//!
//! Open the book with [`ArchiveFile::open()`], which memory-maps it,
//! then borrow a [`ZipArchive`] from it to look entries up by name and read them.
//! The mapping is released when the `ArchiveFile` is dropped.
//!
//! [`ArchiveFile::open()`]: struct.ArchiveFile.html#method.open
//! [`ZipArchive`]: struct.ZipArchive.html

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use camino::Utf8Path;
use flate2::read::DeflateDecoder;
use log::*;
use memmap2::Mmap;

use crate::crc_reader::Crc32Reader;
use crate::records::{self, usize};
use crate::result::*;

/// The compression method used to store a file
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompressionMethod {
    /// The file is uncompressed
    None,
    /// The file is [DEFLATE](https://en.wikipedia.org/wiki/DEFLATE)d.
    Deflate,
    /// The file is compressed with a yet-unsupported format.
    /// (The u16 indicates the internal format code.)
    Unsupported(u16),
}

/// Metadata for a file or directory in the archive,
/// retrieved from its central directory
#[derive(Debug, PartialEq, Eq)]
pub struct EntryMetadata<'a> {
    /// Uncompressed size of the file in bytes
    pub size: usize,

    /// Compressed size of the file in bytes
    pub compressed_size: usize,

    /// Compression algorithm used to store the file
    pub compression_method: CompressionMethod,

    /// The CRC-32 of the decompressed file
    pub crc32: u32,

    /// True if the file is encrypted (decryption is unsupported)
    pub encrypted: bool,

    /// The path of the file, exactly as stored in the archive.
    pub path: Cow<'a, Utf8Path>,

    /// The offset to the local file header in the archive
    pub(crate) header_offset: usize,
}

/// A memory-mapped archive on disk.
pub struct ArchiveFile {
    mapping: Mmap,
}

impl ArchiveFile {
    /// Maps the file at `path` into memory.
    ///
    /// Nothing is parsed yet; call [`archive()`](#method.archive) for that.
    pub fn open<P: AsRef<Path>>(path: P) -> ZipResult<Self> {
        let path = path.as_ref();
        info!("Memory mapping {}", path.display());
        let file = File::open(path)?;
        // The mapping outlives the file handle, so let the latter close now.
        let mapping = unsafe { Mmap::map(&file)? };
        Ok(Self { mapping })
    }

    /// Parses the mapped file's central directory.
    pub fn archive(&self) -> ZipResult<ZipArchive<'_>> {
        ZipArchive::new(&self.mapping)
    }
}

/// A ZIP archive to be read
pub struct ZipArchive<'a> {
    /// The contents of the ZIP archive, as a byte slice.
    mapping: &'a [u8],
    /// A list of entries from the ZIP's central directory
    entries: Vec<EntryMetadata<'a>>,
}

impl<'a> ZipArchive<'a> {
    /// Reads a ZIP archive from a byte slice.
    ///
    /// Since a ZIP archive's metadata sits at the back of the file,
    /// arbitrary data prepended to the archive is tolerated.
    pub fn new(mut mapping: &'a [u8]) -> ZipResult<Self> {
        let eocdr_posit = records::find_eocdr(mapping)?;
        let eocdr = records::EndOfCentralDirectory::parse(&mapping[eocdr_posit..])?;
        trace!("{:?}", eocdr);

        if eocdr.disk_number != eocdr.disk_with_central_directory
            || eocdr.entries != eocdr.entries_on_this_disk
        {
            return Err(ZipError::UnsupportedArchive(String::from(
                "No support for multi-disk archives",
            )));
        }
        if eocdr.defers_to_zip64() || records::has_zip64_locator(mapping, eocdr_posit) {
            return Err(ZipError::UnsupportedArchive(String::from(
                "No support for Zip64 archives",
            )));
        }

        // Zip files can be prepended by arbitrary junk,
        // so all the given positions might be off.
        // The offset is the actual position versus the stored one.
        let nominal_offset = usize(eocdr.central_directory_offset)?;
        let archive_offset = eocdr_posit
            .checked_sub(usize(eocdr.central_directory_size)?)
            .and_then(|actual| actual.checked_sub(nominal_offset))
            .ok_or(ZipError::InvalidArchive(
                "Invalid central directory size or offset",
            ))?;
        if archive_offset != 0 {
            warn!("Archive prepended with {} unknown bytes", archive_offset);
        }

        mapping = &mapping[archive_offset..];
        trace!(
            "{} entries at nominal offset {}",
            eocdr.entries,
            nominal_offset
        );

        let mut central_directory = &mapping[nominal_offset..];
        let mut entries = Vec::with_capacity(eocdr.entries as usize);

        for _ in 0..eocdr.entries {
            let dir_entry =
                records::CentralDirectoryEntry::parse_and_consume(&mut central_directory)?;
            trace!("{:?}", dir_entry);

            let metadata = EntryMetadata::from_cde(&dir_entry)?;
            debug!("{:?}", metadata);
            entries.push(metadata);
        }

        Ok(ZipArchive { mapping, entries })
    }

    /// Returns the entries found in the ZIP archive's central directory,
    /// in the order they're stored.
    pub fn entries(&self) -> &[EntryMetadata<'a>] {
        &self.entries
    }

    /// Finds the entry whose stored path is exactly `name`.
    ///
    /// No normalization happens: `OEBPS/content.opf` won't match
    /// `oebps/content.opf` or `./OEBPS/content.opf`.
    /// If the archive has duplicates, the first one wins.
    pub fn find_entry(&self, name: &str) -> Option<&EntryMetadata<'a>> {
        self.entries.iter().find(|e| e.path.as_str() == name)
    }

    /// Returns a reader over the given entry's decompressed contents.
    ///
    /// The entry's CRC-32 is checked when the reader hits EOF.
    pub fn read(&self, metadata: &EntryMetadata) -> ZipResult<Box<dyn Read + 'a>> {
        if metadata.encrypted {
            return Err(ZipError::UnsupportedArchive(format!(
                "Can't read encrypted file {}",
                metadata.path
            )));
        }

        let mut file_slice = self
            .mapping
            .get(metadata.header_offset..)
            .ok_or(ZipError::InvalidArchive(
                "Local file header offset out of range",
            ))?;
        let local_header = records::LocalFileHeader::parse_and_consume(&mut file_slice)?;
        trace!("{:?}", local_header);
        if cfg!(feature = "check-local-metadata") {
            metadata.check_local_header(&local_header)?;
        }
        debug!("Reading {}", metadata.path);

        let data = file_slice
            .get(..metadata.compressed_size)
            .ok_or(ZipError::InvalidArchive(
                "File data runs past the end of the archive",
            ))?;
        make_reader(metadata.compression_method, metadata.crc32, data)
    }

    /// Reads the whole entry into memory, checking its size and CRC-32.
    pub fn read_entry(&self, metadata: &EntryMetadata) -> ZipResult<Vec<u8>> {
        let mut reader = self.read(metadata)?;
        // Don't let a lying header make us allocate the world up front.
        let mut contents = Vec::with_capacity(metadata.size.min(1 << 20));
        reader.read_to_end(&mut contents)?;
        if contents.len() != metadata.size {
            return Err(ZipError::InvalidArchive(
                "Decompressed size doesn't match the central directory",
            ));
        }
        Ok(contents)
    }
}

/// Returns a boxed read trait for a compressed file,
/// given its compression method and expected CRC.
fn make_reader<'a, R: io::Read + 'a>(
    compression_method: CompressionMethod,
    crc32: u32,
    reader: R,
) -> ZipResult<Box<dyn io::Read + 'a>> {
    match compression_method {
        CompressionMethod::None => Ok(Box::new(Crc32Reader::new(reader, crc32))),
        CompressionMethod::Deflate => {
            let deflate_reader = DeflateDecoder::new(reader);
            Ok(Box::new(Crc32Reader::new(deflate_reader, crc32)))
        }
        CompressionMethod::Unsupported(code) => Err(ZipError::UnsupportedArchive(format!(
            "Compression method {code} not supported"
        ))),
    }
}
