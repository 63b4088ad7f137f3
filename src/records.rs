//! Byte layouts of the ZIP records we need to find and read a book's entries.
//!
//! We try to keep the nitty gritty here,
//! and the higher-level lookup and reading in the [`archive`] module.
//!
//! Most comments quote the ZIP format's [`APPNOTE.TXT`].
//! Unlike a general-purpose unzipper we only care about single-disk,
//! non-Zip64 archives: EPUBs are small, and nobody splits one across floppies.
//!
//! [`archive`]: ../archive/index.html
//! [`APPNOTE.TXT`]: https://pkware.cachefly.net/webdocs/APPNOTE/APPNOTE-6.3.6.TXT

use std::borrow::Cow;

use camino::{Utf8Path, Utf8PathBuf};
use codepage_437::*;
use memchr::memmem;

use crate::archive::{CompressionMethod, EntryMetadata};
use crate::result::*;

/// End of central directory magic number
const EOCDR_MAGIC: [u8; 4] = [b'P', b'K', 5, 6];
/// Zip64 end of central directory locator magic number
const ZIP64_EOCDR_LOCATOR_MAGIC: [u8; 4] = [b'P', b'K', 6, 7];
/// Central directory magic number
const CENTRAL_DIRECTORY_MAGIC: [u8; 4] = [b'P', b'K', 1, 2];
/// Local file header magic number
const LOCAL_FILE_HEADER_MAGIC: [u8; 4] = [b'P', b'K', 3, 4];

impl CompressionMethod {
    fn from_u16(u: u16) -> Self {
        match u {
            0 => CompressionMethod::None,
            8 => CompressionMethod::Deflate,
            v => CompressionMethod::Unsupported(v),
        }
    }
}

/// A checked cast to usize.
pub fn usize<I: Into<u64>>(i: I) -> ZipResult<usize> {
    let i: u64 = i.into();
    i.try_into().map_err(|_| ZipError::InsufficientAddressSpace)
}

/// Splits `len` bytes off the front of `input`, shrinking it.
///
/// Unlike slice indexing this reports truncated archives instead of panicking.
fn take<'a>(input: &mut &'a [u8], len: usize) -> ZipResult<&'a [u8]> {
    if input.len() < len {
        return Err(ZipError::InvalidArchive("Record runs past the end of the file"));
    }
    let (taken, rest) = input.split_at(len);
    *input = rest;
    Ok(taken)
}

/// Reads a little-endian u32 from the front of the provided slice, shrinking it.
fn read_u32(input: &mut &[u8]) -> ZipResult<u32> {
    let bytes = take(input, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Reads a little-endian u16 from the front of the provided slice, shrinking it.
fn read_u16(input: &mut &[u8]) -> ZipResult<u16> {
    let bytes = take(input, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Consumes a four-byte signature, failing with `what` if it doesn't match.
fn expect_magic(input: &mut &[u8], magic: [u8; 4], what: &'static str) -> ZipResult<()> {
    if take(input, 4)? != magic {
        return Err(ZipError::InvalidArchive(what));
    }
    Ok(())
}

/// Data from the End of central directory record
///
/// Found at the back of the ZIP archive and provides offsets for finding
/// its central directory.
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_central_directory: u16,
    pub entries_on_this_disk: u16,
    pub entries: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
}

impl EndOfCentralDirectory {
    pub fn parse(mut eocdr: &[u8]) -> ZipResult<Self> {
        // 4.3.16  End of central directory record:
        //
        // end of central dir signature    4 bytes  (0x06054b50)
        // number of this disk             2 bytes
        // number of the disk with the
        // start of the central directory  2 bytes
        // total number of entries in
        // the central dir on this disk    2 bytes
        // total number of entries in
        // the central dir                 2 bytes
        // size of the central directory   4 bytes
        // offset of start of central
        // directory with respect to
        // the starting disk number        4 bytes
        // zipfile comment length          2 bytes
        expect_magic(
            &mut eocdr,
            EOCDR_MAGIC,
            "Invalid End Of Central Directory Record",
        )?;
        let disk_number = read_u16(&mut eocdr)?;
        let disk_with_central_directory = read_u16(&mut eocdr)?;
        let entries_on_this_disk = read_u16(&mut eocdr)?;
        let entries = read_u16(&mut eocdr)?;
        let central_directory_size = read_u32(&mut eocdr)?;
        let central_directory_offset = read_u32(&mut eocdr)?;
        // zipfile comment length and the comment itself are of no use to us.

        Ok(Self {
            disk_number,
            disk_with_central_directory,
            entries_on_this_disk,
            entries,
            central_directory_size,
            central_directory_offset,
        })
    }

    /// True if any field holds the 0xFFFF(FFFF) placeholder that means
    /// "look in the Zip64 record instead".
    pub fn defers_to_zip64(&self) -> bool {
        self.entries == u16::MAX
            || self.entries_on_this_disk == u16::MAX
            || self.central_directory_size == u32::MAX
            || self.central_directory_offset == u32::MAX
    }
}

/// Searches backward through `mapping` to find the
/// End of central directory record.
///
/// It should be right at the end of the file,
/// but its variable-length comment means we can't jump to a known offset.
pub fn find_eocdr(mapping: &[u8]) -> ZipResult<usize> {
    memmem::rfind(mapping, &EOCDR_MAGIC).ok_or(ZipError::InvalidArchive(
        "Couldn't find End Of Central Directory Record",
    ))
}

/// True if a Zip64 end of central directory locator immediately precedes
/// the EOCDR at `eocdr_posit`.
pub fn has_zip64_locator(mapping: &[u8], eocdr_posit: usize) -> bool {
    // 4.3.15 Zip64 end of central directory locator
    //
    // zip64 end of central dir locator
    // signature                       4 bytes  (0x07064b50)
    // ... 16 more bytes
    eocdr_posit
        .checked_sub(20)
        .map(|locator| mapping[locator..].starts_with(&ZIP64_EOCDR_LOCATOR_MAGIC))
        .unwrap_or(false)
}

/// Data from a central directory entry
///
/// Each of these records contains information about a file or folder
/// stored in the ZIP archive.
#[derive(Debug)]
pub struct CentralDirectoryEntry<'a> {
    pub flags: u16,
    pub compression_method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_number: u16,
    pub header_offset: u32,
    pub path: &'a [u8],
}

impl<'a> CentralDirectoryEntry<'a> {
    pub fn parse_and_consume(entry: &mut &'a [u8]) -> ZipResult<Self> {
        // 4.3.12  Central directory structure, file header:
        //
        //   central file header signature   4 bytes  (0x02014b50)
        //   version made by                 2 bytes
        //   version needed to extract       2 bytes
        //   general purpose bit flag        2 bytes
        //   compression method              2 bytes
        //   last mod file time              2 bytes
        //   last mod file date              2 bytes
        //   crc-32                          4 bytes
        //   compressed size                 4 bytes
        //   uncompressed size               4 bytes
        //   file name length                2 bytes
        //   extra field length              2 bytes
        //   file comment length             2 bytes
        //   disk number start               2 bytes
        //   internal file attributes        2 bytes
        //   external file attributes        4 bytes
        //   relative offset of local header 4 bytes
        //
        //   file name (variable size)
        //   extra field (variable size)
        //   file comment (variable size)
        expect_magic(
            entry,
            CENTRAL_DIRECTORY_MAGIC,
            "Invalid central directory entry",
        )?;
        // Version made by, version needed to extract
        take(entry, 4)?;
        let flags = read_u16(entry)?;
        let compression_method = read_u16(entry)?;
        // Last modified time and date; renaming doesn't care when.
        take(entry, 4)?;
        let crc32 = read_u32(entry)?;
        let compressed_size = read_u32(entry)?;
        let uncompressed_size = read_u32(entry)?;
        let path_length = usize(read_u16(entry)?)?;
        let extra_field_length = usize(read_u16(entry)?)?;
        let file_comment_length = usize(read_u16(entry)?)?;
        let disk_number = read_u16(entry)?;
        // Internal and external file attributes
        take(entry, 6)?;
        let header_offset = read_u32(entry)?;
        let path = take(entry, path_length)?;
        take(entry, extra_field_length)?;
        take(entry, file_comment_length)?;

        Ok(Self {
            flags,
            compression_method,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_number,
            header_offset,
            path,
        })
    }
}

/// Data from a local file header
///
/// Each file's actual contents is preceded by this header.
#[derive(Debug)]
pub struct LocalFileHeader<'a> {
    pub flags: u16,
    pub compression_method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub path: &'a [u8],
}

impl<'a> LocalFileHeader<'a> {
    /// Parses the header, leaving `header` pointing at the file's data.
    pub fn parse_and_consume(header: &mut &'a [u8]) -> ZipResult<Self> {
        // 4.3.7  Local file header:
        //
        // local file header signature     4 bytes  (0x04034b50)
        // version needed to extract       2 bytes
        // general purpose bit flag        2 bytes
        // compression method              2 bytes
        // last mod file time              2 bytes
        // last mod file date              2 bytes
        // crc-32                          4 bytes
        // compressed size                 4 bytes
        // uncompressed size               4 bytes
        // file name length                2 bytes
        // extra field length              2 bytes
        //
        // file name (variable size)
        // extra field (variable size)
        expect_magic(header, LOCAL_FILE_HEADER_MAGIC, "Invalid local file header")?;
        take(header, 2)?;
        let flags = read_u16(header)?;
        let compression_method = read_u16(header)?;
        take(header, 4)?;
        let crc32 = read_u32(header)?;
        let compressed_size = read_u32(header)?;
        let uncompressed_size = read_u32(header)?;
        let path_length = usize(read_u16(header)?)?;
        let extra_field_length = usize(read_u16(header)?)?;
        let path = take(header, path_length)?;
        take(header, extra_field_length)?;

        Ok(Self {
            flags,
            compression_method,
            crc32,
            compressed_size,
            uncompressed_size,
            path,
        })
    }

    /// True if CRC and sizes were left zero here and written in a
    /// data descriptor after the file's contents instead.
    pub fn has_data_descriptor(&self) -> bool {
        // Bit 3: If this bit is set, the fields crc-32, compressed
        //        size and uncompressed size are set to zero in the
        //        local header.  The correct values are put in the
        //        data descriptor immediately following the compressed
        //        data.
        self.flags & (1 << 3) != 0
    }
}

/// Extracts the "is this text UTF-8?" bit from the 16-bit flags field.
///
/// If false, text is assumed to be CP437.
fn is_utf8(flags: u16) -> bool {
    // Bit 11: Language encoding flag (EFS).  If this bit is set,
    //         the filename and comment fields for this file
    //         MUST be encoded using UTF-8. (see APPENDIX D)
    flags & (1 << 11) != 0
}

/// Extracts the "is this file encrypted?" bit from the 16-bit flags field.
fn is_encrypted(flags: u16) -> bool {
    // Bit 0: If set, indicates that the file is encrypted
    flags & 1 != 0
}

/// Decodes an entry's path per its flags.
fn decode_path(raw: &[u8], flags: u16) -> ZipResult<Cow<'_, Utf8Path>> {
    if is_utf8(flags) {
        let utf8 = std::str::from_utf8(raw)?;
        return Ok(Cow::Borrowed(Utf8Path::new(utf8)));
    }
    let decoded: Cow<str> = Cow::borrow_from_cp437(raw, &CP437_CONTROL);
    // No Cow<str> -> Cow<Utf8Path> conversion, so spell it out.
    Ok(match decoded {
        Cow::Borrowed(s) => Cow::Borrowed(Utf8Path::new(s)),
        Cow::Owned(s) => Cow::Owned(Utf8PathBuf::from(s)),
    })
}

impl<'a> EntryMetadata<'a> {
    /// Extracts `EntryMetadata` from a central directory entry
    pub(crate) fn from_cde(cde: &CentralDirectoryEntry<'a>) -> ZipResult<Self> {
        let path = decode_path(cde.path, cde.flags)?;

        if cde.disk_number != 0 {
            return Err(ZipError::UnsupportedArchive(format!(
                "No support for multi-disk archives: file {} claims to be on disk {}",
                path, cde.disk_number,
            )));
        }
        if cde.compressed_size == u32::MAX
            || cde.uncompressed_size == u32::MAX
            || cde.header_offset == u32::MAX
        {
            return Err(ZipError::UnsupportedArchive(format!(
                "No support for Zip64 entries: {path}"
            )));
        }

        Ok(Self {
            size: usize(cde.uncompressed_size)?,
            compressed_size: usize(cde.compressed_size)?,
            compression_method: CompressionMethod::from_u16(cde.compression_method),
            crc32: cde.crc32,
            encrypted: is_encrypted(cde.flags),
            path,
            header_offset: usize(cde.header_offset)?,
        })
    }

    /// Checks a local file header against what the central directory told us.
    pub(crate) fn check_local_header(&self, local: &LocalFileHeader) -> ZipResult<()> {
        if CompressionMethod::from_u16(local.compression_method) != self.compression_method {
            return Err(ZipError::InvalidArchive(
                "Local file header disagrees with central directory on compression method",
            ));
        }
        if decode_path(local.path, local.flags)?.as_str() != self.path.as_str() {
            return Err(ZipError::InvalidArchive(
                "Local file header disagrees with central directory on path",
            ));
        }
        if local.has_data_descriptor() {
            return Ok(());
        }
        if local.crc32 != self.crc32
            || usize(local.compressed_size)? != self.compressed_size
            || usize(local.uncompressed_size)? != self.size
        {
            return Err(ZipError::InvalidArchive(
                "Local file header disagrees with central directory on CRC or size",
            ));
        }
        Ok(())
    }
}
