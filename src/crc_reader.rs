//! A reader that checks an entry's CRC-32 once it has been read to the end

use std::io;
use std::io::prelude::*;

use crc32fast::Hasher;

/// Wraps a decompressing reader, hashing everything that passes through.
///
/// Hitting EOF with a checksum other than the one recorded in the archive
/// is reported as an `InvalidData` error instead of a clean end of stream.
pub struct Crc32Reader<R> {
    inner: R,
    hasher: Hasher,
    expected: u32,
}

impl<R> Crc32Reader<R> {
    pub fn new(inner: R, expected: u32) -> Crc32Reader<R> {
        Crc32Reader {
            inner,
            hasher: Hasher::new(),
            expected,
        }
    }

    fn verify(&self) -> io::Result<()> {
        let actual = self.hasher.clone().finalize();
        if actual == self.expected {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Invalid checksum: expected CRC-32 {:08x}, got {:08x}",
                    self.expected, actual
                ),
            ))
        }
    }
}

impl<R: Read> Read for Crc32Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        if count == 0 && !buf.is_empty() {
            self.verify()?;
        }
        self.hasher.update(&buf[..count]);
        Ok(count)
    }
}
