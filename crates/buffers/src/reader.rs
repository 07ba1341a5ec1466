//! Binary buffer reader with cursor tracking.

use crate::codec::{self, Endian};
use crate::Result;

/// A binary reader over a byte slice.
///
/// The reader keeps a cursor and a byte order. Reads that would run past the
/// end return `None` and leave the cursor where it was.
///
/// # Example
///
/// ```
/// use packbuf_buffers::{Endian, Reader};
///
/// let data = [0x01, 0x02, 0x03, 0x04];
/// let mut reader = Reader::new(&data).with_endian(Endian::Big);
///
/// assert_eq!(reader.uint(1).unwrap(), Some(0x01));
/// assert_eq!(reader.uint(2).unwrap(), Some(0x0203));
/// assert_eq!(reader.uint(2).unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub data: &'a [u8],
    /// Current cursor position.
    pub x: usize,
    /// Byte order for scalar reads.
    pub endian: Endian,
}

impl<'a> Reader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            x: 0,
            endian: Endian::Native,
        }
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Total length of the underlying slice.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.data.len() - self.x
    }

    /// Moves the cursor, clamped to `[0, len]`.
    pub fn seek(&mut self, pos: usize) {
        self.x = pos.min(self.data.len());
    }

    /// Peeks at the current byte without advancing the cursor.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.x).copied()
    }

    /// Returns exactly `size` bytes and advances, or `None` if short.
    pub fn buf(&mut self, size: usize) -> Option<&'a [u8]> {
        if size > self.size() {
            return None;
        }
        let bin = &self.data[self.x..self.x + size];
        self.x += size;
        Some(bin)
    }

    /// Returns up to `size` bytes and advances past them.
    pub fn buf_upto(&mut self, size: usize) -> &'a [u8] {
        let size = size.min(self.size());
        let bin = &self.data[self.x..self.x + size];
        self.x += size;
        bin
    }

    /// Reads an unsigned integer of `width` bytes.
    pub fn uint(&mut self, width: usize) -> Result<Option<u64>> {
        let x = self.x;
        if width > self.size() {
            // Still report a bad width before a shortfall.
            return codec::read_uint(&[0; codec::MAX_INT_WIDTH], width, self.endian).map(|_| None);
        }
        let val = codec::read_uint(&self.data[x..], width, self.endian)?;
        self.x += width;
        Ok(Some(val))
    }

    /// Reads a sign-extended integer of `width` bytes.
    pub fn int(&mut self, width: usize) -> Result<Option<i64>> {
        Ok(self.uint(width)?.map(|n| codec::expand_sign(n, width)))
    }

    /// Reads an IEEE float of `width` (4 or 8) bytes.
    pub fn float(&mut self, width: usize) -> Result<Option<f64>> {
        let x = self.x;
        if width > self.size() {
            return codec::read_float(&[0; 8], width, self.endian).map(|_| None);
        }
        let val = codec::read_float(&self.data[x..], width, self.endian)?;
        self.x += width;
        Ok(Some(val))
    }
}
