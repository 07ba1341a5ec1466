//! Width-aware integer and float codec.
//!
//! Integers of 1 to 8 bytes are assembled from at most two 32-bit parts: a
//! low 4-byte word and a high word holding the remaining `width - 4` bytes.
//! Byte order decides which part comes first in memory.

use crate::{BufferError, Result};

/// Byte order used for multi-byte scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Endian {
    Little,
    Big,
    /// The byte order of the host.
    #[default]
    Native,
}

impl Endian {
    /// Resolves [`Endian::Native`] against the target and reports whether the
    /// order is big-endian.
    #[inline]
    pub const fn is_big(self) -> bool {
        match self {
            Endian::Big => true,
            Endian::Little => false,
            Endian::Native => cfg!(target_endian = "big"),
        }
    }
}

/// Largest supported integer width in bytes.
pub const MAX_INT_WIDTH: usize = 8;

#[inline]
fn check_int_width(width: usize) -> Result<()> {
    if width == 0 || width > MAX_INT_WIDTH {
        return Err(BufferError::InvalidWidth(width));
    }
    Ok(())
}

#[inline]
fn check_len(len: usize, width: usize) -> Result<()> {
    if len < width {
        return Err(BufferError::OutOfBounds { offset: width, len });
    }
    Ok(())
}

fn read_word(bytes: &[u8], width: usize, big: bool) -> u32 {
    let mut n = 0u32;
    if big {
        for &b in &bytes[..width] {
            n = (n << 8) | u32::from(b);
        }
    } else {
        for &b in bytes[..width].iter().rev() {
            n = (n << 8) | u32::from(b);
        }
    }
    n
}

fn write_word(dest: &mut [u8], width: usize, big: bool, value: u32) {
    for (i, slot) in dest[..width].iter_mut().enumerate() {
        let shift = if big { 8 * (width - 1 - i) } else { 8 * i };
        *slot = (value >> shift) as u8;
    }
}

/// Reads an unsigned integer of `width` bytes from the start of `bytes`.
pub fn read_uint(bytes: &[u8], width: usize, endian: Endian) -> Result<u64> {
    check_int_width(width)?;
    check_len(bytes.len(), width)?;
    let big = endian.is_big();
    if width <= 4 {
        return Ok(u64::from(read_word(bytes, width, big)));
    }
    let hi_width = width - 4;
    let (hi, lo) = if big {
        (
            read_word(bytes, hi_width, true),
            read_word(&bytes[hi_width..], 4, true),
        )
    } else {
        (
            read_word(&bytes[4..], hi_width, false),
            read_word(bytes, 4, false),
        )
    };
    Ok((u64::from(hi) << 32) | u64::from(lo))
}

/// Writes the low `width` bytes of `value` to the start of `dest`.
pub fn write_uint(dest: &mut [u8], width: usize, endian: Endian, value: u64) -> Result<()> {
    check_int_width(width)?;
    check_len(dest.len(), width)?;
    let big = endian.is_big();
    if width <= 4 {
        write_word(dest, width, big, value as u32);
        return Ok(());
    }
    let hi_width = width - 4;
    let hi = (value >> 32) as u32;
    let lo = value as u32;
    if big {
        write_word(dest, hi_width, true, hi);
        write_word(&mut dest[hi_width..], 4, true, lo);
    } else {
        write_word(dest, 4, false, lo);
        write_word(&mut dest[4..], hi_width, false, hi);
    }
    Ok(())
}

/// Sign-extends a `width`-byte two's-complement value into an `i64`.
///
/// Widths up to 4 are extended within a 32-bit register first, wider values
/// within 64 bits.
pub fn expand_sign(value: u64, width: usize) -> i64 {
    if width <= 4 {
        let mut n = value as u32;
        if width < 4 && width > 0 && n & (1u32 << (width * 8 - 1)) != 0 {
            n |= !0u32 << (width * 8);
        }
        i64::from(n as i32)
    } else {
        let mut n = value;
        if width < 8 && n & (1u64 << (width * 8 - 1)) != 0 {
            n |= !0u64 << (width * 8);
        }
        n as i64
    }
}

/// Reads a signed integer of `width` bytes.
pub fn read_int(bytes: &[u8], width: usize, endian: Endian) -> Result<i64> {
    read_uint(bytes, width, endian).map(|n| expand_sign(n, width))
}

/// Writes a signed integer narrowed to `width` bytes.
pub fn write_int(dest: &mut [u8], width: usize, endian: Endian, value: i64) -> Result<()> {
    write_uint(dest, width, endian, value as u64)
}

/// Reads an IEEE single (`width == 4`) or double (`width == 8`).
pub fn read_float(bytes: &[u8], width: usize, endian: Endian) -> Result<f64> {
    match width {
        4 => read_uint(bytes, 4, endian).map(|bits| f64::from(f32::from_bits(bits as u32))),
        8 => read_uint(bytes, 8, endian).map(f64::from_bits),
        _ => Err(BufferError::InvalidWidth(width)),
    }
}

/// Writes `value` as an IEEE single or double, narrowing for `width == 4`.
pub fn write_float(dest: &mut [u8], width: usize, endian: Endian, value: f64) -> Result<()> {
    match width {
        4 => write_uint(dest, 4, endian, u64::from((value as f32).to_bits())),
        8 => write_uint(dest, 8, endian, value.to_bits()),
        _ => Err(BufferError::InvalidWidth(width)),
    }
}
