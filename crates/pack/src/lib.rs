//! Format-string driven binary pack/unpack.
//!
//! A format is a sequence of single-letter fields, each optionally followed
//! by a width and a repeat count:
//!
//! | Letter | Field | Default width |
//! |---|---|---|
//! | `s` `z` | NUL-terminated string, width caps the length | uncapped |
//! | `c` `b` | fixed-width bytes, zero padded on pack | 1 |
//! | `p` `d` | bytes preceded by a width-byte length | 4 |
//! | `i` `u` | signed / unsigned integer, 1 to 8 bytes | 4 |
//! | `f` | IEEE float, 4 or 8 bytes | 4 |
//!
//! Uppercase letters unpack to owned bytes; lowercase ones borrow from the
//! input. `*n` repeats a field, `$` repeats it until the arguments (pack) or
//! the input (unpack) run out. `<`, `>` and `=` select little, big or native
//! byte order. `@n`, `+n` and `-n` move the cursor. `#` yields the cursor
//! (1-based). `{ }` nests a sequence, or a mapping when its fields carry
//! `name=` keys. A leading `!` makes unpack report the final cursor first.
//!
//! Running out of input while unpacking is not an error: a `Null` takes the
//! place of the field and the rest of the format is skipped.
//!
//! # Example
//!
//! ```
//! use packbuf_pack::{pack, unpack, PackValue};
//!
//! let (store, packed) = pack(">u2 z", &[513.into(), "hi".into()]).unwrap();
//! assert_eq!(store.as_slice(), b"\x02\x01hi\0");
//! assert_eq!(packed.position, 6);
//!
//! let values = unpack(store.as_slice(), ">u2 z i4").unwrap();
//! assert_eq!(
//!     values,
//!     vec![PackValue::UInteger(513), "hi".into(), PackValue::Null]
//! );
//! ```

mod error;
pub mod format;
mod pack;
mod unpack;
mod value;

pub use error::{ArgRef, FormatError, Result};
pub use format::Format;
pub use packbuf_buffers::{ByteBuf, ByteStore, Endian};
pub use value::PackValue;

/// Cursor and byte order a call starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// Start offset, clamped to the buffer length. Defaults to 0.
    pub start: Option<usize>,
    pub endian: Endian,
}

impl PackOptions {
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }
}

/// Outcome of a pack call.
#[derive(Debug, Clone, PartialEq)]
pub struct Packed {
    /// Final cursor, 1-based.
    pub position: usize,
    /// Values produced by `#` fields, in order.
    pub values: Vec<PackValue<'static>>,
}

/// Packs `args` into a fresh store.
pub fn pack(format: &str, args: &[PackValue<'_>]) -> Result<(ByteStore, Packed)> {
    let mut store = ByteStore::new();
    let packed = pack_into(&mut store, &PackOptions::default(), format, args)?;
    Ok((store, packed))
}

/// Packs `args` into `target`, overwriting from the start offset and growing
/// the target as fields run past its end.
///
/// Parse errors leave the target untouched. An argument error stops the
/// call with the fields before it already written.
pub fn pack_into<B: ByteBuf + ?Sized>(
    target: &mut B,
    options: &PackOptions,
    format: &str,
    args: &[PackValue<'_>],
) -> Result<Packed> {
    let format = Format::parse(format)?;
    pack::Packer::new(target, options.start.unwrap_or(0), options.endian).run(&format, args)
}

/// Unpacks `data` from offset 0 in native byte order.
pub fn unpack<'a>(data: &'a [u8], format: &str) -> Result<Vec<PackValue<'a>>> {
    unpack_with(data, &PackOptions::default(), format)
}

/// Unpacks `data`. With a leading `!` the final cursor (1-based) comes
/// first in the result.
pub fn unpack_with<'a>(
    data: &'a [u8],
    options: &PackOptions,
    format: &str,
) -> Result<Vec<PackValue<'a>>> {
    let format = Format::parse(format)?;
    unpack::Unpacker::new(data, options.start.unwrap_or(0), options.endian).run(&format)
}
