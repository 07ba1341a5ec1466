//! Format-driven writer.

use indexmap::IndexMap;
use packbuf_buffers::codec::{self, MAX_INT_WIDTH};
use packbuf_buffers::{BufferError, ByteBuf, Endian};
use tracing::trace;

use crate::error::{ArgRef, FormatError, Result};
use crate::format::{Count, Field, FieldKind, Format, ScopeKind, SeekKind, Token};
use crate::value::PackValue;
use crate::Packed;

/// Where field values are pulled from.
enum Source<'s, 'v> {
    Args {
        items: &'s [PackValue<'v>],
        next: usize,
    },
    Seq {
        items: &'s [PackValue<'v>],
        next: usize,
    },
    Map(&'s IndexMap<String, PackValue<'v>>),
}

impl<'s, 'v> Source<'s, 'v> {
    fn has_more(&self) -> bool {
        match self {
            Source::Args { items, next } | Source::Seq { items, next } => *next < items.len(),
            Source::Map(_) => false,
        }
    }

    fn pull(&mut self, key: Option<&str>) -> Result<(&'s PackValue<'v>, ArgRef)> {
        let (value, arg) = match self {
            Source::Args { items, next } => {
                let items: &'s [PackValue<'v>] = *items;
                let i = *next;
                *next += 1;
                (items.get(i), ArgRef::Arg(i))
            }
            Source::Seq { items, next } => {
                let items: &'s [PackValue<'v>] = *items;
                let i = *next;
                *next += 1;
                (items.get(i), ArgRef::Item(i))
            }
            Source::Map(map) => {
                let map: &'s IndexMap<String, PackValue<'v>> = *map;
                let key = key.unwrap_or_default();
                (map.get(key), ArgRef::Key(key.to_owned()))
            }
        };
        match value {
            Some(value) => Ok((value, arg)),
            None => Err(FormatError::MissingArgument(arg)),
        }
    }
}

fn type_error(arg: ArgRef, expected: &'static str, value: &PackValue<'_>) -> FormatError {
    FormatError::ArgumentType {
        arg,
        expected,
        found: value.kind(),
    }
}

pub(crate) struct Packer<'t, B: ByteBuf + ?Sized> {
    target: &'t mut B,
    pos: usize,
    endian: Endian,
    positions: Vec<PackValue<'static>>,
}

impl<'t, B: ByteBuf + ?Sized> Packer<'t, B> {
    pub(crate) fn new(target: &'t mut B, start: usize, endian: Endian) -> Self {
        let pos = start.min(target.len());
        Self {
            target,
            pos,
            endian,
            positions: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, format: &Format, args: &[PackValue<'_>]) -> Result<Packed> {
        let mut current = Source::Args {
            items: args,
            next: 0,
        };
        let mut outer = Vec::new();

        for token in &format.tokens {
            match token {
                Token::Field(field) => self.field(field, &mut current)?,
                Token::Seek { kind, amount } => self.seek(*kind, *amount),
                Token::Endian(endian) => self.endian = *endian,
                Token::Position => self.positions.push(PackValue::UInteger(self.pos as u64 + 1)),
                Token::Open { key, kind } => {
                    let (value, arg) = current.pull(key.as_deref())?;
                    let inner = match (kind, value) {
                        (ScopeKind::Sequence, PackValue::Array(items)) => Source::Seq {
                            items: items.as_slice(),
                            next: 0,
                        },
                        (ScopeKind::Mapping, PackValue::Object(map)) => Source::Map(map),
                        (ScopeKind::Sequence, other) => return Err(type_error(arg, "array", other)),
                        (ScopeKind::Mapping, other) => {
                            return Err(type_error(arg, "object", other))
                        }
                    };
                    outer.push(std::mem::replace(&mut current, inner));
                }
                Token::Close => {
                    if let Some(parent) = outer.pop() {
                        current = parent;
                    }
                }
            }
        }

        trace!(position = self.pos, len = self.target.len(), "packed");
        Ok(Packed {
            position: self.pos + 1,
            values: self.positions,
        })
    }

    fn field(&mut self, field: &Field, source: &mut Source<'_, '_>) -> Result<()> {
        match field.count {
            Count::Times(n) => {
                for _ in 0..n {
                    let (value, arg) = source.pull(field.key.as_deref())?;
                    self.write_field(field, value, arg)?;
                }
            }
            Count::Exhaust => {
                while source.has_more() {
                    let (value, arg) = source.pull(None)?;
                    self.write_field(field, value, arg)?;
                }
            }
        }
        Ok(())
    }

    fn seek(&mut self, kind: SeekKind, amount: usize) {
        let target = match kind {
            SeekKind::Absolute => amount.saturating_sub(1),
            SeekKind::Forward => self.pos.saturating_add(amount),
            SeekKind::Backward => self.pos.saturating_sub(amount),
        };
        self.pos = target.min(self.target.len());
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.pos = self.target.write_at(self.pos, bytes)?;
        Ok(())
    }

    fn write_field(&mut self, field: &Field, value: &PackValue<'_>, arg: ArgRef) -> Result<()> {
        let width = field.width;
        if field.kind.is_string() {
            let Some(s) = value.as_bytes() else {
                return Err(type_error(arg, "bytes", value));
            };
            return self.write_string(field, s);
        }

        let mut scratch = [0u8; MAX_INT_WIDTH];
        match field.kind {
            FieldKind::Int => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| type_error(arg, "integer", value))?;
                codec::write_int(&mut scratch, width, self.endian, n)?;
            }
            FieldKind::UInt => {
                let n = value
                    .as_u64()
                    .ok_or_else(|| type_error(arg, "integer", value))?;
                codec::write_uint(&mut scratch, width, self.endian, n)?;
            }
            _ => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| type_error(arg, "number", value))?;
                codec::write_float(&mut scratch, width, self.endian, n)?;
            }
        }
        self.write(&scratch[..width])
    }

    fn write_string(&mut self, field: &Field, s: &[u8]) -> Result<()> {
        let width = field.width;
        match field.kind {
            FieldKind::CString | FieldKind::ZString => {
                let len = if width == 0 { s.len() } else { s.len().min(width) };
                self.write(&s[..len])?;
                self.write(&[0])
            }
            FieldKind::Chars | FieldKind::Bytes => {
                let end = self
                    .pos
                    .checked_add(width)
                    .ok_or(BufferError::Alloc {
                        requested: usize::MAX,
                    })?;
                if end > self.target.len() {
                    self.target.resize(end)?;
                }
                let len = s.len().min(width);
                let dest = &mut self.target.bytes_mut()[self.pos..end];
                dest[..len].copy_from_slice(&s[..len]);
                dest[len..].fill(0);
                self.pos = end;
                Ok(())
            }
            _ => {
                let len = s.len();
                if width < MAX_INT_WIDTH && (len as u64) >> (width * 8) != 0 {
                    return Err(FormatError::LengthOverflow { len, width });
                }
                let mut prefix = [0u8; MAX_INT_WIDTH];
                codec::write_uint(&mut prefix, width, self.endian, len as u64)?;
                self.write(&prefix[..width])?;
                self.write(s)
            }
        }
    }
}
