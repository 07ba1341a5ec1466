//! Format-driven reader.

use std::borrow::Cow;

use indexmap::IndexMap;
use packbuf_buffers::{Endian, Reader};
use tracing::debug;

use crate::error::Result;
use crate::format::{Count, Field, FieldKind, Format, ScopeKind, SeekKind, Token};
use crate::value::PackValue;

/// A `{ }` scope being filled.
struct Frame<'a> {
    key: Option<String>,
    value: PackValue<'a>,
}

pub(crate) struct Unpacker<'a> {
    reader: Reader<'a>,
    frames: Vec<Frame<'a>>,
    values: Vec<PackValue<'a>>,
}

/// Result of reading one field.
enum Step<'a> {
    Value(PackValue<'a>),
    Shortfall,
}

impl<'a> Unpacker<'a> {
    pub(crate) fn new(data: &'a [u8], start: usize, endian: Endian) -> Self {
        let mut reader = Reader::new(data).with_endian(endian);
        reader.seek(start);
        Self {
            reader,
            frames: Vec::new(),
            values: Vec::new(),
        }
    }

    fn position(&self) -> PackValue<'a> {
        PackValue::UInteger(self.reader.x as u64 + 1)
    }

    fn sink(&mut self, key: Option<&str>, value: PackValue<'a>) {
        match self.frames.last_mut() {
            None => self.values.push(value),
            Some(frame) => match &mut frame.value {
                PackValue::Object(map) => {
                    map.insert(key.unwrap_or_default().to_owned(), value);
                }
                PackValue::Array(items) => items.push(value),
                _ => {}
            },
        }
    }

    pub(crate) fn run(mut self, format: &Format) -> Result<Vec<PackValue<'a>>> {
        let tokens = &format.tokens;
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Field(field) => {
                    if !self.field(field)? {
                        self.shortfall(field, &tokens[i + 1..]);
                        break;
                    }
                }
                Token::Seek { kind, amount } => self.seek(*kind, *amount),
                Token::Endian(endian) => self.reader.endian = *endian,
                Token::Position => {
                    let pos = self.position();
                    self.sink(None, pos);
                }
                Token::Open { key, kind } => {
                    let value = match kind {
                        ScopeKind::Sequence => PackValue::Array(Vec::new()),
                        ScopeKind::Mapping => PackValue::Object(IndexMap::new()),
                    };
                    self.frames.push(Frame {
                        key: key.clone(),
                        value,
                    });
                }
                Token::Close => {
                    if let Some(frame) = self.frames.pop() {
                        self.sink(frame.key.as_deref(), frame.value);
                    }
                }
            }
        }

        let mut values = self.values;
        if format.report_position {
            values.insert(0, PackValue::UInteger(self.reader.x as u64 + 1));
        }
        Ok(values)
    }

    /// Reads every repetition of `field`. Returns `false` on a shortfall.
    fn field(&mut self, field: &Field) -> Result<bool> {
        match field.count {
            Count::Times(n) => {
                for _ in 0..n {
                    match self.read(field)? {
                        Step::Value(v) => self.sink(field.key.as_deref(), v),
                        Step::Shortfall => return Ok(false),
                    }
                }
            }
            Count::Exhaust => {
                while self.reader.size() > 0 {
                    let before = self.reader.x;
                    match self.read(field)? {
                        Step::Value(v) => self.sink(field.key.as_deref(), v),
                        Step::Shortfall => return Ok(false),
                    }
                    if self.reader.x == before {
                        break;
                    }
                }
            }
        }
        Ok(true)
    }

    /// Drops partial scopes, records the sentinel and honours one trailing
    /// `#` past any scope delimiters.
    fn shortfall(&mut self, field: &Field, rest: &[Token]) {
        debug!(
            letter = %field.letter,
            cursor = self.reader.x,
            remaining = self.reader.size(),
            "unpack stopped on data shortfall"
        );
        self.frames.clear();
        self.values.push(PackValue::Null);
        let next = rest
            .iter()
            .find(|t| !matches!(t, Token::Open { .. } | Token::Close));
        if let Some(Token::Position) = next {
            let pos = self.position();
            self.values.push(pos);
        }
    }

    fn seek(&mut self, kind: SeekKind, amount: usize) {
        let target = match kind {
            SeekKind::Absolute => amount.saturating_sub(1),
            SeekKind::Forward => self.reader.x.saturating_add(amount),
            SeekKind::Backward => self.reader.x.saturating_sub(amount),
        };
        self.reader.seek(target);
    }

    fn read(&mut self, field: &Field) -> Result<Step<'a>> {
        let width = field.width;
        let step = match field.kind {
            FieldKind::CString | FieldKind::ZString => {
                let rest = &self.reader.data[self.reader.x..];
                let cap = if width == 0 { rest.len() } else { width.min(rest.len()) };
                let len = rest[..cap].iter().position(|&b| b == 0).unwrap_or(cap);
                let unterminated = len == rest.len() && (width == 0 || len < width);
                if field.kind == FieldKind::ZString && unterminated {
                    return Ok(Step::Shortfall);
                }
                let s = self.reader.buf_upto(len);
                if self.reader.peek() == Some(0) {
                    self.reader.x += 1;
                }
                Step::Value(bytes_value(field, s))
            }
            FieldKind::Chars => {
                let s = self.reader.buf_upto(width);
                Step::Value(bytes_value(field, s))
            }
            FieldKind::Bytes => match self.reader.buf(width) {
                Some(s) => Step::Value(bytes_value(field, s)),
                None => Step::Shortfall,
            },
            FieldKind::PString | FieldKind::Data => {
                let start = self.reader.x;
                let Some(len) = self.reader.uint(width)? else {
                    return Ok(Step::Shortfall);
                };
                let len = usize::try_from(len).unwrap_or(usize::MAX);
                if field.kind == FieldKind::Data && len > self.reader.size() {
                    self.reader.x = start;
                    return Ok(Step::Shortfall);
                }
                let s = self.reader.buf_upto(len);
                Step::Value(bytes_value(field, s))
            }
            FieldKind::Int => match self.reader.int(width)? {
                Some(n) => Step::Value(PackValue::Integer(n)),
                None => Step::Shortfall,
            },
            FieldKind::UInt => match self.reader.uint(width)? {
                Some(n) => Step::Value(PackValue::UInteger(n)),
                None => Step::Shortfall,
            },
            FieldKind::Float => match self.reader.float(width)? {
                Some(n) => Step::Value(PackValue::Float(n)),
                None => Step::Shortfall,
            },
        };
        Ok(step)
    }
}

fn bytes_value<'a>(field: &Field, bytes: &'a [u8]) -> PackValue<'a> {
    if field.owned {
        PackValue::Bytes(Cow::Owned(bytes.to_vec()))
    } else {
        PackValue::Bytes(Cow::Borrowed(bytes))
    }
}
