//! Format string tokenizer and validator.
//!
//! A format is parsed in full before anything is read or written, so a
//! malformed format never yields partial results. Grammar, per item:
//!
//! ```text
//! format := ['!'] item*
//! item   := [key '='] letter [width] ['*' [count] | '$']
//!         | '{' | '}' | '#' | '<' | '>' | '='
//! key    := [A-Za-z_][A-Za-z0-9_]*
//! ```
//!
//! Whitespace and `,` separate items and are ignored anywhere.

use packbuf_buffers::codec::MAX_INT_WIDTH;
use packbuf_buffers::Endian;

use crate::error::{FormatError, Result};

/// Data layout of a value-producing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `s`: NUL-terminated, end of input also terminates on unpack.
    CString,
    /// `z`: NUL-terminated, a terminator or the width cap is required.
    ZString,
    /// `c`: fixed width, short reads return what is left.
    Chars,
    /// `b`: fixed width, short reads are a shortfall.
    Bytes,
    /// `p`: length prefix, a declared length past the end is clamped.
    PString,
    /// `d`: length prefix, a declared length past the end is a shortfall.
    Data,
    Int,
    UInt,
    Float,
}

impl FieldKind {
    fn from_letter(letter: u8) -> Option<Self> {
        Some(match letter.to_ascii_lowercase() {
            b's' => FieldKind::CString,
            b'z' => FieldKind::ZString,
            b'c' => FieldKind::Chars,
            b'b' => FieldKind::Bytes,
            b'p' => FieldKind::PString,
            b'd' => FieldKind::Data,
            b'i' => FieldKind::Int,
            b'u' => FieldKind::UInt,
            b'f' => FieldKind::Float,
            _ => return None,
        })
    }

    /// Width used when none (or zero) is given.
    fn default_width(self) -> usize {
        match self {
            FieldKind::CString | FieldKind::ZString => 0,
            FieldKind::Chars | FieldKind::Bytes => 1,
            FieldKind::PString | FieldKind::Data | FieldKind::Int | FieldKind::UInt => 4,
            FieldKind::Float => 4,
        }
    }

    fn accepts_width(self, width: usize) -> bool {
        match self {
            FieldKind::PString | FieldKind::Data | FieldKind::Int | FieldKind::UInt => {
                (1..=MAX_INT_WIDTH).contains(&width)
            }
            FieldKind::Float => width == 4 || width == 8,
            _ => true,
        }
    }

    pub fn is_string(self) -> bool {
        !matches!(self, FieldKind::Int | FieldKind::UInt | FieldKind::Float)
    }
}

/// Repeat count of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Times(usize),
    /// `$`: until the arguments (pack) or the input (unpack) run out.
    Exhaust,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub letter: char,
    pub kind: FieldKind,
    /// Uppercase letter: unpacked bytes are an owned copy.
    pub owned: bool,
    /// Width after defaults; zero only for uncapped strings.
    pub width: usize,
    pub count: Count,
    pub key: Option<String>,
    /// Byte offset of the letter in the format string.
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekKind {
    /// `@`: 1-based absolute address. Addresses below 1, including a bare
    /// `@`, rewind to the start; addresses past the end clamp to the end.
    Absolute,
    /// `+`
    Forward,
    /// `-`
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Sequence,
    Mapping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Field(Field),
    Seek { kind: SeekKind, amount: usize },
    Endian(Endian),
    /// `#`
    Position,
    Open { key: Option<String>, kind: ScopeKind },
    Close,
}

/// A validated format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Leading `!`: unpack reports the final cursor before its values.
    pub report_position: bool,
    pub tokens: Vec<Token>,
}

impl Format {
    pub fn parse(format: &str) -> Result<Self> {
        Parser::new(format).run()
    }
}

struct Scope {
    open_index: usize,
    kind: Option<ScopeKind>,
}

struct Parser<'f> {
    src: &'f str,
    bytes: &'f [u8],
    x: usize,
    tokens: Vec<Token>,
    scopes: Vec<Scope>,
}

fn is_separator(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b',')
}

impl<'f> Parser<'f> {
    fn new(src: &'f str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            x: 0,
            tokens: Vec::new(),
            scopes: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.x).copied()
    }

    fn skip_separators(&mut self) {
        while self.peek().is_some_and(is_separator) {
            self.x += 1;
        }
    }

    /// Decimal number; saturates instead of overflowing.
    fn number(&mut self) -> Option<usize> {
        let start = self.x;
        let mut n: usize = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            n = n.saturating_mul(10).saturating_add(usize::from(d - b'0'));
            self.x += 1;
        }
        (self.x > start).then_some(n)
    }

    /// Consumes `name =` if present, otherwise leaves the cursor alone.
    fn key(&mut self) -> Option<(String, usize)> {
        let start = self.x;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
            _ => return None,
        }
        self.x += 1;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.x += 1;
        }
        let end = self.x;
        self.skip_separators();
        if self.peek() != Some(b'=') {
            self.x = start;
            return None;
        }
        self.x += 1;
        self.skip_separators();
        Some((self.src[start..end].to_owned(), start))
    }

    fn char_at(&self, pos: usize) -> char {
        self.src[pos..].chars().next().unwrap_or('\0')
    }

    /// Records a value-producing item in the innermost scope.
    fn note_value(&mut self, key: Option<&(String, usize)>, pos: usize) -> Result<()> {
        let Some(scope) = self.scopes.last_mut() else {
            return match key {
                Some((key, pos)) => Err(FormatError::KeyAtTopLevel {
                    key: key.clone(),
                    pos: *pos,
                }),
                None => Ok(()),
            };
        };
        let kind = if key.is_some() {
            ScopeKind::Mapping
        } else {
            ScopeKind::Sequence
        };
        match scope.kind {
            None => scope.kind = Some(kind),
            Some(existing) if existing != kind => return Err(FormatError::MixedKeys { pos }),
            Some(_) => {}
        }
        Ok(())
    }

    fn run(mut self) -> Result<Format> {
        self.skip_separators();
        let report_position = self.peek() == Some(b'!');
        if report_position {
            self.x += 1;
        }

        loop {
            self.skip_separators();
            let key = self.key();
            let Some(letter) = self.peek() else {
                if let Some((key, pos)) = key {
                    return Err(FormatError::KeyWithoutFormat { key, pos });
                }
                break;
            };
            let pos = self.x;
            self.x += 1;

            if letter != b'{' && !letter.is_ascii_alphabetic() {
                if let Some((key, pos)) = key {
                    return Err(FormatError::KeyWithoutFormat { key, pos });
                }
            }

            match letter {
                b'{' => {
                    self.note_value(key.as_ref(), pos)?;
                    self.scopes.push(Scope {
                        open_index: self.tokens.len(),
                        kind: None,
                    });
                    self.tokens.push(Token::Open {
                        key: key.map(|(k, _)| k),
                        kind: ScopeKind::Sequence,
                    });
                    continue;
                }
                b'}' => {
                    let scope = self.scopes.pop().ok_or(FormatError::UnopenedScope { pos })?;
                    if let Some(Token::Open { kind, .. }) = self.tokens.get_mut(scope.open_index) {
                        *kind = scope.kind.unwrap_or(ScopeKind::Sequence);
                    }
                    self.tokens.push(Token::Close);
                    continue;
                }
                b'#' => {
                    if !self.scopes.is_empty() {
                        return Err(FormatError::PositionInScope { pos });
                    }
                    self.tokens.push(Token::Position);
                    continue;
                }
                b'<' => {
                    self.tokens.push(Token::Endian(Endian::Little));
                    continue;
                }
                b'>' => {
                    self.tokens.push(Token::Endian(Endian::Big));
                    continue;
                }
                b'=' => {
                    self.tokens.push(Token::Endian(Endian::Native));
                    continue;
                }
                _ => {}
            }

            let (width, count) = self.args();
            let ch = self.char_at(pos);

            let seek = match letter {
                b'@' => Some(SeekKind::Absolute),
                b'+' => Some(SeekKind::Forward),
                b'-' => Some(SeekKind::Backward),
                _ => None,
            };
            if let Some(kind) = seek {
                let Count::Times(count) = count else {
                    return Err(FormatError::InvalidCount { letter: ch, pos });
                };
                self.tokens.push(Token::Seek {
                    kind,
                    amount: width.unwrap_or(0).saturating_mul(count),
                });
                continue;
            }

            let kind = FieldKind::from_letter(letter)
                .ok_or(FormatError::InvalidLetter { letter: ch, pos })?;
            let width = match width {
                Some(w) if w > 0 => w,
                _ => kind.default_width(),
            };
            if !kind.accepts_width(width) {
                return Err(FormatError::InvalidWidth {
                    letter: ch,
                    width,
                    pos,
                });
            }
            if let Some((key, key_pos)) = &key {
                if count != Count::Times(1) {
                    return Err(FormatError::KeyedRepeat {
                        key: key.clone(),
                        pos: *key_pos,
                    });
                }
            }
            self.note_value(key.as_ref(), pos)?;
            self.tokens.push(Token::Field(Field {
                letter: ch,
                kind,
                owned: letter.is_ascii_uppercase(),
                width,
                count,
                key: key.map(|(k, _)| k),
                pos,
            }));
        }

        if !self.scopes.is_empty() {
            return Err(FormatError::UnclosedScope);
        }
        Ok(Format {
            report_position,
            tokens: self.tokens,
        })
    }

    /// Optional width, then an optional `*count` or `$`.
    fn args(&mut self) -> (Option<usize>, Count) {
        self.skip_separators();
        let width = self.number();
        self.skip_separators();
        let count = match self.peek() {
            Some(b'*') => {
                self.x += 1;
                self.skip_separators();
                Count::Times(self.number().unwrap_or(1))
            }
            Some(b'$') => {
                self.x += 1;
                Count::Exhaust
            }
            _ => Count::Times(1),
        };
        (width, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(format: &str) -> Vec<Field> {
        Format::parse(format)
            .unwrap()
            .tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Field(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn widths_and_counts() {
        let f = fields("i4 u2*3 c f8$ z p");
        let summary: Vec<_> = f.iter().map(|f| (f.letter, f.width, f.count)).collect();
        assert_eq!(
            summary,
            vec![
                ('i', 4, Count::Times(1)),
                ('u', 2, Count::Times(3)),
                ('c', 1, Count::Times(1)),
                ('f', 8, Count::Exhaust),
                ('z', 0, Count::Times(1)),
                ('p', 4, Count::Times(1)),
            ]
        );
    }

    #[test]
    fn zero_width_means_default() {
        assert_eq!(fields("i0")[0].width, 4);
        assert_eq!(fields("b0")[0].width, 1);
    }

    #[test]
    fn bare_star_repeats_once() {
        assert_eq!(fields("i*")[0].count, Count::Times(1));
    }

    #[test]
    fn separators_are_ignored() {
        assert_eq!(fields(" i 2 ,\t* 3\n").len(), 1);
        assert_eq!(fields(" i 2 ,\t* 3\n")[0].count, Count::Times(3));
    }

    #[test]
    fn uppercase_is_owned() {
        let f = fields("zZ");
        assert!(!f[0].owned);
        assert!(f[1].owned);
        assert_eq!(f[1].kind, FieldKind::ZString);
    }

    #[test]
    fn scope_kind_is_decided_by_first_field() {
        let format = Format::parse("{x=i4, y=i4}{i4}{}").unwrap();
        let kinds: Vec<_> = format
            .tokens
            .iter()
            .filter_map(|t| match t {
                Token::Open { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![ScopeKind::Mapping, ScopeKind::Sequence, ScopeKind::Sequence]
        );
    }

    #[test]
    fn keyed_nested_scope() {
        let format = Format::parse("{pt={i1 i1} n=u2}").unwrap();
        assert_eq!(
            format.tokens[1],
            Token::Open {
                key: Some("pt".into()),
                kind: ScopeKind::Sequence
            }
        );
        assert_eq!(
            format.tokens[0],
            Token::Open {
                key: None,
                kind: ScopeKind::Mapping
            }
        );
    }

    #[test]
    fn seeks() {
        let format = Format::parse("@5 +2*3 -").unwrap();
        assert_eq!(
            format.tokens,
            vec![
                Token::Seek {
                    kind: SeekKind::Absolute,
                    amount: 5
                },
                Token::Seek {
                    kind: SeekKind::Forward,
                    amount: 6
                },
                Token::Seek {
                    kind: SeekKind::Backward,
                    amount: 0
                },
            ]
        );
    }

    #[test]
    fn directives() {
        let format = Format::parse("!<>=#").unwrap();
        assert!(format.report_position);
        assert_eq!(
            format.tokens,
            vec![
                Token::Endian(Endian::Little),
                Token::Endian(Endian::Big),
                Token::Endian(Endian::Native),
                Token::Position,
            ]
        );
    }

    #[test]
    fn parse_errors() {
        let cases: Vec<(&str, FormatError)> = vec![
            ("i4 q", FormatError::InvalidLetter { letter: 'q', pos: 3 }),
            (
                "i9",
                FormatError::InvalidWidth {
                    letter: 'i',
                    width: 9,
                    pos: 0,
                },
            ),
            (
                "f2",
                FormatError::InvalidWidth {
                    letter: 'f',
                    width: 2,
                    pos: 0,
                },
            ),
            ("+4$", FormatError::InvalidCount { letter: '+', pos: 0 }),
            ("{i4", FormatError::UnclosedScope),
            ("i4}", FormatError::UnopenedScope { pos: 2 }),
            (
                "x=i4",
                FormatError::KeyAtTopLevel {
                    key: "x".into(),
                    pos: 0,
                },
            ),
            (
                "{x=}",
                FormatError::KeyWithoutFormat {
                    key: "x".into(),
                    pos: 1,
                },
            ),
            (
                "{x=",
                FormatError::KeyWithoutFormat {
                    key: "x".into(),
                    pos: 1,
                },
            ),
            ("{x=i4 i4}", FormatError::MixedKeys { pos: 6 }),
            ("{i4 x=i4}", FormatError::MixedKeys { pos: 6 }),
            ("{#}", FormatError::PositionInScope { pos: 1 }),
            (
                "{x=i4*2}",
                FormatError::KeyedRepeat {
                    key: "x".into(),
                    pos: 1,
                },
            ),
        ];
        for (format, expected) in cases {
            assert_eq!(Format::parse(format), Err(expected), "{format}");
        }
    }

    #[test]
    fn directives_do_not_decide_scope_kind() {
        let format = Format::parse("{> +1 x=i2}").unwrap();
        assert!(matches!(
            format.tokens[0],
            Token::Open {
                kind: ScopeKind::Mapping,
                ..
            }
        ));
    }

    #[test]
    fn identifier_without_equals_is_a_letter() {
        let f = fields("{i4}");
        assert_eq!(f[0].key, None);
        assert_eq!(f[0].kind, FieldKind::Int);
    }
}
