//! [`PackValue`]: the dynamic value exchanged with the format interpreter.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde_json::Value;

/// A value consumed by pack or produced by unpack.
///
/// `Bytes` borrows from the unpacked input for lowercase string letters and
/// owns a copy for uppercase ones.
#[derive(Debug, Clone, PartialEq)]
pub enum PackValue<'a> {
    /// Data shortfall sentinel.
    Null,
    Integer(i64),
    UInteger(u64),
    Float(f64),
    Bytes(Cow<'a, [u8]>),
    /// Result of a positional `{ }` scope.
    Array(Vec<PackValue<'a>>),
    /// Result of a keyed `{ }` scope, in field order.
    Object(IndexMap<String, PackValue<'a>>),
}

impl<'a> PackValue<'a> {
    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PackValue::Null => "null",
            PackValue::Integer(_) => "integer",
            PackValue::UInteger(_) => "unsigned integer",
            PackValue::Float(_) => "float",
            PackValue::Bytes(_) => "bytes",
            PackValue::Array(_) => "array",
            PackValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PackValue::Null)
    }

    /// Integer view of a numeric value; floats truncate toward zero and
    /// unsigned values wrap.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PackValue::Integer(i) => Some(i),
            PackValue::UInteger(u) => Some(u as i64),
            PackValue::Float(f) => Some(f as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            PackValue::Integer(i) => Some(i as u64),
            PackValue::UInteger(u) => Some(u),
            PackValue::Float(f) => Some(f as i64 as u64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PackValue::Integer(i) => Some(i as f64),
            PackValue::UInteger(u) => Some(u as f64),
            PackValue::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PackValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PackValue<'a>]> {
        match self {
            PackValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, PackValue<'a>>> {
        match self {
            PackValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Detaches the value from any borrowed input.
    pub fn into_owned(self) -> PackValue<'static> {
        match self {
            PackValue::Null => PackValue::Null,
            PackValue::Integer(i) => PackValue::Integer(i),
            PackValue::UInteger(u) => PackValue::UInteger(u),
            PackValue::Float(f) => PackValue::Float(f),
            PackValue::Bytes(b) => PackValue::Bytes(Cow::Owned(b.into_owned())),
            PackValue::Array(items) => {
                PackValue::Array(items.into_iter().map(PackValue::into_owned).collect())
            }
            PackValue::Object(map) => PackValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_owned()))
                    .collect(),
            ),
        }
    }

    /// Converts JSON into a pack value. Strings become UTF-8 bytes and
    /// booleans become 0 or 1.
    pub fn from_json(value: &Value) -> PackValue<'static> {
        match value {
            Value::Null => PackValue::Null,
            Value::Bool(b) => PackValue::Integer(i64::from(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PackValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    PackValue::UInteger(u)
                } else {
                    PackValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => PackValue::Bytes(Cow::Owned(s.as_bytes().to_vec())),
            Value::Array(items) => PackValue::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => PackValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to JSON. Bytes are decoded as lossy UTF-8 and non-finite
    /// floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            PackValue::Null => Value::Null,
            PackValue::Integer(i) => Value::from(*i),
            PackValue::UInteger(u) => Value::from(*u),
            PackValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PackValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            PackValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PackValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for PackValue<'_> {
    fn from(v: i64) -> Self {
        PackValue::Integer(v)
    }
}

impl From<i32> for PackValue<'_> {
    fn from(v: i32) -> Self {
        PackValue::Integer(i64::from(v))
    }
}

impl From<u64> for PackValue<'_> {
    fn from(v: u64) -> Self {
        PackValue::UInteger(v)
    }
}

impl From<u32> for PackValue<'_> {
    fn from(v: u32) -> Self {
        PackValue::UInteger(u64::from(v))
    }
}

impl From<f64> for PackValue<'_> {
    fn from(v: f64) -> Self {
        PackValue::Float(v)
    }
}

impl<'a> From<&'a [u8]> for PackValue<'a> {
    fn from(v: &'a [u8]) -> Self {
        PackValue::Bytes(Cow::Borrowed(v))
    }
}

impl<'a> From<&'a str> for PackValue<'a> {
    fn from(v: &'a str) -> Self {
        PackValue::Bytes(Cow::Borrowed(v.as_bytes()))
    }
}

impl From<Vec<u8>> for PackValue<'_> {
    fn from(v: Vec<u8>) -> Self {
        PackValue::Bytes(Cow::Owned(v))
    }
}

impl From<String> for PackValue<'_> {
    fn from(v: String) -> Self {
        PackValue::Bytes(Cow::Owned(v.into_bytes()))
    }
}

impl<'a> From<Vec<PackValue<'a>>> for PackValue<'a> {
    fn from(v: Vec<PackValue<'a>>) -> Self {
        PackValue::Array(v)
    }
}

impl<'a> From<IndexMap<String, PackValue<'a>>> for PackValue<'a> {
    fn from(v: IndexMap<String, PackValue<'a>>) -> Self {
        PackValue::Object(v)
    }
}
