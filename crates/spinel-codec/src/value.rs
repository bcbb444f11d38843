use std::fmt;
use std::net::Ipv6Addr;

use bytes::Bytes;

use crate::error::{CodecError, Result};

/// A decoded property value.
///
/// One variant per wire shape. Accessors fail with
/// [`CodecError::TypeMismatch`] instead of coercing between shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    /// Any unsigned integer: `C`, `S`, `L`, `X` or packed `i`.
    Uint(u64),
    /// Any signed integer: `c`, `s`, `l`, `x`.
    Int(i64),
    Text(String),
    Data(Bytes),
    Ipv6(Ipv6Addr),
    Eui64([u8; 8]),
    Eui48([u8; 6]),
    Array(Vec<Value>),
    /// Positional fields of a tuple or `t(...)` struct.
    Tuple(Vec<Value>),
    Void,
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Uint(_) => "uint",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Data(_) => "data",
            Value::Ipv6(_) => "ipv6",
            Value::Eui64(_) => "eui64",
            Value::Eui48(_) => "eui48",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
            Value::Void => "void",
        }
    }

    fn mismatch(&self, expected: &'static str) -> CodecError {
        CodecError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Value::Uint(value) => Ok(*value),
            other => Err(other.mismatch("uint")),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        let value = self.as_u64()?;
        u32::try_from(value).map_err(|_| CodecError::OutOfRange {
            value: value.into(),
            symbol: 'L',
        })
    }

    pub fn as_u16(&self) -> Result<u16> {
        let value = self.as_u64()?;
        u16::try_from(value).map_err(|_| CodecError::OutOfRange {
            value: value.into(),
            symbol: 'S',
        })
    }

    pub fn as_u8(&self) -> Result<u8> {
        let value = self.as_u64()?;
        u8::try_from(value).map_err(|_| CodecError::OutOfRange {
            value: value.into(),
            symbol: 'C',
        })
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn as_i8(&self) -> Result<i8> {
        let value = self.as_i64()?;
        i8::try_from(value).map_err(|_| CodecError::OutOfRange {
            value: value.into(),
            symbol: 'c',
        })
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Text(value) => Ok(value),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn as_data(&self) -> Result<&Bytes> {
        match self {
            Value::Data(value) => Ok(value),
            other => Err(other.mismatch("data")),
        }
    }

    pub fn as_ipv6(&self) -> Result<Ipv6Addr> {
        match self {
            Value::Ipv6(value) => Ok(*value),
            other => Err(other.mismatch("ipv6")),
        }
    }

    pub fn as_eui64(&self) -> Result<[u8; 8]> {
        match self {
            Value::Eui64(value) => Ok(*value),
            other => Err(other.mismatch("eui64")),
        }
    }

    pub fn as_eui48(&self) -> Result<[u8; 6]> {
        match self {
            Value::Eui48(value) => Ok(*value),
            other => Err(other.mismatch("eui48")),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_tuple(&self) -> Result<&[Value]> {
        match self {
            Value::Tuple(items) => Ok(items),
            other => Err(other.mismatch("tuple")),
        }
    }

    /// Field `index` of a tuple, or `ArityMismatch` if the tuple is shorter.
    pub fn field(&self, index: usize) -> Result<&Value> {
        let items = self.as_tuple()?;
        items.get(index).ok_or(CodecError::ArityMismatch {
            expected: index + 1,
            found: items.len(),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Uint(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::Data(value) => f.write_str(&hex::encode(value)),
            Value::Ipv6(value) => write!(f, "{value}"),
            Value::Eui64(value) => f.write_str(&hex::encode(value)),
            Value::Eui48(value) => f.write_str(&hex::encode(value)),
            Value::Array(items) => write_list(f, "[", items, "]"),
            Value::Tuple(items) => write_list(f, "(", items, ")"),
            Value::Void => Ok(()),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

macro_rules! impl_from_uint {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Uint(value.into())
            }
        })*
    };
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Int(value.into())
            }
        })*
    };
}

impl_from_uint!(u8, u16, u32, u64);
impl_from_int!(i8, i16, i32, i64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Data(value)
    }
}

impl From<Ipv6Addr> for Value {
    fn from(value: Ipv6Addr) -> Self {
        Value::Ipv6(value)
    }
}
