use std::fmt;

use crate::error::{CodecError, Result};

/// Parsed format descriptor.
///
/// Descriptor strings are compact: one symbol per field, `t(...)` for a
/// length-prefixed struct and `A(...)` for an array that repeats until the
/// enclosing buffer is exhausted. Several symbols in a row form a tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// `b`
    Bool,
    /// `C`
    U8,
    /// `c`
    I8,
    /// `S`
    U16,
    /// `s`
    I16,
    /// `L`
    U32,
    /// `l`
    I32,
    /// `X`
    U64,
    /// `x`
    I64,
    /// `i`, base-128 packed unsigned integer.
    Packed,
    /// `6`, 16-byte IPv6 address.
    Ipv6,
    /// `E`, EUI-64.
    Eui64,
    /// `e`, EUI-48.
    Eui48,
    /// `D`, data to the end of the buffer.
    Data,
    /// `d`, data with a 16-bit length prefix.
    DataWithLen,
    /// `U`, NUL-terminated UTF-8.
    Utf8,
    /// `.`
    Void,
    /// `t(...)`
    Struct(Vec<Descriptor>),
    /// `A(...)`
    Array(Box<Descriptor>),
    /// Unprefixed sequence of two or more descriptors.
    Tuple(Vec<Descriptor>),
}

impl Descriptor {
    /// Parse a descriptor string.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let bytes = descriptor.as_bytes();
        let mut pos = 0usize;
        let items = parse_sequence(bytes, &mut pos, false)?;
        if items.is_empty() {
            return Err(CodecError::InvalidDescriptor("empty descriptor".into()));
        }
        Ok(collapse(items))
    }

    /// The symbol for scalar descriptors.
    pub fn symbol(&self) -> Option<char> {
        let symbol = match self {
            Descriptor::Bool => 'b',
            Descriptor::U8 => 'C',
            Descriptor::I8 => 'c',
            Descriptor::U16 => 'S',
            Descriptor::I16 => 's',
            Descriptor::U32 => 'L',
            Descriptor::I32 => 'l',
            Descriptor::U64 => 'X',
            Descriptor::I64 => 'x',
            Descriptor::Packed => 'i',
            Descriptor::Ipv6 => '6',
            Descriptor::Eui64 => 'E',
            Descriptor::Eui48 => 'e',
            Descriptor::Data => 'D',
            Descriptor::DataWithLen => 'd',
            Descriptor::Utf8 => 'U',
            Descriptor::Void => '.',
            Descriptor::Struct(_) | Descriptor::Array(_) | Descriptor::Tuple(_) => return None,
        };
        Some(symbol)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Struct(items) => {
                f.write_str("t(")?;
                for item in items {
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Descriptor::Array(element) => write!(f, "A({element})"),
            Descriptor::Tuple(items) => {
                for item in items {
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            scalar => match scalar.symbol() {
                Some(symbol) => write!(f, "{symbol}"),
                None => Ok(()),
            },
        }
    }
}

impl std::str::FromStr for Descriptor {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn scalar(symbol: u8) -> Option<Descriptor> {
    let descriptor = match symbol {
        b'b' => Descriptor::Bool,
        b'C' => Descriptor::U8,
        b'c' => Descriptor::I8,
        b'S' => Descriptor::U16,
        b's' => Descriptor::I16,
        b'L' => Descriptor::U32,
        b'l' => Descriptor::I32,
        b'X' => Descriptor::U64,
        b'x' => Descriptor::I64,
        b'i' => Descriptor::Packed,
        b'6' => Descriptor::Ipv6,
        b'E' => Descriptor::Eui64,
        b'e' => Descriptor::Eui48,
        b'D' => Descriptor::Data,
        b'd' => Descriptor::DataWithLen,
        b'U' => Descriptor::Utf8,
        b'.' => Descriptor::Void,
        _ => return None,
    };
    Some(descriptor)
}

fn collapse(mut items: Vec<Descriptor>) -> Descriptor {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Descriptor::Tuple(items)
    }
}

/// An array element must consume some bytes and must not run to the end of
/// the buffer, otherwise consecutive elements cannot be told apart.
fn repeatable(element: &[Descriptor]) -> bool {
    !matches!(
        element.last(),
        Some(Descriptor::Data | Descriptor::Array(_))
    ) && element.iter().any(|item| *item != Descriptor::Void)
}

fn parse_sequence(bytes: &[u8], pos: &mut usize, nested: bool) -> Result<Vec<Descriptor>> {
    let mut items = Vec::new();
    loop {
        let Some(&symbol) = bytes.get(*pos) else {
            if nested {
                return Err(CodecError::InvalidDescriptor("unclosed group".into()));
            }
            return Ok(items);
        };
        *pos += 1;

        match symbol {
            b')' if nested => return Ok(items),
            b')' => {
                return Err(CodecError::InvalidDescriptor(format!(
                    "unbalanced ')' at offset {}",
                    *pos - 1
                )))
            }
            b't' | b'A' => {
                if bytes.get(*pos) != Some(&b'(') {
                    return Err(CodecError::InvalidDescriptor(format!(
                        "'{}' must be followed by '('",
                        symbol as char
                    )));
                }
                *pos += 1;
                let inner = parse_sequence(bytes, pos, true)?;
                if inner.is_empty() {
                    return Err(CodecError::InvalidDescriptor("empty group".into()));
                }
                if symbol == b'A' && !repeatable(&inner) {
                    return Err(CodecError::InvalidDescriptor(format!(
                        "array element ending at offset {} has no fixed extent",
                        *pos - 1
                    )));
                }
                items.push(if symbol == b't' {
                    Descriptor::Struct(inner)
                } else {
                    Descriptor::Array(Box::new(collapse(inner)))
                });
            }
            other => match scalar(other) {
                Some(descriptor) => items.push(descriptor),
                None => {
                    return Err(CodecError::InvalidDescriptor(format!(
                        "unknown symbol '{}'",
                        other as char
                    )))
                }
            },
        }
    }
}

const fn is_scalar_symbol(symbol: u8) -> bool {
    matches!(
        symbol,
        b'b' | b'C'
            | b'c'
            | b'S'
            | b's'
            | b'L'
            | b'l'
            | b'X'
            | b'x'
            | b'i'
            | b'6'
            | b'E'
            | b'e'
            | b'D'
            | b'd'
            | b'U'
            | b'.'
    )
}

/// Index of the `(` matching the `)` at `close`, assuming balanced input.
const fn opening_paren(bytes: &[u8], close: usize) -> usize {
    let mut depth = 0usize;
    let mut i = close;
    loop {
        if bytes[i] == b')' {
            depth += 1;
        } else if bytes[i] == b'(' {
            depth -= 1;
            if depth == 0 {
                return i;
            }
        }
        i -= 1;
    }
}

/// Const counterpart of `repeatable` over the raw element text.
const fn repeatable_text(bytes: &[u8], start: usize, end: usize) -> bool {
    let last = bytes[end - 1];
    if last == b'D' {
        return false;
    }
    if last == b')' && bytes[opening_paren(bytes, end - 1) - 1] == b'A' {
        return false;
    }
    let mut i = start;
    while i < end {
        if bytes[i] != b'.' {
            return true;
        }
        i += 1;
    }
    false
}

/// Compile-time check that a descriptor string parses.
///
/// Accepts exactly the strings [`Descriptor::parse`] accepts.
pub const fn is_well_formed(descriptor: &str) -> bool {
    let bytes = descriptor.as_bytes();
    if bytes.is_empty() {
        return false;
    }

    let mut depth = 0usize;
    let mut just_opened = false;
    let mut i = 0usize;
    while i < bytes.len() {
        let symbol = bytes[i];
        if symbol == b't' || symbol == b'A' {
            if i + 1 >= bytes.len() || bytes[i + 1] != b'(' {
                return false;
            }
            depth += 1;
            just_opened = true;
            i += 2;
            continue;
        }

        if symbol == b')' {
            if depth == 0 || just_opened {
                return false;
            }
            let open = opening_paren(bytes, i);
            if bytes[open - 1] == b'A' && !repeatable_text(bytes, open + 1, i) {
                return false;
            }
            depth -= 1;
        } else if !is_scalar_symbol(symbol) {
            return false;
        }

        just_opened = false;
        i += 1;
    }

    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars() {
        assert_eq!(Descriptor::parse("C").unwrap(), Descriptor::U8);
        assert_eq!(Descriptor::parse("U").unwrap(), Descriptor::Utf8);
        assert_eq!(Descriptor::parse("6").unwrap(), Descriptor::Ipv6);
    }

    #[test]
    fn multiple_symbols_form_a_tuple() {
        assert_eq!(
            Descriptor::parse("dD").unwrap(),
            Descriptor::Tuple(vec![Descriptor::DataWithLen, Descriptor::Data])
        );
    }

    #[test]
    fn parses_nested_groups() {
        let parsed = Descriptor::parse("A(t(6CLL))").unwrap();
        assert_eq!(
            parsed,
            Descriptor::Array(Box::new(Descriptor::Struct(vec![
                Descriptor::Ipv6,
                Descriptor::U8,
                Descriptor::U32,
                Descriptor::U32,
            ])))
        );
    }

    #[test]
    fn display_roundtrips() {
        for text in ["i", "ii", "A(C)", "Cct(ESSC)t(iCUdd)", "A(t(ESLLCCcCc))", "dD"] {
            assert_eq!(Descriptor::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn rejects_malformed() {
        for text in ["", "Q", "t", "A(", "t()", "C)", "A(C", "tC"] {
            assert!(Descriptor::parse(text).is_err(), "{text:?} should not parse");
        }
    }

    #[test]
    fn rejects_array_elements_without_extent() {
        for text in ["A(.)", "A(D)", "A(CD)", "A(..)", "A(A(C))", "CA(t(C)D)"] {
            assert!(Descriptor::parse(text).is_err(), "{text:?} should not parse");
        }
        for text in ["A(C.)", "A(t(D))", "A(t(.))", "A(d)", "A(t(A(C)))", "CD"] {
            assert!(Descriptor::parse(text).is_ok(), "{text:?} should parse");
        }
    }

    #[test]
    fn const_check_agrees_with_parser() {
        for text in [
            "", "Q", "t", "A(", "t()", "C)", "A(C", "tC", "i", "ii", "A(C)", "A(i)", "dD",
            "Cct(ESSC)t(iCUdd)", "A(t(6CLL))", "SSSSSSSSSSSSSSSS", "A(A(C))", ".",
            "A(.)", "A(D)", "A(CD)", "A(C.)", "A(t(D))", "A(t(A(C)))", "CA(t(C)D)",
        ] {
            assert_eq!(
                is_well_formed(text),
                Descriptor::parse(text).is_ok(),
                "disagreement on {text:?}"
            );
        }
    }

    const _: () = assert!(is_well_formed("A(t(ESLLCCcCc))"));
}
