use std::net::Ipv6Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::descriptor::Descriptor;
use crate::error::{CodecError, Result};
use crate::value::Value;

/// Longest packed encoding of a 32-bit value.
pub const MAX_PACKED_LEN: usize = 5;

/// Append `value` as a base-128 packed integer, least-significant group first.
pub fn put_packed(dst: &mut BytesMut, mut value: u32) {
    loop {
        let group = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            dst.put_u8(group);
            return;
        }
        dst.put_u8(group | 0x80);
    }
}

/// Read a packed integer from the front of `src`, advancing past it.
pub fn get_packed(src: &mut &[u8]) -> Result<u32> {
    let bytes: &[u8] = src;
    let mut value: u64 = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        if index == MAX_PACKED_LEN {
            return Err(CodecError::PackedOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            let value = u32::try_from(value).map_err(|_| CodecError::PackedOverflow)?;
            *src = &bytes[index + 1..];
            return Ok(value);
        }
    }
    Err(CodecError::UnterminatedPacked)
}

/// Encode `value` according to `descriptor`.
pub fn encode(value: &Value, descriptor: &Descriptor) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_into(value, descriptor, &mut dst)?;
    Ok(dst.freeze())
}

/// Parse `descriptor` and encode `value` with it.
pub fn encode_str(value: &Value, descriptor: &str) -> Result<Bytes> {
    encode(value, &Descriptor::parse(descriptor)?)
}

/// Decode one value from the front of `src`.
///
/// Returns the value and the number of bytes consumed. Never reads past the
/// end of `src`.
pub fn decode(src: &[u8], descriptor: &Descriptor) -> Result<(Value, usize)> {
    let mut buf = src;
    let value = decode_item(&mut buf, descriptor, false)?;
    Ok((value, src.len() - buf.len()))
}

/// Parse `descriptor` and decode with it.
pub fn decode_str(src: &[u8], descriptor: &str) -> Result<(Value, usize)> {
    decode(src, &Descriptor::parse(descriptor)?)
}

/// Append the encoding of `value` to `dst`.
pub fn encode_into(value: &Value, descriptor: &Descriptor, dst: &mut BytesMut) -> Result<()> {
    match descriptor {
        Descriptor::Bool => match value {
            Value::Bool(flag) => dst.put_u8(u8::from(*flag)),
            other => return Err(mismatch("bool", other)),
        },
        Descriptor::U8 => dst.put_u8(integer(value, 'C', 0, u8::MAX.into())? as u8),
        Descriptor::I8 => dst.put_i8(integer(value, 'c', i8::MIN.into(), i8::MAX.into())? as i8),
        Descriptor::U16 => dst.put_u16_le(integer(value, 'S', 0, u16::MAX.into())? as u16),
        Descriptor::I16 => {
            dst.put_i16_le(integer(value, 's', i16::MIN.into(), i16::MAX.into())? as i16)
        }
        Descriptor::U32 => dst.put_u32_le(integer(value, 'L', 0, u32::MAX.into())? as u32),
        Descriptor::I32 => {
            dst.put_i32_le(integer(value, 'l', i32::MIN.into(), i32::MAX.into())? as i32)
        }
        Descriptor::U64 => dst.put_u64_le(integer(value, 'X', 0, u64::MAX.into())? as u64),
        Descriptor::I64 => {
            dst.put_i64_le(integer(value, 'x', i64::MIN.into(), i64::MAX.into())? as i64)
        }
        Descriptor::Packed => put_packed(dst, integer(value, 'i', 0, u32::MAX.into())? as u32),
        Descriptor::Ipv6 => match value {
            Value::Ipv6(addr) => dst.put_slice(&addr.octets()),
            other => return Err(mismatch("ipv6", other)),
        },
        Descriptor::Eui64 => match value {
            Value::Eui64(id) => dst.put_slice(id),
            other => return Err(mismatch("eui64", other)),
        },
        Descriptor::Eui48 => match value {
            Value::Eui48(id) => dst.put_slice(id),
            other => return Err(mismatch("eui48", other)),
        },
        Descriptor::Data => match value {
            Value::Data(data) => dst.put_slice(data),
            other => return Err(mismatch("data", other)),
        },
        Descriptor::DataWithLen => match value {
            Value::Data(data) => {
                put_len(dst, data.len(), 'd')?;
                dst.put_slice(data);
            }
            other => return Err(mismatch("data", other)),
        },
        Descriptor::Utf8 => match value {
            Value::Text(text) => {
                if text.as_bytes().contains(&0) {
                    return Err(CodecError::InteriorNul);
                }
                dst.put_slice(text.as_bytes());
                dst.put_u8(0);
            }
            other => return Err(mismatch("text", other)),
        },
        Descriptor::Void => match value {
            Value::Void => {}
            other => return Err(mismatch("void", other)),
        },
        Descriptor::Struct(items) => {
            let mut body = BytesMut::new();
            encode_fields(value, items, &mut body)?;
            put_len(dst, body.len(), 't')?;
            dst.put_slice(&body);
        }
        Descriptor::Array(element) => match value {
            Value::Array(values) => {
                for item in values {
                    encode_into(item, element, dst)?;
                }
            }
            other => return Err(mismatch("array", other)),
        },
        Descriptor::Tuple(items) => encode_fields(value, items, dst)?,
    }
    Ok(())
}

fn encode_fields(value: &Value, items: &[Descriptor], dst: &mut BytesMut) -> Result<()> {
    let Value::Tuple(values) = value else {
        return Err(mismatch("tuple", value));
    };
    if values.len() != items.len() {
        return Err(CodecError::ArityMismatch {
            expected: items.len(),
            found: values.len(),
        });
    }
    for (item, descriptor) in values.iter().zip(items) {
        encode_into(item, descriptor, dst)?;
    }
    Ok(())
}

fn put_len(dst: &mut BytesMut, len: usize, symbol: char) -> Result<()> {
    let len = u16::try_from(len).map_err(|_| CodecError::OutOfRange {
        value: len as i128,
        symbol,
    })?;
    dst.put_u16_le(len);
    Ok(())
}

fn integer(value: &Value, symbol: char, min: i128, max: i128) -> Result<i128> {
    let wide = match value {
        Value::Uint(value) => i128::from(*value),
        Value::Int(value) => i128::from(*value),
        other => return Err(mismatch("integer", other)),
    };
    if wide < min || wide > max {
        return Err(CodecError::OutOfRange {
            value: wide,
            symbol,
        });
    }
    Ok(wide)
}

fn mismatch(expected: &'static str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

fn need(src: &[u8], needed: usize) -> Result<()> {
    if src.len() < needed {
        return Err(CodecError::Underrun {
            needed,
            remaining: src.len(),
        });
    }
    Ok(())
}

fn get_len(src: &mut &[u8]) -> Result<usize> {
    need(src, 2)?;
    let claimed = usize::from(src.get_u16_le());
    if claimed > src.len() {
        return Err(CodecError::LengthOverrun {
            claimed,
            remaining: src.len(),
        });
    }
    Ok(claimed)
}

// `bounded` is set inside a struct: text may end at the struct boundary.
fn decode_item(src: &mut &[u8], descriptor: &Descriptor, bounded: bool) -> Result<Value> {
    let value = match descriptor {
        Descriptor::Bool => {
            need(src, 1)?;
            Value::Bool(src.get_u8() != 0)
        }
        Descriptor::U8 => {
            need(src, 1)?;
            Value::Uint(src.get_u8().into())
        }
        Descriptor::I8 => {
            need(src, 1)?;
            Value::Int(src.get_i8().into())
        }
        Descriptor::U16 => {
            need(src, 2)?;
            Value::Uint(src.get_u16_le().into())
        }
        Descriptor::I16 => {
            need(src, 2)?;
            Value::Int(src.get_i16_le().into())
        }
        Descriptor::U32 => {
            need(src, 4)?;
            Value::Uint(src.get_u32_le().into())
        }
        Descriptor::I32 => {
            need(src, 4)?;
            Value::Int(src.get_i32_le().into())
        }
        Descriptor::U64 => {
            need(src, 8)?;
            Value::Uint(src.get_u64_le())
        }
        Descriptor::I64 => {
            need(src, 8)?;
            Value::Int(src.get_i64_le())
        }
        Descriptor::Packed => Value::Uint(get_packed(src)?.into()),
        Descriptor::Ipv6 => {
            need(src, 16)?;
            let mut octets = [0u8; 16];
            src.copy_to_slice(&mut octets);
            Value::Ipv6(Ipv6Addr::from(octets))
        }
        Descriptor::Eui64 => {
            need(src, 8)?;
            let mut id = [0u8; 8];
            src.copy_to_slice(&mut id);
            Value::Eui64(id)
        }
        Descriptor::Eui48 => {
            need(src, 6)?;
            let mut id = [0u8; 6];
            src.copy_to_slice(&mut id);
            Value::Eui48(id)
        }
        Descriptor::Data => {
            let data = Bytes::copy_from_slice(src);
            src.advance(data.len());
            Value::Data(data)
        }
        Descriptor::DataWithLen => {
            let len = get_len(src)?;
            let data = Bytes::copy_from_slice(&src[..len]);
            src.advance(len);
            Value::Data(data)
        }
        Descriptor::Utf8 => {
            let (text_len, consumed) = match src.iter().position(|&byte| byte == 0) {
                Some(nul) => (nul, nul + 1),
                None if bounded => (src.len(), src.len()),
                None => return Err(CodecError::MissingTerminator),
            };
            let text = std::str::from_utf8(&src[..text_len])
                .map_err(|_| CodecError::InvalidUtf8)?
                .to_owned();
            src.advance(consumed);
            Value::Text(text)
        }
        Descriptor::Void => Value::Void,
        Descriptor::Struct(items) => {
            let len = get_len(src)?;
            let mut body = &src[..len];
            let mut fields = Vec::with_capacity(items.len());
            for item in items {
                fields.push(decode_item(&mut body, item, true)?);
            }
            // Trailing struct bytes belong to fields this side doesn't know.
            src.advance(len);
            Value::Tuple(fields)
        }
        Descriptor::Array(element) => {
            let mut items = Vec::new();
            while !src.is_empty() {
                let before = src.len();
                items.push(decode_item(src, element, bounded)?);
                if src.len() == before {
                    break;
                }
            }
            Value::Array(items)
        }
        Descriptor::Tuple(items) => {
            let mut fields = Vec::with_capacity(items.len());
            for item in items {
                fields.push(decode_item(src, item, bounded)?);
            }
            Value::Tuple(fields)
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(value: u32) -> Vec<u8> {
        let mut dst = BytesMut::new();
        put_packed(&mut dst, value);
        dst.to_vec()
    }

    fn roundtrip(value: Value, descriptor: &str) {
        let encoded = encode_str(&value, descriptor).unwrap();
        let (decoded, consumed) = decode_str(&encoded, descriptor).unwrap();
        assert_eq!(decoded, value, "descriptor {descriptor}");
        assert_eq!(consumed, encoded.len(), "descriptor {descriptor}");
    }

    #[test]
    fn packed_integer_law() {
        assert_eq!(packed(0), vec![0x00]);
        assert_eq!(packed(127), vec![0x7F]);
        assert_eq!(packed(128), vec![0x80, 0x01]);
        assert_eq!(packed(16383), vec![0xFF, 0x7F]);
        assert_eq!(packed(u32::MAX), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);

        for value in [0, 127, 128, 16383, u32::MAX] {
            let bytes = packed(value);
            let mut src = bytes.as_slice();
            assert_eq!(get_packed(&mut src), Ok(value));
            assert!(src.is_empty());
        }
    }

    #[test]
    fn packed_trailing_continuation_fails() {
        let mut src: &[u8] = &[0x80, 0x80];
        assert_eq!(get_packed(&mut src), Err(CodecError::UnterminatedPacked));
        assert_eq!(src.len(), 2);
    }

    #[test]
    fn packed_beyond_32_bits_fails() {
        let mut src: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
        assert_eq!(get_packed(&mut src), Err(CodecError::PackedOverflow));

        let mut src: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x00];
        assert_eq!(get_packed(&mut src), Err(CodecError::PackedOverflow));
    }

    #[test]
    fn fixed_width_little_endian() {
        assert_eq!(encode_str(&Value::Uint(0x1234), "S").unwrap().as_ref(), &[0x34, 0x12]);
        assert_eq!(
            encode_str(&Value::Uint(0xFACE_CAFE), "L").unwrap().as_ref(),
            &[0xFE, 0xCA, 0xCE, 0xFA]
        );
        let (value, consumed) = decode_str(&[0xFF], "c").unwrap();
        assert_eq!((value, consumed), (Value::Int(-1), 1));
    }

    #[test]
    fn scalar_roundtrips() {
        roundtrip(Value::Bool(true), "b");
        roundtrip(Value::Uint(200), "C");
        roundtrip(Value::Int(-100), "c");
        roundtrip(Value::Uint(0xFACE), "S");
        roundtrip(Value::Int(-30000), "s");
        roundtrip(Value::Uint(u32::MAX.into()), "L");
        roundtrip(Value::Int(i32::MIN.into()), "l");
        roundtrip(Value::Uint(u64::MAX), "X");
        roundtrip(Value::Int(i64::MIN), "x");
        roundtrip(Value::Uint(300), "i");
        roundtrip(Value::from("OpenThread"), "U");
        roundtrip(Value::Data(Bytes::from_static(b"\xde\xad\xbe\xef")), "D");
        roundtrip(Value::Data(Bytes::from_static(b"\x01\x02")), "d");
        roundtrip(Value::Ipv6("fe80::1".parse().unwrap()), "6");
        roundtrip(Value::Eui64([1, 2, 3, 4, 5, 6, 7, 8]), "E");
        roundtrip(Value::Eui48([1, 2, 3, 4, 5, 6]), "e");
        roundtrip(Value::Void, ".");
    }

    #[test]
    fn composite_roundtrips() {
        roundtrip(
            Value::Tuple(vec![Value::Uint(4), Value::Uint(3)]),
            "ii",
        );
        roundtrip(
            Value::Array(vec![Value::Uint(11), Value::Uint(15), Value::Uint(26)]),
            "A(C)",
        );
        roundtrip(
            Value::Array(vec![
                Value::Tuple(vec![
                    Value::Ipv6("fdde:ad00:beef::1".parse().unwrap()),
                    Value::Uint(64),
                    Value::Uint(u32::MAX.into()),
                    Value::Uint(3600),
                ]),
                Value::Tuple(vec![
                    Value::Ipv6("fe80::2".parse().unwrap()),
                    Value::Uint(64),
                    Value::Uint(0),
                    Value::Uint(0),
                ]),
            ]),
            "A(t(6CLL))",
        );
        roundtrip(
            Value::Tuple(vec![
                Value::Uint(15),
                Value::Int(-60),
                Value::Tuple(vec![
                    Value::Eui64([0xAA; 8]),
                    Value::Uint(0xFFFF),
                    Value::Uint(0x1234),
                    Value::Uint(1),
                ]),
                Value::Tuple(vec![
                    Value::Uint(3),
                    Value::Uint(0),
                    Value::from("thread-net"),
                    Value::Data(Bytes::from_static(&[0xDE, 0xAD, 0x00, 0xBE, 0xEF, 0x00, 0xCA, 0xFE])),
                    Value::Data(Bytes::new()),
                ]),
            ]),
            "Cct(ESSC)t(iCUdd)",
        );
        roundtrip(
            Value::Tuple(vec![
                Value::Data(Bytes::from_static(b"\x60\x00\x00\x00")),
                Value::Data(Bytes::new()),
            ]),
            "dD",
        );
    }

    #[test]
    fn underrun_never_reads_past_end() {
        for (descriptor, minimum) in [
            ("b", 1usize),
            ("C", 1),
            ("S", 2),
            ("L", 4),
            ("X", 8),
            ("6", 16),
            ("E", 8),
            ("e", 6),
            ("d", 2),
            ("ii", 2),
            ("t(C)", 3),
            ("SSSSSSSSSSSSSSSS", 32),
        ] {
            let full = vec![0u8; minimum];
            for len in 0..minimum {
                let err = decode_str(&full[..len], descriptor).unwrap_err();
                assert!(
                    matches!(
                        err,
                        CodecError::Underrun { .. }
                            | CodecError::UnterminatedPacked
                            | CodecError::LengthOverrun { .. }
                    ),
                    "{descriptor} with {len} bytes gave {err:?}"
                );
            }
        }
    }

    #[test]
    fn length_prefix_overrun() {
        let err = decode_str(&[0x05, 0x00, 0x01, 0x02], "d").unwrap_err();
        assert_eq!(
            err,
            CodecError::LengthOverrun {
                claimed: 5,
                remaining: 2
            }
        );
    }

    #[test]
    fn text_requires_terminator_at_top_level() {
        assert_eq!(
            decode_str(b"abc", "U").unwrap_err(),
            CodecError::MissingTerminator
        );
        assert_eq!(
            decode_str(&[0xC3, 0x28, 0x00], "U").unwrap_err(),
            CodecError::InvalidUtf8
        );
    }

    #[test]
    fn text_inside_struct_is_length_bounded() {
        let (value, consumed) = decode_str(&[0x03, 0x00, b'a', b'b', b'c', 0x07], "t(U)C").unwrap();
        assert_eq!(
            value,
            Value::Tuple(vec![
                Value::Tuple(vec![Value::from("abc")]),
                Value::Uint(7)
            ])
        );
        assert_eq!(consumed, 6);
    }

    #[test]
    fn struct_skips_unknown_trailing_fields() {
        let (value, consumed) = decode_str(&[0x03, 0x00, 0x01, 0xAA, 0xBB], "t(C)").unwrap();
        assert_eq!(value, Value::Tuple(vec![Value::Uint(1)]));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn rest_of_buffer_data_consumes_everything() {
        let (value, consumed) = decode_str(&[1, 2, 3], "CD").unwrap();
        assert_eq!(
            value,
            Value::Tuple(vec![Value::Uint(1), Value::Data(Bytes::from_static(&[2, 3]))])
        );
        assert_eq!(consumed, 3);
    }

    #[test]
    fn empty_array() {
        let (value, consumed) = decode_str(&[], "A(C)").unwrap();
        assert_eq!(value, Value::Array(Vec::new()));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn encode_rejects_wrong_shape() {
        assert_eq!(
            encode_str(&Value::from("x"), "C").unwrap_err(),
            CodecError::TypeMismatch {
                expected: "integer",
                found: "text"
            }
        );
        assert!(matches!(
            encode_str(&Value::Uint(256), "C").unwrap_err(),
            CodecError::OutOfRange { value: 256, symbol: 'C' }
        ));
        assert!(matches!(
            encode_str(&Value::Int(-1), "S").unwrap_err(),
            CodecError::OutOfRange { .. }
        ));
        assert_eq!(
            encode_str(&Value::from("a\0b"), "U").unwrap_err(),
            CodecError::InteriorNul
        );
    }

    #[test]
    fn tuple_arity_mismatch_is_reported() {
        assert_eq!(
            encode_str(&Value::Tuple(vec![Value::Uint(1)]), "CC").unwrap_err(),
            CodecError::ArityMismatch {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            encode_str(
                &Value::Tuple(vec![Value::Uint(1), Value::Uint(2), Value::Uint(3)]),
                "t(CC)"
            )
            .unwrap_err(),
            CodecError::ArityMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn decode_reports_consumed_prefix() {
        let (value, consumed) = decode_str(&[0x2A, 0xFF, 0xFF], "C").unwrap();
        assert_eq!(value, Value::Uint(42));
        assert_eq!(consumed, 1);
    }
}
