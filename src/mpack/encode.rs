use crate::cursor::Writer;

use super::value::{BinFormat, ExtFormat, IntFormat, SeqFormat, StrFormat, Value};

/// Encode a value to a fresh buffer.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut writer = Writer::new();
    encode_value(value, &mut writer);
    writer.into_bytes()
}

/// Encode one value into `writer`.
///
/// Memoized tag classes are honored whenever the value still fits them;
/// a mutated value that outgrew its class falls back to the shortest
/// fitting form, the same choice `Auto` makes for new values.
pub fn encode_value(value: &Value, writer: &mut Writer) {
    match value {
        Value::Null => writer.write_u8(0xc0),
        Value::Bool(false) => writer.write_u8(0xc2),
        Value::Bool(true) => writer.write_u8(0xc3),
        Value::Int(v, format) => encode_int(*v, *format, writer),
        Value::UInt(v, format) => encode_uint(*v, *format, writer),
        Value::F32(v) => {
            writer.write_u8(0xca);
            writer.write_f32_be(*v);
        }
        Value::F64(v) => {
            writer.write_u8(0xcb);
            writer.write_f64_be(*v);
        }
        Value::Str(s, format) => {
            encode_str_header(s.len(), *format, writer);
            writer.write_bytes(s.as_bytes());
        }
        Value::Bin(b, format) => {
            encode_bin_header(b.len(), *format, writer);
            writer.write_bytes(b);
        }
        Value::Array(items, format) => {
            encode_seq_header(items.len(), *format, 0x90, 0xdc, 0xdd, writer);
            for item in items {
                encode_value(item, writer);
            }
        }
        Value::Map(pairs, format) => {
            encode_seq_header(pairs.len(), *format, 0x80, 0xde, 0xdf, writer);
            for (key, val) in pairs {
                encode_value(key, writer);
                encode_value(val, writer);
            }
        }
        Value::Ext(code, data, format) => encode_ext(*code, data, *format, writer),
        Value::Nested(inner, format) => {
            let bytes = encode(inner);
            encode_bin_header(bytes.len(), *format, writer);
            writer.write_bytes(&bytes);
        }
    }
}

fn encode_int(v: i64, format: IntFormat, writer: &mut Writer) {
    match format {
        IntFormat::FixPos if (0..=0x7f).contains(&v) => writer.write_u8(v as u8),
        IntFormat::FixNeg if (-32..0).contains(&v) => writer.write_u8(v as i8 as u8),
        IntFormat::I8 if i8::try_from(v).is_ok() => {
            writer.write_u8(0xd0);
            writer.write_u8(v as i8 as u8);
        }
        IntFormat::I16 if i16::try_from(v).is_ok() => {
            writer.write_u8(0xd1);
            writer.write_u16_be(v as i16 as u16);
        }
        IntFormat::I32 if i32::try_from(v).is_ok() => {
            writer.write_u8(0xd2);
            writer.write_u32_be(v as i32 as u32);
        }
        IntFormat::I64 => {
            writer.write_u8(0xd3);
            writer.write_u64_be(v as u64);
        }
        IntFormat::U8 if (0..=0xff).contains(&v) => {
            writer.write_u8(0xcc);
            writer.write_u8(v as u8);
        }
        IntFormat::U16 if (0..=0xffff).contains(&v) => {
            writer.write_u8(0xcd);
            writer.write_u16_be(v as u16);
        }
        IntFormat::U32 if (0..=0xffff_ffff).contains(&v) => {
            writer.write_u8(0xce);
            writer.write_u32_be(v as u32);
        }
        IntFormat::U64 if v >= 0 => {
            writer.write_u8(0xcf);
            writer.write_u64_be(v as u64);
        }
        _ => {
            if v >= 0 {
                encode_uint_auto(v as u64, writer);
            } else {
                encode_int_auto(v, writer);
            }
        }
    }
}

fn encode_uint(v: u64, format: IntFormat, writer: &mut Writer) {
    match format {
        IntFormat::FixPos if v <= 0x7f => writer.write_u8(v as u8),
        IntFormat::U8 if v <= 0xff => {
            writer.write_u8(0xcc);
            writer.write_u8(v as u8);
        }
        IntFormat::U16 if v <= 0xffff => {
            writer.write_u8(0xcd);
            writer.write_u16_be(v as u16);
        }
        IntFormat::U32 if v <= 0xffff_ffff => {
            writer.write_u8(0xce);
            writer.write_u32_be(v as u32);
        }
        IntFormat::U64 => {
            writer.write_u8(0xcf);
            writer.write_u64_be(v);
        }
        IntFormat::I8 if v <= i8::MAX as u64 => {
            writer.write_u8(0xd0);
            writer.write_u8(v as u8);
        }
        IntFormat::I16 if v <= i16::MAX as u64 => {
            writer.write_u8(0xd1);
            writer.write_u16_be(v as u16);
        }
        IntFormat::I32 if v <= i32::MAX as u64 => {
            writer.write_u8(0xd2);
            writer.write_u32_be(v as u32);
        }
        IntFormat::I64 if v <= i64::MAX as u64 => {
            writer.write_u8(0xd3);
            writer.write_u64_be(v);
        }
        _ => encode_uint_auto(v, writer),
    }
}

/// Shortest encoding of a non-negative integer.
fn encode_uint_auto(v: u64, writer: &mut Writer) {
    if v <= 0x7f {
        writer.write_u8(v as u8);
    } else if v <= 0xff {
        writer.write_u8(0xcc);
        writer.write_u8(v as u8);
    } else if v <= 0xffff {
        writer.write_u8(0xcd);
        writer.write_u16_be(v as u16);
    } else if v <= 0xffff_ffff {
        writer.write_u8(0xce);
        writer.write_u32_be(v as u32);
    } else {
        writer.write_u8(0xcf);
        writer.write_u64_be(v);
    }
}

/// Shortest encoding of a negative integer.
fn encode_int_auto(v: i64, writer: &mut Writer) {
    debug_assert!(v < 0);
    if v >= -32 {
        writer.write_u8(v as i8 as u8);
    } else if v >= i8::MIN as i64 {
        writer.write_u8(0xd0);
        writer.write_u8(v as i8 as u8);
    } else if v >= i16::MIN as i64 {
        writer.write_u8(0xd1);
        writer.write_u16_be(v as i16 as u16);
    } else if v >= i32::MIN as i64 {
        writer.write_u8(0xd2);
        writer.write_u32_be(v as i32 as u32);
    } else {
        writer.write_u8(0xd3);
        writer.write_u64_be(v as u64);
    }
}

fn encode_str_header(len: usize, format: StrFormat, writer: &mut Writer) {
    match format {
        StrFormat::Fix if len <= 0x1f => writer.write_u8(0xa0 | len as u8),
        StrFormat::Str8 if len <= 0xff => {
            writer.write_u8(0xd9);
            writer.write_u8(len as u8);
        }
        StrFormat::Str16 if len <= 0xffff => {
            writer.write_u8(0xda);
            writer.write_u16_be(len as u16);
        }
        StrFormat::Str32 => {
            writer.write_u8(0xdb);
            writer.write_u32_be(len as u32);
        }
        _ => {
            if len <= 0x1f {
                writer.write_u8(0xa0 | len as u8);
            } else if len <= 0xff {
                writer.write_u8(0xd9);
                writer.write_u8(len as u8);
            } else if len <= 0xffff {
                writer.write_u8(0xda);
                writer.write_u16_be(len as u16);
            } else {
                writer.write_u8(0xdb);
                writer.write_u32_be(len as u32);
            }
        }
    }
}

fn encode_bin_header(len: usize, format: BinFormat, writer: &mut Writer) {
    match format {
        BinFormat::Bin8 if len <= 0xff => {
            writer.write_u8(0xc4);
            writer.write_u8(len as u8);
        }
        BinFormat::Bin16 if len <= 0xffff => {
            writer.write_u8(0xc5);
            writer.write_u16_be(len as u16);
        }
        BinFormat::Bin32 => {
            writer.write_u8(0xc6);
            writer.write_u32_be(len as u32);
        }
        BinFormat::FixStr if len <= 0x1f => writer.write_u8(0xa0 | len as u8),
        BinFormat::Str8 if len <= 0xff => {
            writer.write_u8(0xd9);
            writer.write_u8(len as u8);
        }
        BinFormat::Str16 if len <= 0xffff => {
            writer.write_u8(0xda);
            writer.write_u16_be(len as u16);
        }
        BinFormat::Str32 => {
            writer.write_u8(0xdb);
            writer.write_u32_be(len as u32);
        }
        _ => {
            if len <= 0xff {
                writer.write_u8(0xc4);
                writer.write_u8(len as u8);
            } else if len <= 0xffff {
                writer.write_u8(0xc5);
                writer.write_u16_be(len as u16);
            } else {
                writer.write_u8(0xc6);
                writer.write_u32_be(len as u32);
            }
        }
    }
}

fn encode_seq_header(
    len: usize,
    format: SeqFormat,
    fix_base: u8,
    tag16: u8,
    tag32: u8,
    writer: &mut Writer,
) {
    match format {
        SeqFormat::Fix if len <= 0x0f => writer.write_u8(fix_base | len as u8),
        SeqFormat::Len16 if len <= 0xffff => {
            writer.write_u8(tag16);
            writer.write_u16_be(len as u16);
        }
        SeqFormat::Len32 => {
            writer.write_u8(tag32);
            writer.write_u32_be(len as u32);
        }
        _ => {
            if len <= 0x0f {
                writer.write_u8(fix_base | len as u8);
            } else if len <= 0xffff {
                writer.write_u8(tag16);
                writer.write_u16_be(len as u16);
            } else {
                writer.write_u8(tag32);
                writer.write_u32_be(len as u32);
            }
        }
    }
}

fn encode_ext(code: i8, data: &[u8], format: ExtFormat, writer: &mut Writer) {
    let len = data.len();
    match format {
        ExtFormat::Fix1 if len == 1 => writer.write_u8(0xd4),
        ExtFormat::Fix2 if len == 2 => writer.write_u8(0xd5),
        ExtFormat::Fix4 if len == 4 => writer.write_u8(0xd6),
        ExtFormat::Fix8 if len == 8 => writer.write_u8(0xd7),
        ExtFormat::Fix16 if len == 16 => writer.write_u8(0xd8),
        ExtFormat::Ext8 if len <= 0xff => {
            writer.write_u8(0xc7);
            writer.write_u8(len as u8);
        }
        ExtFormat::Ext16 if len <= 0xffff => {
            writer.write_u8(0xc8);
            writer.write_u16_be(len as u16);
        }
        ExtFormat::Ext32 => {
            writer.write_u8(0xc9);
            writer.write_u32_be(len as u32);
        }
        _ => match len {
            1 => writer.write_u8(0xd4),
            2 => writer.write_u8(0xd5),
            4 => writer.write_u8(0xd6),
            8 => writer.write_u8(0xd7),
            16 => writer.write_u8(0xd8),
            _ if len <= 0xff => {
                writer.write_u8(0xc7);
                writer.write_u8(len as u8);
            }
            _ if len <= 0xffff => {
                writer.write_u8(0xc8);
                writer.write_u16_be(len as u16);
            }
            _ => {
                writer.write_u8(0xc9);
                writer.write_u32_be(len as u32);
            }
        },
    }
    writer.write_u8(code as u8);
    writer.write_bytes(data);
}
