use crate::cursor::Cursor;
use crate::error::{Error, Result};

use super::value::{BinFormat, ExtFormat, IntFormat, SeqFormat, StrFormat, Value};

/// Decode a single value, requiring that it spans the whole input.
pub fn decode(data: &[u8]) -> Result<Value> {
    let (value, consumed) = decode_prefix(data)?;
    if consumed != data.len() {
        return Err(Error::SchemaMismatch {
            context: "msgpack",
            expected: "a single value spanning the input",
            found: format!("{} trailing bytes", data.len() - consumed),
        });
    }
    Ok(value)
}

/// Decode a single value from the front of `data`, returning it with the
/// number of bytes consumed.
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize)> {
    let mut cursor = Cursor::new(data);
    let value = decode_value(&mut cursor)?;
    Ok((value, cursor.position()))
}

/// Decode one value at the cursor position.
///
/// Every branch records the exact tag class observed so the encoder can
/// reproduce the input byte-for-byte.
pub fn decode_value(cursor: &mut Cursor<'_>) -> Result<Value> {
    let tag_offset = cursor.position();
    let tag = cursor.read_u8()?;
    let value = match tag {
        // positive fixint
        0x00..=0x7f => Value::UInt(tag as u64, IntFormat::FixPos),
        // fixmap
        0x80..=0x8f => decode_map(cursor, (tag & 0x0f) as usize, SeqFormat::Fix)?,
        // fixarray
        0x90..=0x9f => decode_array(cursor, (tag & 0x0f) as usize, SeqFormat::Fix)?,
        // fixstr
        0xa0..=0xbf => decode_str(cursor, (tag & 0x1f) as usize, StrFormat::Fix)?,
        0xc0 => Value::Null,
        0xc2 => Value::Bool(false),
        0xc3 => Value::Bool(true),
        0xc4 => {
            let len = cursor.read_u8()? as usize;
            Value::Bin(cursor.read_bytes(len)?.to_vec(), BinFormat::Bin8)
        }
        0xc5 => {
            let len = cursor.read_u16_be()? as usize;
            Value::Bin(cursor.read_bytes(len)?.to_vec(), BinFormat::Bin16)
        }
        0xc6 => {
            let len = cursor.read_u32_be()? as usize;
            Value::Bin(cursor.read_bytes(len)?.to_vec(), BinFormat::Bin32)
        }
        0xc7 => {
            let len = cursor.read_u8()? as usize;
            decode_ext(cursor, len, ExtFormat::Ext8)?
        }
        0xc8 => {
            let len = cursor.read_u16_be()? as usize;
            decode_ext(cursor, len, ExtFormat::Ext16)?
        }
        0xc9 => {
            let len = cursor.read_u32_be()? as usize;
            decode_ext(cursor, len, ExtFormat::Ext32)?
        }
        0xca => Value::F32(cursor.read_f32_be()?),
        0xcb => Value::F64(cursor.read_f64_be()?),
        0xcc => Value::UInt(cursor.read_u8()? as u64, IntFormat::U8),
        0xcd => Value::UInt(cursor.read_u16_be()? as u64, IntFormat::U16),
        0xce => Value::UInt(cursor.read_u32_be()? as u64, IntFormat::U32),
        0xcf => Value::UInt(cursor.read_u64_be()?, IntFormat::U64),
        0xd0 => Value::Int(cursor.read_u8()? as i8 as i64, IntFormat::I8),
        0xd1 => Value::Int(cursor.read_u16_be()? as i16 as i64, IntFormat::I16),
        0xd2 => Value::Int(cursor.read_u32_be()? as i32 as i64, IntFormat::I32),
        0xd3 => Value::Int(cursor.read_u64_be()? as i64, IntFormat::I64),
        0xd4 => decode_ext(cursor, 1, ExtFormat::Fix1)?,
        0xd5 => decode_ext(cursor, 2, ExtFormat::Fix2)?,
        0xd6 => decode_ext(cursor, 4, ExtFormat::Fix4)?,
        0xd7 => decode_ext(cursor, 8, ExtFormat::Fix8)?,
        0xd8 => decode_ext(cursor, 16, ExtFormat::Fix16)?,
        0xd9 => {
            let len = cursor.read_u8()? as usize;
            decode_str(cursor, len, StrFormat::Str8)?
        }
        0xda => {
            let len = cursor.read_u16_be()? as usize;
            decode_str(cursor, len, StrFormat::Str16)?
        }
        0xdb => {
            let len = cursor.read_u32_be()? as usize;
            decode_str(cursor, len, StrFormat::Str32)?
        }
        0xdc => {
            let len = cursor.read_u16_be()? as usize;
            decode_array(cursor, len, SeqFormat::Len16)?
        }
        0xdd => {
            let len = cursor.read_u32_be()? as usize;
            decode_array(cursor, len, SeqFormat::Len32)?
        }
        0xde => {
            let len = cursor.read_u16_be()? as usize;
            decode_map(cursor, len, SeqFormat::Len16)?
        }
        0xdf => {
            let len = cursor.read_u32_be()? as usize;
            decode_map(cursor, len, SeqFormat::Len32)?
        }
        // negative fixint
        0xe0..=0xff => Value::Int(tag as i8 as i64, IntFormat::FixNeg),
        0xc1 => {
            return Err(Error::UnsupportedTag {
                tag,
                offset: tag_offset,
            })
        }
    };
    Ok(value)
}

fn decode_str(cursor: &mut Cursor<'_>, len: usize, format: StrFormat) -> Result<Value> {
    let bytes = cursor.read_bytes(len)?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(Value::Str(s.to_owned(), format)),
        // Not valid UTF-8: keep the bytes, remember the string tag class.
        Err(_) => {
            let bin_format = match format {
                StrFormat::Fix => BinFormat::FixStr,
                StrFormat::Str8 => BinFormat::Str8,
                StrFormat::Str16 => BinFormat::Str16,
                StrFormat::Str32 | StrFormat::Auto => BinFormat::Str32,
            };
            Ok(Value::Bin(bytes.to_vec(), bin_format))
        }
    }
}

fn decode_array(cursor: &mut Cursor<'_>, len: usize, format: SeqFormat) -> Result<Value> {
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(decode_value(cursor)?);
    }
    Ok(Value::Array(items, format))
}

fn decode_map(cursor: &mut Cursor<'_>, len: usize, format: SeqFormat) -> Result<Value> {
    let mut pairs = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        let key = decode_value(cursor)?;
        let value = decode_value(cursor)?;
        pairs.push((key, value));
    }
    Ok(Value::Map(pairs, format))
}

fn decode_ext(cursor: &mut Cursor<'_>, len: usize, format: ExtFormat) -> Result<Value> {
    let code = cursor.read_i8()?;
    let data = cursor.read_bytes(len)?.to_vec();
    Ok(Value::Ext(code, data, format))
}
