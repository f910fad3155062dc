use crate::cursor::{Cursor, Writer};
use crate::error::{Error, Result};
use crate::mpack::{self, BinFormat, Value};

/// Payload layout of a known block.
///
/// The reference implementation modeled these as one class per block;
/// here a descriptor drives a shared decode/encode pair and the variant
/// registry owns the `(variant, name, version) -> codec` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCodec {
    /// The body is a single encoded value.
    Plain,
    /// A run of `i32le` length-prefixed values, one per field name,
    /// surfaced as a map in field order.
    Fielded(&'static [&'static str]),
    /// Koikatu outfits: an encoded array of byte strings, each holding
    /// clothes/accessory fields, a raw makeup flag byte, and makeup fields.
    KoikatuCoordinate,
    /// ILLGAMES outfits: an encoded array of byte strings, each holding
    /// five length-prefixed fields.
    HoneycomeCoordinate,
    /// Plugin extension block: a plain value whose byte-string leaves may
    /// hold further encoded payloads (see `nested`).
    KkEx,
}

const HC_COORDINATE_FIELDS: &[&str] = &["clothes", "accessory", "makeup", "hair", "nail"];

impl BlockCodec {
    pub fn decode(self, bytes: &[u8]) -> Result<Value> {
        match self {
            BlockCodec::Plain | BlockCodec::KkEx => mpack::decode(bytes),
            BlockCodec::Fielded(fields) => {
                let mut cursor = Cursor::new(bytes);
                let value = decode_fields(&mut cursor, fields)?;
                expect_consumed(&cursor, "fielded block")?;
                Ok(value)
            }
            BlockCodec::KoikatuCoordinate => {
                decode_coordinate_list(bytes, decode_koikatu_outfit)
            }
            BlockCodec::HoneycomeCoordinate => decode_coordinate_list(bytes, |cursor| {
                decode_fields(cursor, HC_COORDINATE_FIELDS)
            }),
        }
    }

    pub fn encode(self, value: &Value) -> Result<Vec<u8>> {
        match self {
            BlockCodec::Plain | BlockCodec::KkEx => Ok(mpack::encode(value)),
            BlockCodec::Fielded(fields) => {
                let mut writer = Writer::new();
                encode_fields(value, fields, &mut writer)?;
                Ok(writer.into_bytes())
            }
            BlockCodec::KoikatuCoordinate => {
                encode_coordinate_list(value, encode_koikatu_outfit)
            }
            BlockCodec::HoneycomeCoordinate => encode_coordinate_list(value, |outfit, writer| {
                encode_fields(outfit, HC_COORDINATE_FIELDS, writer)
            }),
        }
    }
}

fn decode_fields(cursor: &mut Cursor<'_>, fields: &[&'static str]) -> Result<Value> {
    let mut pairs = Vec::with_capacity(fields.len());
    for &field in fields {
        let bytes = cursor.read_i32_prefixed()?;
        pairs.push((Value::str(field), mpack::decode(bytes)?));
    }
    Ok(Value::map(pairs))
}

fn encode_fields(value: &Value, fields: &[&'static str], writer: &mut Writer) -> Result<()> {
    for &field in fields {
        let field_value = value.get(field).ok_or(Error::SchemaMismatch {
            context: "fielded block",
            expected: field,
            found: "missing map entry".to_owned(),
        })?;
        writer.write_i32_prefixed(&mpack::encode(field_value));
    }
    Ok(())
}

/// Shared outer shape of the coordinate blocks: an encoded array whose
/// elements are byte strings. Each element decodes through `inner` and is
/// wrapped in `Nested` so its byte-string tag class survives the re-wrap.
fn decode_coordinate_list(
    bytes: &[u8],
    inner: impl Fn(&mut Cursor<'_>) -> Result<Value>,
) -> Result<Value> {
    let (items, seq_format) = match mpack::decode(bytes)? {
        Value::Array(items, seq_format) => (items, seq_format),
        other => {
            return Err(Error::SchemaMismatch {
                context: "coordinate block",
                expected: "array of byte strings",
                found: format!("{other:?}").chars().take(40).collect(),
            })
        }
    };
    let mut decoded = Vec::with_capacity(items.len());
    for item in items {
        let (entry_bytes, bin_format) = match item {
            Value::Bin(entry_bytes, bin_format) => (entry_bytes, bin_format),
            other => {
                return Err(Error::SchemaMismatch {
                    context: "coordinate entry",
                    expected: "byte string",
                    found: format!("{other:?}").chars().take(40).collect(),
                })
            }
        };
        let mut cursor = Cursor::new(&entry_bytes);
        let outfit = inner(&mut cursor)?;
        expect_consumed(&cursor, "coordinate entry")?;
        decoded.push(Value::Nested(Box::new(outfit), bin_format));
    }
    Ok(Value::Array(decoded, seq_format))
}

fn encode_coordinate_list(
    value: &Value,
    inner: impl Fn(&Value, &mut Writer) -> Result<()>,
) -> Result<Vec<u8>> {
    let Value::Array(items, seq_format) = value else {
        return Err(Error::SchemaMismatch {
            context: "coordinate block",
            expected: "array of outfits",
            found: format!("{value:?}").chars().take(40).collect(),
        });
    };
    let mut rebuilt = Vec::with_capacity(items.len());
    for item in items {
        let (outfit, bin_format) = match item {
            Value::Nested(outfit, format) => (outfit.as_ref(), *format),
            other => (other, BinFormat::Auto),
        };
        let mut writer = Writer::new();
        inner(outfit, &mut writer)?;
        rebuilt.push(Value::Bin(writer.into_bytes(), bin_format));
    }
    Ok(mpack::encode(&Value::Array(rebuilt, *seq_format)))
}

fn decode_koikatu_outfit(cursor: &mut Cursor<'_>) -> Result<Value> {
    let clothes = mpack::decode(cursor.read_i32_prefixed()?)?;
    let accessory = mpack::decode(cursor.read_i32_prefixed()?)?;
    // Raw flag byte, not part of any encoded value. Anything other than
    // 0/1 is kept as a number so the byte survives a resave.
    let makeup_flag = cursor.read_i8()?;
    let enable_makeup = match makeup_flag {
        0 => Value::Bool(false),
        1 => Value::Bool(true),
        other => Value::Int(other as i64, mpack::IntFormat::I8),
    };
    let makeup = mpack::decode(cursor.read_i32_prefixed()?)?;
    Ok(Value::map(vec![
        (Value::str("clothes"), clothes),
        (Value::str("accessory"), accessory),
        (Value::str("enableMakeup"), enable_makeup),
        (Value::str("makeup"), makeup),
    ]))
}

fn encode_koikatu_outfit(outfit: &Value, writer: &mut Writer) -> Result<()> {
    for field in ["clothes", "accessory"] {
        let v = outfit.get(field).ok_or(missing_outfit_field(field))?;
        writer.write_i32_prefixed(&mpack::encode(v));
    }
    match outfit.get("enableMakeup") {
        Some(Value::Bool(flag)) => writer.write_i8(*flag as i8),
        Some(Value::Int(v, _)) => writer.write_i8(*v as i8),
        _ => return Err(missing_outfit_field("enableMakeup")),
    }
    let makeup = outfit.get("makeup").ok_or(missing_outfit_field("makeup"))?;
    writer.write_i32_prefixed(&mpack::encode(makeup));
    Ok(())
}

fn missing_outfit_field(field: &'static str) -> Error {
    Error::SchemaMismatch {
        context: "coordinate outfit",
        expected: field,
        found: "missing map entry".to_owned(),
    }
}

fn expect_consumed(cursor: &Cursor<'_>, context: &'static str) -> Result<()> {
    if cursor.remaining() != 0 {
        return Err(Error::SchemaMismatch {
            context,
            expected: "fully consumed body",
            found: format!("{} trailing bytes", cursor.remaining()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fielded_roundtrip() {
        let mut writer = Writer::new();
        writer.write_i32_prefixed(&mpack::encode(&Value::map(vec![(
            Value::str("shape"),
            Value::F32(0.25),
        )])));
        writer.write_i32_prefixed(&mpack::encode(&Value::int(3)));
        writer.write_i32_prefixed(&mpack::encode(&Value::Null));
        let bytes = writer.into_bytes();

        let codec = BlockCodec::Fielded(&["face", "body", "hair"]);
        let value = codec.decode(&bytes).unwrap();
        assert_eq!(value["face"]["shape"].as_f64(), Some(0.25));
        assert_eq!(codec.encode(&value).unwrap(), bytes);
    }

    #[test]
    fn fielded_rejects_trailing_garbage() {
        let mut writer = Writer::new();
        writer.write_i32_prefixed(&mpack::encode(&Value::Null));
        writer.write_u8(0xEE);
        let bytes = writer.into_bytes();
        assert!(BlockCodec::Fielded(&["only"]).decode(&bytes).is_err());
    }

    #[test]
    fn koikatu_coordinate_roundtrip() {
        let mut entry = Writer::new();
        entry.write_i32_prefixed(&mpack::encode(&Value::str("clothes-data")));
        entry.write_i32_prefixed(&mpack::encode(&Value::int(2)));
        entry.write_i8(1);
        entry.write_i32_prefixed(&mpack::encode(&Value::Null));
        let entry_bytes = entry.into_bytes();
        let bytes = mpack::encode(&Value::array(vec![Value::bin(entry_bytes)]));

        let value = BlockCodec::KoikatuCoordinate.decode(&bytes).unwrap();
        let outfit = &value.as_array().unwrap()[0];
        assert_eq!(outfit["enableMakeup"].as_bool(), Some(true));
        assert_eq!(outfit["clothes"].as_str(), Some("clothes-data"));
        assert_eq!(BlockCodec::KoikatuCoordinate.encode(&value).unwrap(), bytes);
    }

    #[test]
    fn nonbinary_makeup_flag_survives() {
        let mut entry = Writer::new();
        entry.write_i32_prefixed(&mpack::encode(&Value::Null));
        entry.write_i32_prefixed(&mpack::encode(&Value::Null));
        entry.write_i8(7);
        entry.write_i32_prefixed(&mpack::encode(&Value::Null));
        let bytes = mpack::encode(&Value::array(vec![Value::bin(entry.into_bytes())]));
        let value = BlockCodec::KoikatuCoordinate.decode(&bytes).unwrap();
        assert_eq!(BlockCodec::KoikatuCoordinate.encode(&value).unwrap(), bytes);
    }

    #[test]
    fn honeycome_coordinate_roundtrip() {
        let mut entry = Writer::new();
        for i in 0..5 {
            entry.write_i32_prefixed(&mpack::encode(&Value::int(i)));
        }
        let bytes = mpack::encode(&Value::array(vec![Value::bin(entry.into_bytes())]));
        let value = BlockCodec::HoneycomeCoordinate.decode(&bytes).unwrap();
        assert_eq!(
            value.as_array().unwrap()[0]["nail"].as_i64(),
            Some(4)
        );
        assert_eq!(
            BlockCodec::HoneycomeCoordinate.encode(&value).unwrap(),
            bytes
        );
    }
}
