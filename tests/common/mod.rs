//! Synthetic fixture builders. These assemble card/scene/save byte images
//! from scratch so the round-trip tests do not depend on real game files.
#![allow(dead_code)]

use charafile::cursor::Writer;
use charafile::mpack::{self, Value};

/// A minimal syntactically valid PNG: signature, IHDR, IEND. The framer
/// never validates CRCs, so placeholders are fine.
pub fn tiny_png(marker: u8) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    w.write_u32_be(13);
    w.write_bytes(b"IHDR");
    w.write_bytes(&[marker; 13]);
    w.write_u32_be(0xDEAD_BEEF);
    w.write_u32_be(0);
    w.write_bytes(b"IEND");
    w.write_u32_be(0xAE42_6082);
    w.into_bytes()
}

pub fn lst_info(entries: &[(&str, &str, usize, usize)]) -> Value {
    Value::map(vec![(
        Value::str("lstInfo"),
        Value::array(
            entries
                .iter()
                .map(|(name, version, pos, size)| {
                    Value::map(vec![
                        (Value::str("name"), Value::str(*name)),
                        (Value::str("version"), Value::str(*version)),
                        (Value::str("pos"), Value::uint(*pos as u64)),
                        (Value::str("size"), Value::uint(*size as u64)),
                    ])
                })
                .collect(),
        ),
    )])
}

/// Concatenate catalog + bodies into the block-data section of a card.
pub fn write_block_section(
    writer: &mut Writer,
    blocks: &[(&str, &str, Vec<u8>)],
) {
    let mut pos = 0usize;
    let entries: Vec<(&str, &str, usize, usize)> = blocks
        .iter()
        .map(|(name, version, body)| {
            let entry = (*name, *version, pos, body.len());
            pos += body.len();
            entry
        })
        .collect();
    writer.write_i32_prefixed(&mpack::encode(&lst_info(&entries)));
    let total: usize = blocks.iter().map(|(_, _, b)| b.len()).sum();
    writer.write_i64(total as i64);
    for (_, _, body) in blocks {
        writer.write_bytes(body);
    }
}

/// Body of a fielded block: one i32-length-prefixed encoded value per field.
pub fn fielded_body(fields: &[Value]) -> Vec<u8> {
    let mut w = Writer::new();
    for field in fields {
        w.write_i32_prefixed(&mpack::encode(field));
    }
    w.into_bytes()
}

/// One Koikatu coordinate entry: clothes + accessory + makeup flag + makeup.
pub fn kk_coordinate_body(outfits: usize) -> Vec<u8> {
    let mut entries = Vec::new();
    for i in 0..outfits {
        let mut entry = Writer::new();
        entry.write_i32_prefixed(&mpack::encode(&Value::map(vec![(
            Value::str("clothes_no"),
            Value::uint(i as u64),
        )])));
        entry.write_i32_prefixed(&mpack::encode(&Value::Null));
        entry.write_i8(1);
        entry.write_i32_prefixed(&mpack::encode(&Value::Null));
        entries.push(Value::bin(entry.into_bytes()));
    }
    mpack::encode(&Value::array(entries))
}

/// Honeycome coordinate entry: five length-prefixed fields per outfit.
pub fn hc_coordinate_body(outfits: usize) -> Vec<u8> {
    let mut entries = Vec::new();
    for _ in 0..outfits {
        let mut entry = Writer::new();
        for _ in 0..5 {
            entry.write_i32_prefixed(&mpack::encode(&Value::Null));
        }
        entries.push(Value::bin(entry.into_bytes()));
    }
    mpack::encode(&Value::array(entries))
}

pub fn parameter_body(nickname: &str) -> Vec<u8> {
    mpack::encode(&Value::map(vec![
        (Value::str("lastname"), Value::str("大空")),
        (Value::str("firstname"), Value::str("司")),
        (Value::str("nickname"), Value::str(nickname)),
        (Value::str("sex"), Value::uint(1)),
    ]))
}

pub fn status_body() -> Vec<u8> {
    mpack::encode(&Value::map(vec![
        (Value::str("coordinateType"), Value::uint(0)),
        (Value::str("visibleHeadAlways"), Value::Bool(true)),
    ]))
}

/// Card header shared by Koikatu-lineage variants (face image field).
fn write_kk_style_header(writer: &mut Writer, product_no: i32, magic: &str, face: &[u8]) {
    writer.write_i32(product_no);
    writer.write_i8_prefixed(magic.as_bytes());
    writer.write_i8_prefixed(b"0.0.0");
    writer.write_i32_prefixed(face);
}

/// A complete Koikatu card. `blocks` are laid out in the given order.
pub fn koikatu_card(with_png: bool, blocks: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut w = Writer::new();
    if with_png {
        w.write_bytes(&tiny_png(1));
    }
    write_kk_style_header(&mut w, 100, "\u{3010}KoiKatuChara\u{3011}", &tiny_png(2));
    write_block_section(&mut w, blocks);
    w.into_bytes()
}

pub fn default_koikatu_blocks() -> Vec<(&'static str, &'static str, Vec<u8>)> {
    vec![
        (
            "Custom",
            "0.0.0",
            fielded_body(&[
                Value::map(vec![(Value::str("shapeValueFace"), Value::F32(0.5))]),
                Value::map(vec![(Value::str("shapeValueBody"), Value::F32(0.25))]),
                Value::map(vec![(Value::str("kind"), Value::uint(3))]),
            ]),
        ),
        ("Coordinate", "0.0.0", kk_coordinate_body(2)),
        ("Parameter", "0.0.5", parameter_body("かずのん")),
        ("Status", "0.0.0", status_body()),
    ]
}

/// A Honeycome-family card with the given magic and game-specific blocks.
pub fn illgames_card(magic: &str, extra_blocks: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_bytes(&tiny_png(3));
    write_kk_style_header(&mut w, 300, magic, &tiny_png(4));
    let mut blocks: Vec<(&str, &str, Vec<u8>)> = vec![
        (
            "Custom",
            "0.0.0",
            fielded_body(&[
                Value::map(vec![(Value::str("shapeValueFace"), Value::F32(0.75))]),
                Value::map(vec![(Value::str("shapeValueBody"), Value::F32(0.5))]),
            ]),
        ),
        ("Coordinate", "0.0.0", hc_coordinate_body(1)),
        ("Parameter", "0.0.1", parameter_body("ほのか")),
        ("Status", "0.0.0", status_body()),
    ];
    blocks.extend(extra_blocks.iter().map(|(n, v, b)| (*n, *v, b.clone())));
    write_block_section(&mut w, &blocks);
    w.into_bytes()
}

/// An EmotionCreators card: language/userid/dataid/packages header.
pub fn emocre_card(blocks: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_bytes(&tiny_png(5));
    w.write_i32(200);
    w.write_i8_prefixed("\u{3010}EroMakeChara\u{3011}".as_bytes());
    w.write_i8_prefixed(b"0.0.1");
    w.write_i32(0);
    w.write_i8_prefixed(b"user-0001");
    w.write_i8_prefixed(b"data-0001");
    w.write_i32(2);
    w.write_i32(1000);
    w.write_i32(1001);
    write_block_section(&mut w, blocks);
    w.into_bytes()
}

/// A KKEx body with one nested plugin payload under KCOX/1/Overlays.
pub fn kkex_body(inner: &Value) -> Vec<u8> {
    mpack::encode(&Value::map(vec![
        (
            Value::str("KCOX"),
            Value::array(vec![
                Value::uint(1),
                Value::map(vec![(
                    Value::str("Overlays"),
                    Value::bin(mpack::encode(inner)),
                )]),
            ]),
        ),
        (Value::str("Version"), Value::uint(3)),
    ]))
}
