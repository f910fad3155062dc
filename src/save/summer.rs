//! SummerVacationScramble saves: an encoded meta map, then one entry per
//! registered character (relationship detail map + full card with PNG),
//! then a trailer pointing back at the player's entry. Every length and
//! the player offset are derived values and recomputed on save.

use std::path::Path;

use crate::cursor::{Cursor, Writer};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::mpack::{self, Value};
use crate::variant::Variant;

#[derive(Debug)]
pub struct SummerSaveEntry {
    /// Relationship/game-parameter map for this character.
    pub detail: Value,
    pub chara: Document,
}

impl SummerSaveEntry {
    /// Whether this entry is the player character.
    pub fn is_player(&self) -> bool {
        self.detail
            .get("charasGameParam")
            .and_then(|p| p.get("isPC"))
            .map(truthy)
            .unwrap_or(false)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(v, _) => *v != 0,
        Value::UInt(v, _) => *v != 0,
        _ => false,
    }
}

pub struct SummerVacationSave {
    pub meta: Value,
    pub entries: Vec<SummerSaveEntry>,
    pub unknown: u32,
}

impl SummerVacationSave {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let meta = mpack::decode(cursor.read_i32_prefixed()?)?;
        // Total data length; recomputed on save.
        cursor.read_u64()?;
        let chara_count = cursor.read_u32()? as usize;

        let mut entries = Vec::with_capacity(chara_count);
        for _ in 0..chara_count {
            // Entry length prefix, also derived.
            cursor.read_u32()?;
            let detail = mpack::decode(cursor.read_i32_prefixed()?)?;
            let chara = Document::read_embedded(&mut cursor, true)?;
            entries.push(SummerSaveEntry { detail, chara });
        }

        let unknown = cursor.read_u32()?;
        // Player offset trailer, derived from the entries.
        cursor.read_u64()?;
        if cursor.remaining() != 0 {
            return Err(Error::SchemaMismatch {
                context: "save file",
                expected: "no data after player offset",
                found: format!("{} trailing bytes", cursor.remaining()),
            });
        }

        Ok(Self {
            meta,
            entries,
            unknown,
        })
    }

    pub fn variant(&self) -> Variant {
        Variant::SummerVacationSave
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let meta_bytes = mpack::encode(&self.meta);

        let mut chara_section = Writer::new();
        let mut player_offset = 0u64;
        let mut before_player = true;
        for entry in &self.entries {
            let detail_bytes = mpack::encode(&entry.detail);
            let mut card = Writer::new();
            card.write_bytes(&entry.chara.image);
            entry.chara.write_card(&mut card)?;
            let card_bytes = card.into_bytes();

            let entry_len = 4 + detail_bytes.len() + card_bytes.len();
            if entry.is_player() {
                before_player = false;
            }
            if before_player {
                player_offset += 4 + entry_len as u64;
            }
            chara_section.write_u32(entry_len as u32);
            chara_section.write_i32_prefixed(&detail_bytes);
            chara_section.write_bytes(&card_bytes);
        }
        let chara_bytes = chara_section.into_bytes();

        // Offsets are measured from the start of the file: meta length
        // field + meta + total length + character count.
        let lead = meta_bytes.len() as u64 + 4 + 8 + 4;
        let data_length = meta_bytes.len() as u64 + chara_bytes.len() as u64 + 4 + 8 + 4;

        let mut writer = Writer::with_capacity(data_length as usize + 16);
        writer.write_i32_prefixed(&meta_bytes);
        writer.write_u64(data_length);
        writer.write_u32(self.entries.len() as u32);
        writer.write_bytes(&chara_bytes);
        writer.write_u32(self.unknown);
        writer.write_u64(lead + player_offset);
        Ok(writer.into_bytes())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save_bytes()?)?;
        Ok(())
    }
}

impl std::fmt::Debug for SummerVacationSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummerVacationSave")
            .field("entries", &self.entries.len())
            .finish()
    }
}
