//! Koikatu game saves: school header, the player, heroine records (each
//! embedding a PNG-less character card plus stat tables), club data, and
//! action controls. Stat groups are table-driven; the tables give field
//! order and width, values live in an ordered map.

use std::path::Path;

use crate::cursor::{Cursor, Writer};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::mpack::Value;
use crate::variant::Variant;

#[derive(Debug, Clone, Copy)]
enum VarKind {
    I32,
    F32,
    I8,
}

const PLAYER_VARS: &[(&str, VarKind)] = &[
    ("girlfriends", VarKind::I32),
    ("hpeople_cnt", VarKind::I32),
    ("org_cnt", VarKind::I32),
    ("h_cnt", VarKind::I32),
    ("intel", VarKind::I32),
    ("physical", VarKind::I32),
    ("hentai", VarKind::I32),
    ("playtime_calc", VarKind::F32),
    ("change_clothtype", VarKind::I32),
    ("playtime", VarKind::I32),
];

const SCHOOL_VARS: &[(&str, VarKind)] = &[
    ("staffadd", VarKind::I32),
    ("comadd", VarKind::I32),
    ("hadd", VarKind::F32),
    ("staff", VarKind::I32),
    ("point", VarKind::I32),
    ("withheroine", VarKind::I32),
    ("dateheroine", VarKind::I32),
];

const HEROINE_VARS_1: &[(&str, VarKind)] = &[
    ("favor", VarKind::I32),
    ("lewdness", VarKind::I32),
    ("h_cnt", VarKind::I32),
    ("is_staff", VarKind::I8),
    ("is_girlfriend", VarKind::I8),
    ("is_anger", VarKind::I8),
    ("fix_chara_id", VarKind::I32),
    ("is_taked", VarKind::I8),
    ("is_date", VarKind::I8),
    ("nickname_talk_cnt", VarKind::I32),
    ("myroom_cnt", VarKind::I32),
    ("menstruction_start", VarKind::I32),
    ("menstruction", VarKind::I8),
];

const HEROINE_VARS_2: &[(&str, VarKind)] = &[
    ("is_virgin", VarKind::I8),
    ("is_analvirgin", VarKind::I8),
    ("kokan_h_cnt", VarKind::F32),
    ("anal_h_cnt", VarKind::F32),
    ("is_kiss", VarKind::I8),
    ("count_nama_insert", VarKind::I32),
    ("count_nama_houshi", VarKind::I32),
];

const HEROINE_VARS_3: &[(&str, VarKind)] = &[
    ("houshiexp", VarKind::F32),
    ("event_afterday", VarKind::I32),
    ("is_first_girlfriend", VarKind::I8),
    ("intimacy", VarKind::I32),
];

fn read_vars(cursor: &mut Cursor<'_>, table: &[(&'static str, VarKind)]) -> Result<Value> {
    let mut pairs = Vec::with_capacity(table.len());
    for &(name, kind) in table {
        let value = match kind {
            VarKind::I32 => Value::int(cursor.read_i32()? as i64),
            VarKind::F32 => Value::F32(cursor.read_f32()?),
            VarKind::I8 => Value::int(cursor.read_i8()? as i64),
        };
        pairs.push((Value::str(name), value));
    }
    Ok(Value::map(pairs))
}

fn write_vars(
    vars: &Value,
    table: &[(&'static str, VarKind)],
    writer: &mut Writer,
) -> Result<()> {
    for &(name, kind) in table {
        let value = vars.get(name).ok_or(Error::SchemaMismatch {
            context: "save variables",
            expected: name,
            found: "missing field".to_owned(),
        })?;
        match kind {
            VarKind::I32 => writer.write_i32(value.as_i64().unwrap_or(0) as i32),
            VarKind::F32 => writer.write_f32(value.as_f64().unwrap_or(0.0) as f32),
            VarKind::I8 => writer.write_i8(value.as_i64().unwrap_or(0) as i8),
        }
    }
    Ok(())
}

/// A character slot: class placement plus the embedded card and call name.
#[derive(Debug)]
pub struct CharaSlot {
    pub chara_class: i32,
    pub class_idx: i32,
    pub chara: Document,
    pub nametype: i32,
    pub callid: i32,
    pub callname: String,
}

impl CharaSlot {
    fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            chara_class: cursor.read_i32()?,
            class_idx: cursor.read_i32()?,
            chara: Document::read_embedded(cursor, false)?,
            nametype: cursor.read_i32()?,
            callid: cursor.read_i32()?,
            callname: cursor.read_varint_string()?,
        })
    }

    fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i32(self.chara_class);
        writer.write_i32(self.class_idx);
        self.chara.write_card(writer)?;
        writer.write_i32(self.nametype);
        writer.write_i32(self.callid);
        writer.write_varint_prefixed(self.callname.as_bytes());
        Ok(())
    }
}

#[derive(Debug)]
pub struct Heroine {
    pub slot: CharaSlot,
    pub stats: Value,
    pub h_exps: Vec<f32>,
    pub massage_exps: Vec<f32>,
    pub stats2: Value,
    pub talk_events: Vec<i32>,
    /// 39 bytes of mood state, carried opaque.
    pub talk_temper: Vec<u8>,
    pub confessed: i8,
    /// Motion name to speed, order preserved.
    pub motionspeeds: Value,
    pub stats3: Value,
}

impl Heroine {
    fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        let slot = CharaSlot::read(cursor)?;
        let stats = read_vars(cursor, HEROINE_VARS_1)?;
        let h_exps = read_f32_list(cursor)?;
        let massage_exps = read_f32_list(cursor)?;
        let stats2 = read_vars(cursor, HEROINE_VARS_2)?;
        let talk_events = read_i32_list(cursor)?;
        let talk_temper = cursor.read_bytes(39)?.to_vec();
        let confessed = cursor.read_i8()?;
        let speed_count = cursor.read_i32()?.max(0) as usize;
        let mut speeds = Vec::with_capacity(speed_count);
        for _ in 0..speed_count {
            let key = cursor.read_varint_string()?;
            speeds.push((Value::str(key), Value::F32(cursor.read_f32()?)));
        }
        let stats3 = read_vars(cursor, HEROINE_VARS_3)?;
        Ok(Self {
            slot,
            stats,
            h_exps,
            massage_exps,
            stats2,
            talk_events,
            talk_temper,
            confessed,
            motionspeeds: Value::map(speeds),
            stats3,
        })
    }

    fn write(&self, writer: &mut Writer) -> Result<()> {
        self.slot.write(writer)?;
        write_vars(&self.stats, HEROINE_VARS_1, writer)?;
        write_f32_list(&self.h_exps, writer);
        write_f32_list(&self.massage_exps, writer);
        write_vars(&self.stats2, HEROINE_VARS_2, writer)?;
        write_i32_list(&self.talk_events, writer);
        writer.write_bytes(&self.talk_temper);
        writer.write_i8(self.confessed);
        let speeds = self.motionspeeds.as_map().unwrap_or(&[]);
        writer.write_i32(speeds.len() as i32);
        for (key, speed) in speeds {
            writer.write_varint_prefixed(key.as_str().unwrap_or("").as_bytes());
            writer.write_f32(speed.as_f64().unwrap_or(0.0) as f32);
        }
        write_vars(&self.stats3, HEROINE_VARS_3, writer)
    }
}

#[derive(Debug, Clone)]
pub struct ActionControl {
    pub school_class: i32,
    pub class_idx: i32,
    pub entries: Vec<(i32, i32)>,
}

pub struct KoikatuSave {
    pub version: String,
    pub school_name: String,
    pub emblem: i32,
    pub opening: i8,
    pub week: i32,
    pub player: CharaSlot,
    pub player_vars: Value,
    pub heroines: Vec<Heroine>,
    pub met_personality: Vec<i32>,
    pub clubpoint: i32,
    /// Club id to content list, order preserved.
    pub clubcontents: Value,
    pub clubcontent_items: Vec<i32>,
    pub school_vars: Value,
    pub action_controls: Vec<ActionControl>,
}

impl KoikatuSave {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let version = cursor.read_varint_string()?;
        let school_name = cursor.read_varint_string()?;
        let emblem = cursor.read_i32()?;
        let opening = cursor.read_i8()?;
        let week = cursor.read_i32()?;

        let player = CharaSlot::read(&mut cursor)?;
        let player_vars = read_vars(&mut cursor, PLAYER_VARS)?;

        let heroine_count = cursor.read_i32()?.max(0) as usize;
        let mut heroines = Vec::with_capacity(heroine_count);
        for _ in 0..heroine_count {
            heroines.push(Heroine::read(&mut cursor)?);
        }

        let met_personality = read_i32_list(&mut cursor)?;

        let clubpoint = cursor.read_i32()?;
        let club_count = cursor.read_i32()?.max(0) as usize;
        let mut clubcontents = Vec::with_capacity(club_count);
        for _ in 0..club_count {
            let key = cursor.read_i32()? as i64;
            let contents = read_i32_list(&mut cursor)?;
            clubcontents.push((
                Value::int(key),
                Value::array(contents.iter().map(|&v| Value::int(v as i64)).collect()),
            ));
        }
        let clubcontent_items = read_i32_list(&mut cursor)?;

        let school_vars = read_vars(&mut cursor, SCHOOL_VARS)?;

        let control_count = cursor.read_i32()?.max(0) as usize;
        let mut action_controls = Vec::with_capacity(control_count);
        for _ in 0..control_count {
            let school_class = cursor.read_i32()?;
            let class_idx = cursor.read_i32()?;
            let entry_count = cursor.read_i32()?.max(0) as usize;
            let mut entries = Vec::with_capacity(entry_count);
            for _ in 0..entry_count {
                entries.push((cursor.read_i32()?, cursor.read_i32()?));
            }
            action_controls.push(ActionControl {
                school_class,
                class_idx,
                entries,
            });
        }

        Ok(Self {
            version,
            school_name,
            emblem,
            opening,
            week,
            player,
            player_vars,
            heroines,
            met_personality,
            clubpoint,
            clubcontents: Value::map(clubcontents),
            clubcontent_items,
            school_vars,
            action_controls,
        })
    }

    pub fn variant(&self) -> Variant {
        Variant::KoikatuSave
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        writer.write_varint_prefixed(self.version.as_bytes());
        writer.write_varint_prefixed(self.school_name.as_bytes());
        writer.write_i32(self.emblem);
        writer.write_i8(self.opening);
        writer.write_i32(self.week);

        self.player.write(&mut writer)?;
        write_vars(&self.player_vars, PLAYER_VARS, &mut writer)?;

        writer.write_i32(self.heroines.len() as i32);
        for heroine in &self.heroines {
            heroine.write(&mut writer)?;
        }

        write_i32_list(&self.met_personality, &mut writer);

        writer.write_i32(self.clubpoint);
        let clubs = self.clubcontents.as_map().unwrap_or(&[]);
        writer.write_i32(clubs.len() as i32);
        for (key, contents) in clubs {
            writer.write_i32(key.as_i64().unwrap_or(0) as i32);
            let items = contents.as_array().unwrap_or(&[]);
            writer.write_i32(items.len() as i32);
            for item in items {
                writer.write_i32(item.as_i64().unwrap_or(0) as i32);
            }
        }
        write_i32_list(&self.clubcontent_items, &mut writer);

        write_vars(&self.school_vars, SCHOOL_VARS, &mut writer)?;

        writer.write_i32(self.action_controls.len() as i32);
        for control in &self.action_controls {
            writer.write_i32(control.school_class);
            writer.write_i32(control.class_idx);
            writer.write_i32(control.entries.len() as i32);
            for (a, b) in &control.entries {
                writer.write_i32(*a);
                writer.write_i32(*b);
            }
        }
        Ok(writer.into_bytes())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save_bytes()?)?;
        Ok(())
    }
}

fn read_i32_list(cursor: &mut Cursor<'_>) -> Result<Vec<i32>> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(cursor.read_i32()?);
    }
    Ok(items)
}

fn write_i32_list(items: &[i32], writer: &mut Writer) {
    writer.write_i32(items.len() as i32);
    for item in items {
        writer.write_i32(*item);
    }
}

fn read_f32_list(cursor: &mut Cursor<'_>) -> Result<Vec<f32>> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(cursor.read_f32()?);
    }
    Ok(items)
}

fn write_f32_list(items: &[f32], writer: &mut Writer) {
    writer.write_i32(items.len() as i32);
    for item in items {
        writer.write_f32(*item);
    }
}

impl std::fmt::Debug for KoikatuSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KoikatuSave")
            .field("school_name", &self.school_name)
            .field("week", &self.week)
            .field("heroines", &self.heroines.len())
            .finish()
    }
}
