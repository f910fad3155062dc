//! DigitalCraft scene container as used by Honeycome and its siblings.
//!
//! The stream shares the studio object dictionary with Koikatu scenes but
//! reshuffles most record fields and carries its lighting/camera settings
//! in opaque (optionally AES-encrypted) tail blocks. Those blocks are kept
//! verbatim; decrypting them is a caller concern.

use std::path::Path;

use crate::cursor::{Cursor, Writer};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::mpack::Value;
use crate::png;
use crate::variant::Variant;

use super::object::{
    field, field_bin, field_f32, field_i32, field_str, read_bone_info, read_change_amount,
    read_flag, read_flag_array, read_int_map, read_object_base, write_bone_info,
    write_change_amount, write_flag, write_flag_array, write_int_map, write_object_base,
    children_as_list, type_error, Fields,
};
use super::{unknown_object_kind, Children, ObjectKind, ObjectRecord, Walk};

const FOOTER_MARKER: &str = "\u{3010}DigitalCraft\u{3011}";

pub struct HoneycomeScene {
    pub image: Vec<u8>,
    pub version: String,
    pub user_id: String,
    pub data_id: String,
    pub title: String,
    pub unknown_1: i32,
    /// Opaque settings block (encrypted in store-published scenes).
    pub unknown_2: Vec<u8>,
    pub objects: Vec<(i32, ObjectRecord)>,
    /// Ten opaque tail blocks (lights, camera, sound, ...).
    pub tail_blocks: Vec<Vec<u8>>,
    pub frame_filename: String,
    pub tail_block_11: Vec<u8>,
    pub footer_marker: String,
    /// Bytes after the footer; usually empty, sometimes mod data.
    pub residue: Vec<u8>,
}

impl HoneycomeScene {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let split = png::split(data)?;
        let mut cursor = Cursor::new(data);
        cursor.seek(data.len() - split.tail.len());

        let version = cursor.read_varint_string()?;
        let user_id = cursor.read_varint_string()?;
        let data_id = cursor.read_varint_string()?;
        let title = cursor.read_varint_string()?;
        let unknown_1 = cursor.read_i32()?;
        let unknown_2 = cursor.read_i32_prefixed()?.to_vec();

        let object_count = cursor.read_i32()?.max(0) as usize;
        let mut objects = Vec::with_capacity(object_count);
        for _ in 0..object_count {
            let key = cursor.read_i32()?;
            let code = cursor.read_i32()?;
            objects.push((key, load_hc_object(&mut cursor, code)?));
        }

        let mut tail_blocks = Vec::with_capacity(10);
        for _ in 0..10 {
            tail_blocks.push(cursor.read_i32_prefixed()?.to_vec());
        }
        let frame_filename = cursor.read_varint_string()?;
        let tail_block_11 = cursor.read_i32_prefixed()?.to_vec();
        let footer_marker = cursor.read_varint_string()?;
        if footer_marker != FOOTER_MARKER {
            return Err(Error::SchemaMismatch {
                context: "scene footer",
                expected: FOOTER_MARKER,
                found: footer_marker,
            });
        }
        let residue = cursor.read_bytes(cursor.remaining())?.to_vec();

        Ok(Self {
            image: split.image.to_vec(),
            version,
            user_id,
            data_id,
            title,
            unknown_1,
            unknown_2,
            objects,
            tail_blocks,
            frame_filename,
            tail_block_11,
            footer_marker,
            residue,
        })
    }

    pub fn variant(&self) -> Variant {
        Variant::HoneycomeScene
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::with_capacity(self.image.len() + 4096);
        writer.write_bytes(&self.image);
        writer.write_varint_prefixed(self.version.as_bytes());
        writer.write_varint_prefixed(self.user_id.as_bytes());
        writer.write_varint_prefixed(self.data_id.as_bytes());
        writer.write_varint_prefixed(self.title.as_bytes());
        writer.write_i32(self.unknown_1);
        writer.write_i32_prefixed(&self.unknown_2);

        writer.write_i32(self.objects.len() as i32);
        for (key, record) in &self.objects {
            writer.write_i32(*key);
            writer.write_i32(record.kind.code());
            save_hc_object(record, &mut writer)?;
        }

        for block in &self.tail_blocks {
            writer.write_i32_prefixed(block);
        }
        writer.write_varint_prefixed(self.frame_filename.as_bytes());
        writer.write_i32_prefixed(&self.tail_block_11);
        writer.write_varint_prefixed(self.footer_marker.as_bytes());
        writer.write_bytes(&self.residue);
        Ok(writer.into_bytes())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save_bytes()?)?;
        Ok(())
    }

    pub fn walk(&self, filter: Option<ObjectKind>) -> Walk<'_> {
        Walk::new(&self.objects, filter)
    }
}

fn load_hc_object(cursor: &mut Cursor<'_>, code: i32) -> Result<ObjectRecord> {
    let kind = ObjectKind::from_code(code).ok_or_else(|| unknown_object_kind(code))?;
    match kind {
        ObjectKind::Character => load_char(cursor),
        ObjectKind::Item => load_item(cursor),
        ObjectKind::Light => load_light(cursor),
        ObjectKind::Folder => load_folder(cursor),
        ObjectKind::Route => load_route(cursor),
        ObjectKind::Camera => load_camera(cursor),
        ObjectKind::Text => Err(unknown_object_kind(code)),
    }
}

fn save_hc_object(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    match record.kind {
        ObjectKind::Character => save_char(record, writer),
        ObjectKind::Item => save_item(record, writer),
        ObjectKind::Light => save_light(record, writer),
        ObjectKind::Folder => save_folder(record, writer),
        ObjectKind::Route => save_route(record, writer),
        ObjectKind::Camera => save_camera(record, writer),
        ObjectKind::Text => Err(unknown_object_kind(record.kind.code())),
    }
}

fn read_keyed_bones(cursor: &mut Cursor<'_>) -> Result<Value> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let key = cursor.read_i32()? as i64;
        pairs.push((Value::int(key), read_bone_info(cursor)?));
    }
    Ok(Value::map(pairs))
}

fn read_child_list(cursor: &mut Cursor<'_>) -> Result<Vec<ObjectRecord>> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut children = Vec::with_capacity(count);
    for _ in 0..count {
        let code = cursor.read_i32()?;
        children.push(load_hc_object(cursor, code)?);
    }
    Ok(children)
}

fn write_child_list(children: &[ObjectRecord], writer: &mut Writer) -> Result<()> {
    writer.write_i32(children.len() as i32);
    for child in children {
        writer.write_i32(child.kind.code());
        save_hc_object(child, writer)?;
    }
    Ok(())
}

fn load_char(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("sex", Value::int(cursor.read_i32()? as i64));

    // Which ILLGAMES card follows is decided by its own magic.
    let character = Document::read_embedded(cursor, false)?;

    fields.push("bones", read_keyed_bones(cursor)?);
    fields.push("ik_targets", read_keyed_bones(cursor)?);

    let slot_count = cursor.read_i32()?.max(0) as usize;
    let mut groups = Vec::with_capacity(slot_count);
    for _ in 0..slot_count {
        let slot = cursor.read_i32()?;
        groups.push((slot, read_child_list(cursor)?));
    }

    fields.push("kinematic_mode", Value::int(cursor.read_i32()? as i64));
    fields.push(
        "anime_info",
        Value::map(vec![
            (Value::str("group"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("category"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("no"), Value::int(cursor.read_i32()? as i64)),
        ]),
    );
    fields.push(
        "hand_patterns",
        Value::array(vec![
            Value::int(cursor.read_i32()? as i64),
            Value::int(cursor.read_i32()? as i64),
        ]),
    );
    fields.push("nipple", Value::F32(cursor.read_f32()?));
    fields.push("siru", Value::bin(cursor.read_bytes(5)?.to_vec()));
    fields.push("mouth_open", Value::F32(cursor.read_f32()?));
    fields.push("lip_sync", read_flag(cursor)?);
    fields.push("unknown_bytes_1", Value::bin(cursor.read_bytes(4)?.to_vec()));
    fields.push(
        "lookAtTarget",
        Value::map(vec![
            (Value::str("dicKey"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("changeAmount"), read_change_amount(cursor)?),
        ]),
    );
    fields.push(
        "unknown_bytes_2",
        Value::bin(cursor.read_bytes(14)?.to_vec()),
    );
    fields.push("enable_ik", read_flag(cursor)?);
    fields.push("active_ik", read_flag_array(cursor, 5)?);
    fields.push("enable_fk", read_flag(cursor)?);
    fields.push("active_fk", read_flag_array(cursor, 7)?);
    fields.push("expression", read_flag_array(cursor, 9)?);
    fields.push("anime_speed", Value::F32(cursor.read_f32()?));
    fields.push("anime_pattern", Value::F32(cursor.read_f32()?));
    fields.push("anime_option_visible", read_flag(cursor)?);
    fields.push("is_anime_force_loop", read_flag(cursor)?);
    fields.push("unknown_int_1", Value::int(cursor.read_i32()? as i64));
    fields.push("unknown_int_2", Value::int(cursor.read_i32()? as i64));

    let voice_count = cursor.read_i32()?.max(0) as usize;
    let mut voices = Vec::with_capacity(voice_count);
    for _ in 0..voice_count {
        voices.push(Value::map(vec![
            (Value::str("group"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("category"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("no"), Value::int(cursor.read_i32()? as i64)),
        ]));
    }
    // Unlike Koikatu, repeat shrank to one byte here.
    fields.push(
        "voiceCtrl",
        Value::map(vec![
            (Value::str("list"), Value::array(voices)),
            (Value::str("repeat"), read_flag(cursor)?),
        ]),
    );

    fields.push("visible_son", read_flag(cursor)?);
    fields.push("son_length", Value::F32(cursor.read_f32()?));
    fields.push("visible_simple", read_flag(cursor)?);
    fields.push("simple_color", Value::str(cursor.read_i8_string()?));
    fields.push(
        "anime_option_param",
        Value::array(vec![
            Value::F32(cursor.read_f32()?),
            Value::F32(cursor.read_f32()?),
        ]),
    );
    fields.push("unknown_int_3", Value::int(cursor.read_i32()? as i64));
    fields.push(
        "neck_byte_data",
        Value::bin(cursor.read_i32_prefixed()?.to_vec()),
    );
    fields.push(
        "eyes_byte_data",
        Value::bin(cursor.read_i32_prefixed()?.to_vec()),
    );
    fields.push("anime_normalized_time", Value::F32(cursor.read_f32()?));
    fields.push("dic_access_group", read_int_map(cursor)?);
    fields.push("dic_access_no", read_int_map(cursor)?);

    Ok(ObjectRecord {
        kind: ObjectKind::Character,
        data: fields.into_value(),
        character: Some(Box::new(character)),
        children: Children::Keyed(groups),
    })
}

fn save_char(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_i32(field_i32(data, "sex")?);

    let character = record.character.as_ref().ok_or(Error::SchemaMismatch {
        context: "scene character",
        expected: "embedded card",
        found: "none".to_owned(),
    })?;
    character.write_card(writer)?;

    for key in ["bones", "ik_targets"] {
        let map = field(data, key)?.as_map().ok_or(type_error(key, "map"))?;
        writer.write_i32(map.len() as i32);
        for (slot, bone) in map {
            writer.write_i32(slot.as_i64().unwrap_or(0) as i32);
            write_bone_info(bone, writer)?;
        }
    }

    let Children::Keyed(groups) = &record.children else {
        return Err(type_error("child", "keyed children"));
    };
    writer.write_i32(groups.len() as i32);
    for (slot, list) in groups {
        writer.write_i32(*slot);
        write_child_list(list, writer)?;
    }

    writer.write_i32(field_i32(data, "kinematic_mode")?);
    let anime = field(data, "anime_info")?;
    writer.write_i32(field_i32(anime, "group")?);
    writer.write_i32(field_i32(anime, "category")?);
    writer.write_i32(field_i32(anime, "no")?);
    for slot in field(data, "hand_patterns")?.as_array().into_iter().flatten() {
        writer.write_i32(slot.as_i64().unwrap_or(0) as i32);
    }
    writer.write_f32(field_f32(data, "nipple")?);
    writer.write_bytes(field_bin(data, "siru")?);
    writer.write_f32(field_f32(data, "mouth_open")?);
    write_flag(field(data, "lip_sync")?, writer)?;
    writer.write_bytes(field_bin(data, "unknown_bytes_1")?);

    let look = field(data, "lookAtTarget")?;
    writer.write_i32(field_i32(look, "dicKey")?);
    write_change_amount(field(look, "changeAmount")?, writer)?;
    writer.write_bytes(field_bin(data, "unknown_bytes_2")?);

    write_flag(field(data, "enable_ik")?, writer)?;
    write_flag_array(field(data, "active_ik")?, writer)?;
    write_flag(field(data, "enable_fk")?, writer)?;
    write_flag_array(field(data, "active_fk")?, writer)?;
    write_flag_array(field(data, "expression")?, writer)?;
    writer.write_f32(field_f32(data, "anime_speed")?);
    writer.write_f32(field_f32(data, "anime_pattern")?);
    write_flag(field(data, "anime_option_visible")?, writer)?;
    write_flag(field(data, "is_anime_force_loop")?, writer)?;
    writer.write_i32(field_i32(data, "unknown_int_1")?);
    writer.write_i32(field_i32(data, "unknown_int_2")?);

    let voice = field(data, "voiceCtrl")?;
    let list = field(voice, "list")?
        .as_array()
        .ok_or(type_error("voiceCtrl", "array"))?;
    writer.write_i32(list.len() as i32);
    for entry in list {
        writer.write_i32(field_i32(entry, "group")?);
        writer.write_i32(field_i32(entry, "category")?);
        writer.write_i32(field_i32(entry, "no")?);
    }
    write_flag(field(voice, "repeat")?, writer)?;

    write_flag(field(data, "visible_son")?, writer)?;
    writer.write_f32(field_f32(data, "son_length")?);
    write_flag(field(data, "visible_simple")?, writer)?;
    writer.write_i8_prefixed(field_str(data, "simple_color")?.as_bytes());
    for param in field(data, "anime_option_param")?
        .as_array()
        .into_iter()
        .flatten()
    {
        writer.write_f32(param.as_f64().unwrap_or(0.0) as f32);
    }
    writer.write_i32(field_i32(data, "unknown_int_3")?);
    writer.write_i32_prefixed(field_bin(data, "neck_byte_data")?);
    writer.write_i32_prefixed(field_bin(data, "eyes_byte_data")?);
    writer.write_f32(field_f32(data, "anime_normalized_time")?);
    write_int_map(field(data, "dic_access_group")?, writer)?;
    write_int_map(field(data, "dic_access_no")?, writer)
}

/// Honeycome patterns branch on the slot key: -1 selects a file path.
fn read_pattern_info(cursor: &mut Cursor<'_>) -> Result<Value> {
    let mut pairs = vec![
        (Value::str("unknown_float"), Value::F32(cursor.read_f32()?)),
        (Value::str("key"), Value::int(cursor.read_i32()? as i64)),
    ];
    let key = pairs[1].1.as_i64().unwrap_or(0);
    if key == -1 {
        pairs.push((
            Value::str("pattern_filepath"),
            Value::str(cursor.read_varint_string()?),
        ));
        pairs.push((Value::str("unknown_bool"), read_flag(cursor)?));
    } else {
        pairs.push((Value::str("clamp"), read_flag(cursor)?));
        pairs.push((Value::str("unknown_bool"), read_flag(cursor)?));
    }
    pairs.push((Value::str("uv"), Value::str(cursor.read_varint_string()?)));
    Ok(Value::map(pairs))
}

fn write_pattern_info(pattern: &Value, writer: &mut Writer) -> Result<()> {
    writer.write_f32(field_f32(pattern, "unknown_float")?);
    let key = field_i32(pattern, "key")?;
    writer.write_i32(key);
    if key == -1 {
        writer.write_varint_prefixed(field_str(pattern, "pattern_filepath")?.as_bytes());
        write_flag(field(pattern, "unknown_bool")?, writer)?;
    } else {
        write_flag(field(pattern, "clamp")?, writer)?;
        write_flag(field(pattern, "unknown_bool")?, writer)?;
    }
    writer.write_varint_prefixed(field_str(pattern, "uv")?.as_bytes());
    Ok(())
}

fn load_item(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("unknown_1", Value::int(cursor.read_i32()? as i64));
    fields.push("group", Value::int(cursor.read_i32()? as i64));
    fields.push("category", Value::int(cursor.read_i32()? as i64));
    fields.push("no", Value::int(cursor.read_i32()? as i64));
    fields.push("unknown_3", Value::bin(cursor.read_bytes(8)?.to_vec()));

    let mut colors = Vec::with_capacity(8);
    for _ in 0..8 {
        colors.push(Value::str(cursor.read_varint_string()?));
    }
    fields.push("colors", Value::array(colors));

    fields.push("unknown_4", Value::int(cursor.read_i32()? as i64));
    fields.push("unknown_5", read_flag(cursor)?);

    let mut patterns = Vec::with_capacity(3);
    for _ in 0..3 {
        patterns.push(read_pattern_info(cursor)?);
    }
    fields.push("patterns", Value::array(patterns));

    fields.push("unknown_6", Value::bin(cursor.read_bytes(4)?.to_vec()));
    fields.push("alpha", Value::F32(cursor.read_f32()?));
    fields.push("line_color", Value::str(cursor.read_varint_string()?));
    fields.push("line_width", Value::F32(cursor.read_f32()?));
    fields.push("emission_color", Value::str(cursor.read_varint_string()?));
    fields.push("emission_power", Value::F32(cursor.read_f32()?));
    fields.push("light_cancel", Value::F32(cursor.read_f32()?));
    fields.push("unknown_7", Value::bin(cursor.read_bytes(6)?.to_vec()));
    fields.push("unknown_8", Value::str(cursor.read_varint_string()?));
    fields.push("unknown_9", Value::bin(cursor.read_bytes(4)?.to_vec()));
    fields.push("enable_fk", read_flag(cursor)?);

    let bone_count = cursor.read_i32()?.max(0) as usize;
    let mut bones = Vec::with_capacity(bone_count);
    for _ in 0..bone_count {
        let key = cursor.read_varint_string()?;
        bones.push((Value::str(key), read_bone_info(cursor)?));
    }
    fields.push("bones", Value::map(bones));

    fields.push("unknown_10", read_flag(cursor)?);
    fields.push("anime_normalized_time", Value::F32(cursor.read_f32()?));

    let children = read_child_list(cursor)?;
    Ok(ObjectRecord {
        kind: ObjectKind::Item,
        data: fields.into_value(),
        character: None,
        children: Children::List(children),
    })
}

fn save_item(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_i32(field_i32(data, "unknown_1")?);
    writer.write_i32(field_i32(data, "group")?);
    writer.write_i32(field_i32(data, "category")?);
    writer.write_i32(field_i32(data, "no")?);
    writer.write_bytes(field_bin(data, "unknown_3")?);

    for color in field(data, "colors")?.as_array().into_iter().flatten() {
        let text = color.as_str().ok_or(type_error("colors", "string"))?;
        writer.write_varint_prefixed(text.as_bytes());
    }
    writer.write_i32(field_i32(data, "unknown_4")?);
    write_flag(field(data, "unknown_5")?, writer)?;
    for pattern in field(data, "patterns")?.as_array().into_iter().flatten() {
        write_pattern_info(pattern, writer)?;
    }
    writer.write_bytes(field_bin(data, "unknown_6")?);
    writer.write_f32(field_f32(data, "alpha")?);
    writer.write_varint_prefixed(field_str(data, "line_color")?.as_bytes());
    writer.write_f32(field_f32(data, "line_width")?);
    writer.write_varint_prefixed(field_str(data, "emission_color")?.as_bytes());
    writer.write_f32(field_f32(data, "emission_power")?);
    writer.write_f32(field_f32(data, "light_cancel")?);
    writer.write_bytes(field_bin(data, "unknown_7")?);
    writer.write_varint_prefixed(field_str(data, "unknown_8")?.as_bytes());
    writer.write_bytes(field_bin(data, "unknown_9")?);
    write_flag(field(data, "enable_fk")?, writer)?;

    let bones = field(data, "bones")?
        .as_map()
        .ok_or(type_error("bones", "map"))?;
    writer.write_i32(bones.len() as i32);
    for (key, bone) in bones {
        let name = key.as_str().ok_or(type_error("bones", "string key"))?;
        writer.write_varint_prefixed(name.as_bytes());
        write_bone_info(bone, writer)?;
    }

    write_flag(field(data, "unknown_10")?, writer)?;
    writer.write_f32(field_f32(data, "anime_normalized_time")?);
    write_child_list(children_as_list(record)?, writer)
}

fn load_light(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("no", Value::int(cursor.read_i32()? as i64));
    fields.push("unknown_bytes", Value::bin(cursor.read_bytes(2)?.to_vec()));
    fields.push("color", Value::str(cursor.read_varint_string()?));
    fields.push("intensity", Value::F32(cursor.read_f32()?));
    fields.push("range", Value::F32(cursor.read_f32()?));
    fields.push("outsideSpotAngle", Value::F32(cursor.read_f32()?));
    fields.push("insideSpotAngle", Value::F32(cursor.read_f32()?));
    fields.push("shadow", read_flag(cursor)?);
    fields.push("shadowStrength", Value::F32(cursor.read_f32()?));
    Ok(ObjectRecord {
        kind: ObjectKind::Light,
        data: fields.into_value(),
        character: None,
        children: Children::None,
    })
}

fn save_light(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_i32(field_i32(data, "no")?);
    writer.write_bytes(field_bin(data, "unknown_bytes")?);
    writer.write_varint_prefixed(field_str(data, "color")?.as_bytes());
    writer.write_f32(field_f32(data, "intensity")?);
    writer.write_f32(field_f32(data, "range")?);
    writer.write_f32(field_f32(data, "outsideSpotAngle")?);
    writer.write_f32(field_f32(data, "insideSpotAngle")?);
    write_flag(field(data, "shadow")?, writer)?;
    writer.write_f32(field_f32(data, "shadowStrength")?);
    Ok(())
}

fn load_folder(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("name", Value::str(cursor.read_varint_string()?));
    let children = read_child_list(cursor)?;
    Ok(ObjectRecord {
        kind: ObjectKind::Folder,
        data: fields.into_value(),
        character: None,
        children: Children::List(children),
    })
}

fn save_folder(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    write_object_base(&record.data, writer)?;
    writer.write_varint_prefixed(field_str(&record.data, "name")?.as_bytes());
    write_child_list(children_as_list(record)?, writer)
}

fn read_route_point(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(Value::map(vec![
        (Value::str("dicKey"), Value::int(cursor.read_i32()? as i64)),
        (Value::str("changeAmount"), read_change_amount(cursor)?),
        (Value::str("speed"), Value::F32(cursor.read_f32()?)),
        (Value::str("easeType"), Value::int(cursor.read_i32()? as i64)),
        (Value::str("connection"), Value::int(cursor.read_i32()? as i64)),
        (
            Value::str("aidInfo"),
            Value::map(vec![
                (Value::str("dicKey"), Value::int(cursor.read_i32()? as i64)),
                (Value::str("changeAmount"), read_change_amount(cursor)?),
                (Value::str("isInit"), read_flag(cursor)?),
            ]),
        ),
        (Value::str("link"), read_flag(cursor)?),
    ]))
}

fn write_route_point(point: &Value, writer: &mut Writer) -> Result<()> {
    writer.write_i32(field_i32(point, "dicKey")?);
    write_change_amount(field(point, "changeAmount")?, writer)?;
    writer.write_f32(field_f32(point, "speed")?);
    writer.write_i32(field_i32(point, "easeType")?);
    writer.write_i32(field_i32(point, "connection")?);
    let aid = field(point, "aidInfo")?;
    writer.write_i32(field_i32(aid, "dicKey")?);
    write_change_amount(field(aid, "changeAmount")?, writer)?;
    write_flag(field(aid, "isInit")?, writer)?;
    write_flag(field(point, "link")?, writer)
}

fn load_route(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("name", Value::str(cursor.read_varint_string()?));
    let children = read_child_list(cursor)?;

    let point_count = cursor.read_i32()?.max(0) as usize;
    let mut points = Vec::with_capacity(point_count);
    for _ in 0..point_count {
        points.push(read_route_point(cursor)?);
    }
    fields.push("route_points", Value::array(points));
    fields.push("active", read_flag(cursor)?);
    fields.push("loop", read_flag(cursor)?);
    fields.push("visibleLine", read_flag(cursor)?);
    fields.push("orient", Value::int(cursor.read_i32()? as i64));
    fields.push("color", Value::str(cursor.read_varint_string()?));

    Ok(ObjectRecord {
        kind: ObjectKind::Route,
        data: fields.into_value(),
        character: None,
        children: Children::List(children),
    })
}

fn save_route(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_varint_prefixed(field_str(data, "name")?.as_bytes());
    write_child_list(children_as_list(record)?, writer)?;

    let points = field(data, "route_points")?
        .as_array()
        .ok_or(type_error("route_points", "array"))?;
    writer.write_i32(points.len() as i32);
    for point in points {
        write_route_point(point, writer)?;
    }
    write_flag(field(data, "active")?, writer)?;
    write_flag(field(data, "loop")?, writer)?;
    write_flag(field(data, "visibleLine")?, writer)?;
    writer.write_i32(field_i32(data, "orient")?);
    writer.write_varint_prefixed(field_str(data, "color")?.as_bytes());
    Ok(())
}

fn load_camera(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("name", Value::str(cursor.read_varint_string()?));
    fields.push("active", read_flag(cursor)?);
    Ok(ObjectRecord {
        kind: ObjectKind::Camera,
        data: fields.into_value(),
        character: None,
        children: Children::None,
    })
}

fn save_camera(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    write_object_base(&record.data, writer)?;
    writer.write_varint_prefixed(field_str(&record.data, "name")?.as_bytes());
    write_flag(field(&record.data, "active")?, writer)
}

impl std::fmt::Debug for HoneycomeScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoneycomeScene")
            .field("version", &self.version)
            .field("title", &self.title)
            .field("user_id", &self.user_id)
            .field("data_id", &self.data_id)
            .field("objects", &self.objects.len())
            .finish()
    }
}
