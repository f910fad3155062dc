//! Field codecs for Koikatu studio objects.
//!
//! Each record's scalar fields are read into an ordered map in wire order
//! and written back from the same map, so a loaded record re-serializes to
//! the bytes it came from. Flag bytes are kept as numbers when they are
//! not 0/1, and JSON-string fields (colors, uv vectors) are carried
//! verbatim rather than reparsed.

use std::cmp::Ordering;

use crate::cursor::{Cursor, Writer};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::mpack::Value;

use super::{compare_versions, unknown_object_kind, Children, ObjectKind, ObjectRecord};

pub(crate) fn read_vector3(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(Value::map(vec![
        (Value::str("x"), Value::F32(cursor.read_f32()?)),
        (Value::str("y"), Value::F32(cursor.read_f32()?)),
        (Value::str("z"), Value::F32(cursor.read_f32()?)),
    ]))
}

pub(crate) fn write_vector3(value: &Value, writer: &mut Writer) -> Result<()> {
    for axis in ["x", "y", "z"] {
        writer.write_f32(field_f32(value, axis)?);
    }
    Ok(())
}

pub(crate) fn read_color_rgba(cursor: &mut Cursor<'_>) -> Result<Value> {
    let mut pairs = Vec::with_capacity(4);
    for channel in ["r", "g", "b", "a"] {
        pairs.push((Value::str(channel), Value::F32(cursor.read_f32()?)));
    }
    Ok(Value::map(pairs))
}

pub(crate) fn write_color_rgba(value: &Value, writer: &mut Writer) -> Result<()> {
    for channel in ["r", "g", "b", "a"] {
        writer.write_f32(field_f32(value, channel)?);
    }
    Ok(())
}

/// A flag byte: decoded to `Bool` for 0/1, kept numeric otherwise so odd
/// bytes survive a resave.
pub(crate) fn read_flag(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(match cursor.read_i8()? {
        0 => Value::Bool(false),
        1 => Value::Bool(true),
        other => Value::int(other as i64),
    })
}

pub(crate) fn write_flag(value: &Value, writer: &mut Writer) -> Result<()> {
    match value {
        Value::Bool(b) => writer.write_i8(*b as i8),
        Value::Int(v, _) => writer.write_i8(*v as i8),
        Value::UInt(v, _) => writer.write_i8(*v as i8),
        other => {
            return Err(Error::SchemaMismatch {
                context: "scene flag",
                expected: "bool or integer",
                found: format!("{other:?}").chars().take(40).collect(),
            })
        }
    }
    Ok(())
}

pub(crate) fn field<'v>(data: &'v Value, key: &'static str) -> Result<&'v Value> {
    data.get(key).ok_or(Error::SchemaMismatch {
        context: "scene record",
        expected: key,
        found: "missing field".to_owned(),
    })
}

pub(crate) fn field_i32(data: &Value, key: &'static str) -> Result<i32> {
    field(data, key)?
        .as_i64()
        .map(|v| v as i32)
        .ok_or(type_error(key, "integer"))
}

pub(crate) fn field_f32(data: &Value, key: &'static str) -> Result<f32> {
    field(data, key)?
        .as_f64()
        .map(|v| v as f32)
        .ok_or(type_error(key, "float"))
}

pub(crate) fn field_str<'v>(data: &'v Value, key: &'static str) -> Result<&'v str> {
    field(data, key)?.as_str().ok_or(type_error(key, "string"))
}

pub(crate) fn field_bin<'v>(data: &'v Value, key: &'static str) -> Result<&'v [u8]> {
    field(data, key)?
        .as_bytes()
        .ok_or(type_error(key, "bytes"))
}

pub(crate) fn type_error(key: &'static str, expected: &'static str) -> Error {
    Error::SchemaMismatch {
        context: "scene record",
        expected,
        found: format!("field {key} has the wrong type"),
    }
}

/// Builder over the ordered field map.
pub(crate) struct Fields {
    pairs: Vec<(Value, Value)>,
}

impl Fields {
    pub(crate) fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    pub(crate) fn push(&mut self, key: &'static str, value: Value) {
        self.pairs.push((Value::str(key), value));
    }

    pub(crate) fn into_value(self) -> Value {
        Value::map(self.pairs)
    }
}

/// dicKey + transform + treeState + visible, common to every object.
pub(crate) fn read_object_base(cursor: &mut Cursor<'_>, fields: &mut Fields) -> Result<()> {
    fields.push("dicKey", Value::int(cursor.read_i32()? as i64));
    fields.push("position", read_vector3(cursor)?);
    fields.push("rotation", read_vector3(cursor)?);
    fields.push("scale", read_vector3(cursor)?);
    fields.push("treeState", Value::int(cursor.read_i32()? as i64));
    fields.push("visible", read_flag(cursor)?);
    Ok(())
}

pub(crate) fn write_object_base(data: &Value, writer: &mut Writer) -> Result<()> {
    writer.write_i32(field_i32(data, "dicKey")?);
    write_vector3(field(data, "position")?, writer)?;
    write_vector3(field(data, "rotation")?, writer)?;
    write_vector3(field(data, "scale")?, writer)?;
    writer.write_i32(field_i32(data, "treeState")?);
    write_flag(field(data, "visible")?, writer)
}

/// dicKey + changeAmount, shared by bones, IK targets, and route points.
pub(crate) fn read_change_amount(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(Value::map(vec![
        (Value::str("position"), read_vector3(cursor)?),
        (Value::str("rotation"), read_vector3(cursor)?),
        (Value::str("scale"), read_vector3(cursor)?),
    ]))
}

pub(crate) fn write_change_amount(value: &Value, writer: &mut Writer) -> Result<()> {
    write_vector3(field(value, "position")?, writer)?;
    write_vector3(field(value, "rotation")?, writer)?;
    write_vector3(field(value, "scale")?, writer)
}

pub(crate) fn read_bone_info(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(Value::map(vec![
        (Value::str("dicKey"), Value::int(cursor.read_i32()? as i64)),
        (Value::str("changeAmount"), read_change_amount(cursor)?),
    ]))
}

pub(crate) fn write_bone_info(value: &Value, writer: &mut Writer) -> Result<()> {
    writer.write_i32(field_i32(value, "dicKey")?);
    write_change_amount(field(value, "changeAmount")?, writer)
}

fn read_pattern_info(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(Value::map(vec![
        (Value::str("key"), Value::int(cursor.read_i32()? as i64)),
        (
            Value::str("file_path"),
            Value::str(cursor.read_varint_string()?),
        ),
        (Value::str("clamp"), read_flag(cursor)?),
        (Value::str("uv"), Value::str(cursor.read_varint_string()?)),
        (Value::str("rot"), Value::F32(cursor.read_f32()?)),
    ]))
}

fn write_pattern_info(value: &Value, writer: &mut Writer) -> Result<()> {
    writer.write_i32(field_i32(value, "key")?);
    writer.write_varint_prefixed(field_str(value, "file_path")?.as_bytes());
    write_flag(field(value, "clamp")?, writer)?;
    writer.write_varint_prefixed(field_str(value, "uv")?.as_bytes());
    writer.write_f32(field_f32(value, "rot")?);
    Ok(())
}

pub(crate) fn read_flag_array(cursor: &mut Cursor<'_>, count: usize) -> Result<Value> {
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_flag(cursor)?);
    }
    Ok(Value::array(items))
}

pub(crate) fn write_flag_array(value: &Value, writer: &mut Writer) -> Result<()> {
    for item in value.as_array().ok_or(type_error("flags", "array"))? {
        write_flag(item, writer)?;
    }
    Ok(())
}

/// Dictionary<int, int> as an ordered map with integer keys.
pub(crate) fn read_int_map(cursor: &mut Cursor<'_>) -> Result<Value> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let key = cursor.read_i32()? as i64;
        let value = cursor.read_i32()? as i64;
        pairs.push((Value::int(key), Value::int(value)));
    }
    Ok(Value::map(pairs))
}

pub(crate) fn write_int_map(value: &Value, writer: &mut Writer) -> Result<()> {
    let pairs = value.as_map().ok_or(type_error("int map", "map"))?;
    writer.write_i32(pairs.len() as i32);
    for (key, val) in pairs {
        writer.write_i32(key.as_i64().ok_or(type_error("int map", "int key"))? as i32);
        writer.write_i32(val.as_i64().ok_or(type_error("int map", "int value"))? as i32);
    }
    Ok(())
}

/// Dictionary<int, OIBoneInfo>.
fn read_bone_map(cursor: &mut Cursor<'_>) -> Result<Value> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let key = cursor.read_i32()? as i64;
        pairs.push((Value::int(key), read_bone_info(cursor)?));
    }
    Ok(Value::map(pairs))
}

fn write_bone_map(value: &Value, writer: &mut Writer) -> Result<()> {
    let pairs = value.as_map().ok_or(type_error("bone map", "map"))?;
    writer.write_i32(pairs.len() as i32);
    for (key, bone) in pairs {
        writer.write_i32(key.as_i64().ok_or(type_error("bone map", "int key"))? as i32);
        write_bone_info(bone, writer)?;
    }
    Ok(())
}

fn read_child_list(cursor: &mut Cursor<'_>, version: &str) -> Result<Vec<ObjectRecord>> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut children = Vec::with_capacity(count);
    for _ in 0..count {
        let code = cursor.read_i32()?;
        children.push(load_object(cursor, code, version)?);
    }
    Ok(children)
}

fn write_child_list(children: &[ObjectRecord], version: &str, writer: &mut Writer) -> Result<()> {
    writer.write_i32(children.len() as i32);
    for child in children {
        writer.write_i32(child.kind.code());
        save_object(child, version, writer)?;
    }
    Ok(())
}

pub(crate) fn children_as_list(record: &ObjectRecord) -> Result<&[ObjectRecord]> {
    match &record.children {
        Children::List(list) => Ok(list),
        Children::None => Ok(&[]),
        Children::Keyed(_) => Err(Error::SchemaMismatch {
            context: "scene record",
            expected: "list children",
            found: "keyed children".to_owned(),
        }),
    }
}

/// Read one object body. The type code has already been consumed.
pub fn load_object(cursor: &mut Cursor<'_>, code: i32, version: &str) -> Result<ObjectRecord> {
    let kind = ObjectKind::from_code(code).ok_or_else(|| unknown_object_kind(code))?;
    match kind {
        ObjectKind::Character => load_char(cursor, version),
        ObjectKind::Item => load_item(cursor, version),
        ObjectKind::Light => load_light(cursor),
        ObjectKind::Folder => load_folder(cursor, version),
        ObjectKind::Route => load_route(cursor, version),
        ObjectKind::Camera => load_camera(cursor),
        ObjectKind::Text => load_text(cursor),
    }
}

/// Write one object body. The caller writes the type code.
pub fn save_object(record: &ObjectRecord, version: &str, writer: &mut Writer) -> Result<()> {
    match record.kind {
        ObjectKind::Character => save_char(record, version, writer),
        ObjectKind::Item => save_item(record, version, writer),
        ObjectKind::Light => save_light(record, writer),
        ObjectKind::Folder => save_folder(record, version, writer),
        ObjectKind::Route => save_route(record, version, writer),
        ObjectKind::Camera => save_camera(record, writer),
        ObjectKind::Text => save_text(record, writer),
    }
}

fn load_char(cursor: &mut Cursor<'_>, version: &str) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("sex", Value::int(cursor.read_i32()? as i64));

    // The character card is embedded inline without its PNG.
    let character = Document::read_embedded(cursor, false)?;

    fields.push("bones", read_bone_map(cursor)?);
    fields.push("ik_targets", read_bone_map(cursor)?);

    let slot_count = cursor.read_i32()?.max(0) as usize;
    let mut groups = Vec::with_capacity(slot_count);
    for _ in 0..slot_count {
        let slot = cursor.read_i32()?;
        groups.push((slot, read_child_list(cursor, version)?));
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

    fields.push(
        "lookAtTarget",
        Value::map(vec![
            (Value::str("dicKey"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("changeAmount"), read_change_amount(cursor)?),
        ]),
    );

    fields.push("enable_ik", read_flag(cursor)?);
    fields.push("active_ik", read_flag_array(cursor, 5)?);
    fields.push("enable_fk", read_flag(cursor)?);
    fields.push("active_fk", read_flag_array(cursor, 7)?);

    let expression_count = if compare_versions(version, "0.0.9") != Ordering::Less {
        8
    } else {
        4
    };
    fields.push("expression", read_flag_array(cursor, expression_count)?);

    fields.push("anime_speed", Value::F32(cursor.read_f32()?));
    fields.push("anime_pattern", Value::F32(cursor.read_f32()?));
    fields.push("anime_option_visible", read_flag(cursor)?);
    fields.push("is_anime_force_loop", read_flag(cursor)?);

    let voice_count = cursor.read_i32()?.max(0) as usize;
    let mut voices = Vec::with_capacity(voice_count);
    for _ in 0..voice_count {
        voices.push(Value::map(vec![
            (Value::str("group"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("category"), Value::int(cursor.read_i32()? as i64)),
            (Value::str("no"), Value::int(cursor.read_i32()? as i64)),
        ]));
    }
    fields.push(
        "voiceCtrl",
        Value::map(vec![
            (Value::str("list"), Value::array(voices)),
            (Value::str("repeat"), Value::int(cursor.read_i32()? as i64)),
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

fn save_char(record: &ObjectRecord, version: &str, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_i32(field_i32(data, "sex")?);

    let character = record.character.as_ref().ok_or(Error::SchemaMismatch {
        context: "scene character",
        expected: "embedded card",
        found: "none".to_owned(),
    })?;
    character.write_card(writer)?;

    write_bone_map(field(data, "bones")?, writer)?;
    write_bone_map(field(data, "ik_targets")?, writer)?;

    let Children::Keyed(groups) = &record.children else {
        return Err(Error::SchemaMismatch {
            context: "scene character",
            expected: "keyed children",
            found: "other children shape".to_owned(),
        });
    };
    writer.write_i32(groups.len() as i32);
    for (slot, list) in groups {
        writer.write_i32(*slot);
        write_child_list(list, version, writer)?;
    }

    writer.write_i32(field_i32(data, "kinematic_mode")?);
    let anime = field(data, "anime_info")?;
    writer.write_i32(field_i32(anime, "group")?);
    writer.write_i32(field_i32(anime, "category")?);
    writer.write_i32(field_i32(anime, "no")?);
    for slot in field(data, "hand_patterns")?
        .as_array()
        .ok_or(type_error("hand_patterns", "array"))?
    {
        writer.write_i32(slot.as_i64().unwrap_or(0) as i32);
    }
    writer.write_f32(field_f32(data, "nipple")?);
    writer.write_bytes(field_bin(data, "siru")?);
    writer.write_f32(field_f32(data, "mouth_open")?);
    write_flag(field(data, "lip_sync")?, writer)?;

    let look = field(data, "lookAtTarget")?;
    writer.write_i32(field_i32(look, "dicKey")?);
    write_change_amount(field(look, "changeAmount")?, writer)?;

    write_flag(field(data, "enable_ik")?, writer)?;
    write_flag_array(field(data, "active_ik")?, writer)?;
    write_flag(field(data, "enable_fk")?, writer)?;
    write_flag_array(field(data, "active_fk")?, writer)?;
    write_flag_array(field(data, "expression")?, writer)?;

    writer.write_f32(field_f32(data, "anime_speed")?);
    writer.write_f32(field_f32(data, "anime_pattern")?);
    write_flag(field(data, "anime_option_visible")?, writer)?;
    write_flag(field(data, "is_anime_force_loop")?, writer)?;

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
    writer.write_i32(field_i32(voice, "repeat")?);

    write_flag(field(data, "visible_son")?, writer)?;
    writer.write_f32(field_f32(data, "son_length")?);
    write_flag(field(data, "visible_simple")?, writer)?;
    writer.write_i8_prefixed(field_str(data, "simple_color")?.as_bytes());
    for param in field(data, "anime_option_param")?
        .as_array()
        .ok_or(type_error("anime_option_param", "array"))?
    {
        writer.write_f32(param.as_f64().unwrap_or(0.0) as f32);
    }
    writer.write_i32_prefixed(field_bin(data, "neck_byte_data")?);
    writer.write_i32_prefixed(field_bin(data, "eyes_byte_data")?);
    writer.write_f32(field_f32(data, "anime_normalized_time")?);
    write_int_map(field(data, "dic_access_group")?, writer)?;
    write_int_map(field(data, "dic_access_no")?, writer)
}

fn load_item(cursor: &mut Cursor<'_>, version: &str) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("group", Value::int(cursor.read_i32()? as i64));
    fields.push("category", Value::int(cursor.read_i32()? as i64));
    fields.push("no", Value::int(cursor.read_i32()? as i64));

    if compare_versions(version, "1.1.1.0") != Ordering::Less {
        fields.push("anime_pattern", Value::int(cursor.read_i32()? as i64));
    }
    fields.push("anime_speed", Value::F32(cursor.read_f32()?));

    // Color slots are length-prefixed JSON strings, kept verbatim; 0.0.3
    // extended the count from 7 to 8.
    let color_count = if compare_versions(version, "0.0.3") != Ordering::Less {
        8
    } else {
        7
    };
    let mut colors = Vec::with_capacity(color_count);
    for _ in 0..color_count {
        colors.push(Value::str(cursor.read_varint_string()?));
    }
    fields.push("colors", Value::array(colors));

    let mut patterns = Vec::with_capacity(3);
    for _ in 0..3 {
        patterns.push(read_pattern_info(cursor)?);
    }
    fields.push("patterns", Value::array(patterns));

    fields.push("alpha", Value::F32(cursor.read_f32()?));

    if compare_versions(version, "0.0.4") != Ordering::Less {
        fields.push("line_color", Value::str(cursor.read_varint_string()?));
        fields.push("line_width", Value::F32(cursor.read_f32()?));
    }
    if compare_versions(version, "0.0.7") != Ordering::Less {
        fields.push("emission_color", Value::str(cursor.read_varint_string()?));
        fields.push("emission_power", Value::F32(cursor.read_f32()?));
        fields.push("light_cancel", Value::F32(cursor.read_f32()?));
    }
    if compare_versions(version, "0.0.6") != Ordering::Less {
        fields.push("panel", read_pattern_info(cursor)?);
    }

    fields.push("enable_fk", read_flag(cursor)?);

    // Item bones are keyed by string (BinaryReader strings).
    let bone_count = cursor.read_i32()?.max(0) as usize;
    let mut bones = Vec::with_capacity(bone_count);
    for _ in 0..bone_count {
        let key = cursor.read_varint_string()?;
        bones.push((Value::str(key), read_bone_info(cursor)?));
    }
    fields.push("bones", Value::map(bones));

    if compare_versions(version, "1.0.1") != Ordering::Less {
        fields.push("enable_dynamic_bone", read_flag(cursor)?);
    }
    fields.push("anime_normalized_time", Value::F32(cursor.read_f32()?));

    let children = read_child_list(cursor, version)?;
    Ok(ObjectRecord {
        kind: ObjectKind::Item,
        data: fields.into_value(),
        character: None,
        children: Children::List(children),
    })
}

fn save_item(record: &ObjectRecord, version: &str, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_i32(field_i32(data, "group")?);
    writer.write_i32(field_i32(data, "category")?);
    writer.write_i32(field_i32(data, "no")?);

    if compare_versions(version, "1.1.1.0") != Ordering::Less {
        writer.write_i32(field_i32(data, "anime_pattern")?);
    }
    writer.write_f32(field_f32(data, "anime_speed")?);

    for color in field(data, "colors")?
        .as_array()
        .ok_or(type_error("colors", "array"))?
    {
        let text = color.as_str().ok_or(type_error("colors", "string"))?;
        writer.write_varint_prefixed(text.as_bytes());
    }
    for pattern in field(data, "patterns")?
        .as_array()
        .ok_or(type_error("patterns", "array"))?
    {
        write_pattern_info(pattern, writer)?;
    }

    writer.write_f32(field_f32(data, "alpha")?);

    if compare_versions(version, "0.0.4") != Ordering::Less {
        writer.write_varint_prefixed(field_str(data, "line_color")?.as_bytes());
        writer.write_f32(field_f32(data, "line_width")?);
    }
    if compare_versions(version, "0.0.7") != Ordering::Less {
        writer.write_varint_prefixed(field_str(data, "emission_color")?.as_bytes());
        writer.write_f32(field_f32(data, "emission_power")?);
        writer.write_f32(field_f32(data, "light_cancel")?);
    }
    if compare_versions(version, "0.0.6") != Ordering::Less {
        write_pattern_info(field(data, "panel")?, writer)?;
    }

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

    if compare_versions(version, "1.0.1") != Ordering::Less {
        write_flag(field(data, "enable_dynamic_bone")?, writer)?;
    }
    writer.write_f32(field_f32(data, "anime_normalized_time")?);
    write_child_list(children_as_list(record)?, version, writer)
}

fn load_light(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("no", Value::int(cursor.read_i32()? as i64));
    fields.push("color", read_color_rgba(cursor)?);
    fields.push("intensity", Value::F32(cursor.read_f32()?));
    fields.push("range", Value::F32(cursor.read_f32()?));
    fields.push("spotAngle", Value::F32(cursor.read_f32()?));
    fields.push("shadow", read_flag(cursor)?);
    fields.push("enable", read_flag(cursor)?);
    fields.push("drawTarget", read_flag(cursor)?);
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
    write_color_rgba(field(data, "color")?, writer)?;
    writer.write_f32(field_f32(data, "intensity")?);
    writer.write_f32(field_f32(data, "range")?);
    writer.write_f32(field_f32(data, "spotAngle")?);
    write_flag(field(data, "shadow")?, writer)?;
    write_flag(field(data, "enable")?, writer)?;
    write_flag(field(data, "drawTarget")?, writer)
}

fn load_folder(cursor: &mut Cursor<'_>, version: &str) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("name", Value::str(cursor.read_varint_string()?));
    let children = read_child_list(cursor, version)?;
    Ok(ObjectRecord {
        kind: ObjectKind::Folder,
        data: fields.into_value(),
        character: None,
        children: Children::List(children),
    })
}

fn save_folder(record: &ObjectRecord, version: &str, writer: &mut Writer) -> Result<()> {
    write_object_base(&record.data, writer)?;
    writer.write_varint_prefixed(field_str(&record.data, "name")?.as_bytes());
    write_child_list(children_as_list(record)?, version, writer)
}

fn read_route_point(cursor: &mut Cursor<'_>, version: &str) -> Result<Value> {
    let mut pairs = vec![
        (Value::str("dicKey"), Value::int(cursor.read_i32()? as i64)),
        (Value::str("changeAmount"), read_change_amount(cursor)?),
        (Value::str("speed"), Value::F32(cursor.read_f32()?)),
        (Value::str("easeType"), Value::int(cursor.read_i32()? as i64)),
    ];
    // 1.0.3 wrote one extra byte that later versions dropped; keep it so
    // those files survive a resave.
    if compare_versions(version, "1.0.3") == Ordering::Equal {
        pairs.push((
            Value::str("legacy_flag"),
            Value::int(cursor.read_i8()? as i64),
        ));
    }
    if compare_versions(version, "1.0.4.1") != Ordering::Less {
        pairs.push((
            Value::str("connection"),
            Value::int(cursor.read_i32()? as i64),
        ));
        pairs.push((
            Value::str("aidInfo"),
            Value::map(vec![
                (Value::str("dicKey"), Value::int(cursor.read_i32()? as i64)),
                (Value::str("changeAmount"), read_change_amount(cursor)?),
                (Value::str("isInit"), read_flag(cursor)?),
            ]),
        ));
    }
    if compare_versions(version, "1.0.4.2") != Ordering::Less {
        pairs.push((Value::str("link"), read_flag(cursor)?));
    }
    Ok(Value::map(pairs))
}

fn write_route_point(point: &Value, version: &str, writer: &mut Writer) -> Result<()> {
    writer.write_i32(field_i32(point, "dicKey")?);
    write_change_amount(field(point, "changeAmount")?, writer)?;
    writer.write_f32(field_f32(point, "speed")?);
    writer.write_i32(field_i32(point, "easeType")?);
    if compare_versions(version, "1.0.3") == Ordering::Equal {
        writer.write_i8(field_i32(point, "legacy_flag").unwrap_or(0) as i8);
    }
    if compare_versions(version, "1.0.4.1") != Ordering::Less {
        writer.write_i32(field_i32(point, "connection")?);
        let aid = field(point, "aidInfo")?;
        writer.write_i32(field_i32(aid, "dicKey")?);
        write_change_amount(field(aid, "changeAmount")?, writer)?;
        write_flag(field(aid, "isInit")?, writer)?;
    }
    if compare_versions(version, "1.0.4.2") != Ordering::Less {
        write_flag(field(point, "link")?, writer)?;
    }
    Ok(())
}

fn load_route(cursor: &mut Cursor<'_>, version: &str) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("name", Value::str(cursor.read_varint_string()?));
    let children = read_child_list(cursor, version)?;

    let point_count = cursor.read_i32()?.max(0) as usize;
    let mut points = Vec::with_capacity(point_count);
    for _ in 0..point_count {
        points.push(read_route_point(cursor, version)?);
    }
    fields.push("route_points", Value::array(points));

    if compare_versions(version, "1.0.3") != Ordering::Less {
        fields.push("active", read_flag(cursor)?);
        fields.push("loop", read_flag(cursor)?);
        fields.push("visibleLine", read_flag(cursor)?);
    }
    if compare_versions(version, "1.0.4") != Ordering::Less {
        fields.push("orient", Value::int(cursor.read_i32()? as i64));
    }
    if compare_versions(version, "1.0.4.1") != Ordering::Less {
        fields.push("color", Value::str(cursor.read_varint_string()?));
    }

    Ok(ObjectRecord {
        kind: ObjectKind::Route,
        data: fields.into_value(),
        character: None,
        children: Children::List(children),
    })
}

fn save_route(record: &ObjectRecord, version: &str, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_varint_prefixed(field_str(data, "name")?.as_bytes());
    write_child_list(children_as_list(record)?, version, writer)?;

    let points = field(data, "route_points")?
        .as_array()
        .ok_or(type_error("route_points", "array"))?;
    writer.write_i32(points.len() as i32);
    for point in points {
        write_route_point(point, version, writer)?;
    }

    if compare_versions(version, "1.0.3") != Ordering::Less {
        write_flag(field(data, "active")?, writer)?;
        write_flag(field(data, "loop")?, writer)?;
        write_flag(field(data, "visibleLine")?, writer)?;
    }
    if compare_versions(version, "1.0.4") != Ordering::Less {
        writer.write_i32(field_i32(data, "orient")?);
    }
    if compare_versions(version, "1.0.4.1") != Ordering::Less {
        writer.write_varint_prefixed(field_str(data, "color")?.as_bytes());
    }
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

fn load_text(cursor: &mut Cursor<'_>) -> Result<ObjectRecord> {
    let mut fields = Fields::new();
    read_object_base(cursor, &mut fields)?;
    fields.push("id", Value::int(cursor.read_i32()? as i64));
    fields.push("color", Value::str(cursor.read_varint_string()?));
    fields.push("outlineColor", Value::str(cursor.read_varint_string()?));
    fields.push("outlineSize", Value::F32(cursor.read_f32()?));
    // Encoded text entries, carried opaque.
    fields.push(
        "textInfos",
        Value::bin(cursor.read_i32_prefixed()?.to_vec()),
    );
    Ok(ObjectRecord {
        kind: ObjectKind::Text,
        data: fields.into_value(),
        character: None,
        children: Children::None,
    })
}

fn save_text(record: &ObjectRecord, writer: &mut Writer) -> Result<()> {
    let data = &record.data;
    write_object_base(data, writer)?;
    writer.write_i32(field_i32(data, "id")?);
    writer.write_varint_prefixed(field_str(data, "color")?.as_bytes());
    writer.write_varint_prefixed(field_str(data, "outlineColor")?.as_bytes());
    writer.write_f32(field_f32(data, "outlineSize")?);
    writer.write_i32_prefixed(field_bin(data, "textInfos")?);
    Ok(())
}
