//! Koikatu studio scene files: a PNG followed by a version string, the
//! object dictionary, and scene-wide rendering/sound settings whose field
//! set grew over the format's life. Saving replays the same version gates
//! the loader used, so old scenes keep their original shape.

use std::cmp::Ordering;
use std::path::Path;

use crate::cursor::{Cursor, Writer};
use crate::error::{Error, Result};
use crate::mpack::{self, Value};
use crate::png;
use crate::variant::Variant;

use super::object::{field, field_f32, field_i32, field_str, read_flag, write_flag};
use super::{compare_versions, load_object, save_object, ObjectKind, ObjectRecord, Walk};

/// Trailing mod section some tools append after the 【KStudio】 marker.
#[derive(Debug, Clone)]
pub struct ModSection {
    pub header: String,
    pub unknown: i32,
    pub data: Value,
    pub tail: Vec<u8>,
}

pub struct KoikatuScene {
    pub image: Vec<u8>,
    pub version: String,
    /// Top-level objects keyed by their dictionary id, in file order.
    pub objects: Vec<(i32, ObjectRecord)>,
    /// Scene-wide settings in wire order.
    pub settings: Value,
    /// The 【KStudio】 end marker.
    pub tail_marker: String,
    pub mod_section: Option<ModSection>,
}

impl KoikatuScene {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let split = png::split(data)?;
        let mut cursor = Cursor::new(data);
        cursor.seek(data.len() - split.tail.len());

        let version = cursor.read_varint_string()?;
        let object_count = cursor.read_i32()?.max(0) as usize;
        let mut objects = Vec::with_capacity(object_count);
        for _ in 0..object_count {
            let key = cursor.read_i32()?;
            let code = cursor.read_i32()?;
            objects.push((key, load_object(&mut cursor, code, &version)?));
        }

        let settings = read_settings(&mut cursor, &version)?;
        let tail_marker = cursor.read_varint_string()?;
        if tail_marker != "\u{3010}KStudio\u{3011}" {
            return Err(Error::SchemaMismatch {
                context: "scene tail",
                expected: "\u{3010}KStudio\u{3011} marker",
                found: tail_marker,
            });
        }

        let mod_section = if cursor.remaining() > 0 {
            let header = cursor.read_i8_string()?;
            let unknown = cursor.read_i32()?;
            let data = mpack::decode(cursor.read_i32_prefixed()?)?;
            let tail = cursor.read_bytes(cursor.remaining())?.to_vec();
            Some(ModSection {
                header,
                unknown,
                data,
                tail,
            })
        } else {
            None
        };

        Ok(Self {
            image: split.image.to_vec(),
            version,
            objects,
            settings,
            tail_marker,
            mod_section,
        })
    }

    pub fn variant(&self) -> Variant {
        Variant::KoikatuScene
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::with_capacity(self.image.len() + 4096);
        writer.write_bytes(&self.image);
        writer.write_varint_prefixed(self.version.as_bytes());

        writer.write_i32(self.objects.len() as i32);
        for (key, record) in &self.objects {
            writer.write_i32(*key);
            writer.write_i32(record.kind.code());
            save_object(record, &self.version, &mut writer)?;
        }

        write_settings(&self.settings, &self.version, &mut writer)?;
        writer.write_varint_prefixed(self.tail_marker.as_bytes());

        if let Some(mods) = &self.mod_section {
            writer.write_i8_prefixed(mods.header.as_bytes());
            writer.write_i32(mods.unknown);
            writer.write_i32_prefixed(&mpack::encode(&mods.data));
            writer.write_bytes(&mods.tail);
        }
        Ok(writer.into_bytes())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save_bytes()?)?;
        Ok(())
    }

    /// Depth-first traversal of the object tree.
    pub fn walk(&self, filter: Option<ObjectKind>) -> Walk<'_> {
        Walk::new(&self.objects, filter)
    }
}

fn read_vector3(cursor: &mut Cursor<'_>) -> Result<Value> {
    super::object::read_vector3(cursor)
}

fn read_camera_data(cursor: &mut Cursor<'_>) -> Result<Value> {
    let version = cursor.read_i32()?;
    let mut pairs = vec![
        (Value::str("version"), Value::int(version as i64)),
        (Value::str("position"), read_vector3(cursor)?),
        (Value::str("rotation"), read_vector3(cursor)?),
    ];
    if version == 1 {
        // Early cameras stored a single scalar distance.
        pairs.push((
            Value::str("deprecated_distance"),
            Value::F32(cursor.read_f32()?),
        ));
    } else {
        pairs.push((Value::str("distance"), read_vector3(cursor)?));
    }
    pairs.push((Value::str("fieldOfView"), Value::F32(cursor.read_f32()?)));
    Ok(Value::map(pairs))
}

fn write_camera_data(camera: &Value, writer: &mut Writer) -> Result<()> {
    let version = field_i32(camera, "version")?;
    writer.write_i32(version);
    super::object::write_vector3(field(camera, "position")?, writer)?;
    super::object::write_vector3(field(camera, "rotation")?, writer)?;
    if version == 1 {
        writer.write_f32(field_f32(camera, "deprecated_distance")?);
    } else {
        super::object::write_vector3(field(camera, "distance")?, writer)?;
    }
    writer.write_f32(field_f32(camera, "fieldOfView")?);
    Ok(())
}

pub(crate) fn read_light_info_base(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(Value::map(vec![
        (Value::str("color"), Value::str(cursor.read_varint_string()?)),
        (Value::str("intensity"), Value::F32(cursor.read_f32()?)),
        (
            Value::str("rot"),
            Value::array(vec![
                Value::F32(cursor.read_f32()?),
                Value::F32(cursor.read_f32()?),
            ]),
        ),
        (Value::str("shadow"), read_flag(cursor)?),
    ]))
}

pub(crate) fn write_light_info_base(light: &Value, writer: &mut Writer) -> Result<()> {
    writer.write_varint_prefixed(field_str(light, "color")?.as_bytes());
    writer.write_f32(field_f32(light, "intensity")?);
    for rot in field(light, "rot")?.as_array().into_iter().flatten() {
        writer.write_f32(rot.as_f64().unwrap_or(0.0) as f32);
    }
    write_flag(field(light, "shadow")?, writer)
}

fn read_sound_ctrl(cursor: &mut Cursor<'_>) -> Result<Value> {
    Ok(Value::map(vec![
        (Value::str("repeat"), Value::int(cursor.read_i32()? as i64)),
        (Value::str("no"), Value::int(cursor.read_i32()? as i64)),
        (Value::str("play"), read_flag(cursor)?),
    ]))
}

fn write_sound_ctrl(ctrl: &Value, writer: &mut Writer) -> Result<()> {
    writer.write_i32(field_i32(ctrl, "repeat")?);
    writer.write_i32(field_i32(ctrl, "no")?);
    write_flag(field(ctrl, "play")?, writer)
}

fn read_settings(cursor: &mut Cursor<'_>, version: &str) -> Result<Value> {
    let at_least = |target| compare_versions(version, target) != Ordering::Less;
    let at_most = |target| compare_versions(version, target) != Ordering::Greater;
    let mut pairs: Vec<(Value, Value)> = Vec::new();
    let mut push = |key: &'static str, value: Value| pairs.push((Value::str(key), value));

    push("map", Value::int(cursor.read_i32()? as i64));
    push(
        "caMap",
        Value::map(vec![
            (Value::str("pos"), read_vector3(cursor)?),
            (Value::str("rot"), read_vector3(cursor)?),
            (Value::str("scale"), read_vector3(cursor)?),
        ]),
    );
    push("sunLightType", Value::int(cursor.read_i32()? as i64));
    push("mapOption", read_flag(cursor)?);
    push("aceNo", Value::int(cursor.read_i32()? as i64));
    if at_least("0.0.2") {
        push("aceBlend", Value::F32(cursor.read_f32()?));
    }
    if at_most("0.0.1") {
        push("deprecated_bool", read_flag(cursor)?);
        push("deprecated_float", Value::F32(cursor.read_f32()?));
        push("deprecated_string", Value::str(cursor.read_i8_string()?));
    }
    if at_least("0.0.2") {
        push("enableAOE", read_flag(cursor)?);
        push("aoeColor", Value::str(cursor.read_i8_string()?));
        push("aoeRadius", Value::F32(cursor.read_f32()?));
    }
    push("enableBloom", read_flag(cursor)?);
    push("bloomIntensity", Value::F32(cursor.read_f32()?));
    push("bloomBlur", Value::F32(cursor.read_f32()?));
    if at_least("0.0.2") {
        push("bloomThreshold", Value::F32(cursor.read_f32()?));
    }
    if at_most("0.0.1") {
        push("deprecated_bool2", read_flag(cursor)?);
    }
    push("enableDepth", read_flag(cursor)?);
    push("depthFocalSize", Value::F32(cursor.read_f32()?));
    push("depthAperture", Value::F32(cursor.read_f32()?));
    push("enableVignette", read_flag(cursor)?);
    if at_most("0.0.1") {
        push("deprecated_float2", Value::F32(cursor.read_f32()?));
    }
    push("enableFog", read_flag(cursor)?);
    if at_least("0.0.2") {
        push("fogColor", Value::str(cursor.read_i8_string()?));
        push("fogHeight", Value::F32(cursor.read_f32()?));
        push("fogStartDistance", Value::F32(cursor.read_f32()?));
    }
    push("enableSunShafts", read_flag(cursor)?);
    if at_least("0.0.2") {
        push("sunThresholdColor", Value::str(cursor.read_i8_string()?));
        push("sunColor", Value::str(cursor.read_i8_string()?));
    }
    if at_least("0.0.4") {
        push("sunCaster", Value::int(cursor.read_i32()? as i64));
    }
    if at_least("0.0.2") {
        push("enableShadow", read_flag(cursor)?);
    }
    if at_least("0.0.4") {
        push("faceNormal", read_flag(cursor)?);
        push("faceShadow", read_flag(cursor)?);
        push("lineColorG", Value::F32(cursor.read_f32()?));
        push("ambientShadow", Value::str(cursor.read_i8_string()?));
    }
    if at_least("0.0.5") {
        push("lineWidthG", Value::F32(cursor.read_f32()?));
        push("rampG", Value::int(cursor.read_i32()? as i64));
        push("ambientShadowG", Value::F32(cursor.read_f32()?));
    }
    if at_least("1.1.0.0") {
        push("shaderType", Value::int(cursor.read_i32()? as i64));
    }
    if at_least("1.1.2.0") {
        push("skyInfo", mpack::decode(cursor.read_i32_prefixed()?)?);
    }

    push("cameraSaveData", read_camera_data(cursor)?);
    let mut cameras = Vec::with_capacity(10);
    for _ in 0..10 {
        cameras.push(read_camera_data(cursor)?);
    }
    push("cameraData", Value::array(cameras));

    push("charaLight", read_light_info_base(cursor)?);
    let mut map_light = read_light_info_base(cursor)?;
    map_light.set("type", Value::int(cursor.read_i32()? as i64));
    push("mapLight", map_light);

    push("bgmCtrl", read_sound_ctrl(cursor)?);
    push("envCtrl", read_sound_ctrl(cursor)?);
    push(
        "outsideSoundCtrl",
        Value::map(vec![
            (Value::str("repeat"), Value::int(cursor.read_i32()? as i64)),
            (
                Value::str("fileName"),
                Value::str(cursor.read_varint_string()?),
            ),
            (Value::str("play"), read_flag(cursor)?),
        ]),
    );

    push("background", Value::str(cursor.read_i8_string()?));
    push("frame", Value::str(cursor.read_i8_string()?));

    Ok(Value::map(pairs))
}

fn write_settings(settings: &Value, version: &str, writer: &mut Writer) -> Result<()> {
    let at_least = |target| compare_versions(version, target) != Ordering::Less;
    let at_most = |target| compare_versions(version, target) != Ordering::Greater;

    writer.write_i32(field_i32(settings, "map")?);
    let ca = field(settings, "caMap")?;
    super::object::write_vector3(field(ca, "pos")?, writer)?;
    super::object::write_vector3(field(ca, "rot")?, writer)?;
    super::object::write_vector3(field(ca, "scale")?, writer)?;
    writer.write_i32(field_i32(settings, "sunLightType")?);
    write_flag(field(settings, "mapOption")?, writer)?;
    writer.write_i32(field_i32(settings, "aceNo")?);
    if at_least("0.0.2") {
        writer.write_f32(field_f32(settings, "aceBlend")?);
    }
    if at_most("0.0.1") {
        write_flag(field(settings, "deprecated_bool")?, writer)?;
        writer.write_f32(field_f32(settings, "deprecated_float")?);
        writer.write_i8_prefixed(field_str(settings, "deprecated_string")?.as_bytes());
    }
    if at_least("0.0.2") {
        write_flag(field(settings, "enableAOE")?, writer)?;
        writer.write_i8_prefixed(field_str(settings, "aoeColor")?.as_bytes());
        writer.write_f32(field_f32(settings, "aoeRadius")?);
    }
    write_flag(field(settings, "enableBloom")?, writer)?;
    writer.write_f32(field_f32(settings, "bloomIntensity")?);
    writer.write_f32(field_f32(settings, "bloomBlur")?);
    if at_least("0.0.2") {
        writer.write_f32(field_f32(settings, "bloomThreshold")?);
    }
    if at_most("0.0.1") {
        write_flag(field(settings, "deprecated_bool2")?, writer)?;
    }
    write_flag(field(settings, "enableDepth")?, writer)?;
    writer.write_f32(field_f32(settings, "depthFocalSize")?);
    writer.write_f32(field_f32(settings, "depthAperture")?);
    write_flag(field(settings, "enableVignette")?, writer)?;
    if at_most("0.0.1") {
        writer.write_f32(field_f32(settings, "deprecated_float2")?);
    }
    write_flag(field(settings, "enableFog")?, writer)?;
    if at_least("0.0.2") {
        writer.write_i8_prefixed(field_str(settings, "fogColor")?.as_bytes());
        writer.write_f32(field_f32(settings, "fogHeight")?);
        writer.write_f32(field_f32(settings, "fogStartDistance")?);
    }
    write_flag(field(settings, "enableSunShafts")?, writer)?;
    if at_least("0.0.2") {
        writer.write_i8_prefixed(field_str(settings, "sunThresholdColor")?.as_bytes());
        writer.write_i8_prefixed(field_str(settings, "sunColor")?.as_bytes());
    }
    if at_least("0.0.4") {
        writer.write_i32(field_i32(settings, "sunCaster")?);
    }
    if at_least("0.0.2") {
        write_flag(field(settings, "enableShadow")?, writer)?;
    }
    if at_least("0.0.4") {
        write_flag(field(settings, "faceNormal")?, writer)?;
        write_flag(field(settings, "faceShadow")?, writer)?;
        writer.write_f32(field_f32(settings, "lineColorG")?);
        writer.write_i8_prefixed(field_str(settings, "ambientShadow")?.as_bytes());
    }
    if at_least("0.0.5") {
        writer.write_f32(field_f32(settings, "lineWidthG")?);
        writer.write_i32(field_i32(settings, "rampG")?);
        writer.write_f32(field_f32(settings, "ambientShadowG")?);
    }
    if at_least("1.1.0.0") {
        writer.write_i32(field_i32(settings, "shaderType")?);
    }
    if at_least("1.1.2.0") {
        writer.write_i32_prefixed(&mpack::encode(field(settings, "skyInfo")?));
    }

    write_camera_data(field(settings, "cameraSaveData")?, writer)?;
    for camera in field(settings, "cameraData")?
        .as_array()
        .into_iter()
        .flatten()
    {
        write_camera_data(camera, writer)?;
    }

    write_light_info_base(field(settings, "charaLight")?, writer)?;
    let map_light = field(settings, "mapLight")?;
    write_light_info_base(map_light, writer)?;
    writer.write_i32(field_i32(map_light, "type")?);

    write_sound_ctrl(field(settings, "bgmCtrl")?, writer)?;
    write_sound_ctrl(field(settings, "envCtrl")?, writer)?;
    let outside = field(settings, "outsideSoundCtrl")?;
    writer.write_i32(field_i32(outside, "repeat")?);
    writer.write_varint_prefixed(field_str(outside, "fileName")?.as_bytes());
    write_flag(field(outside, "play")?, writer)?;

    writer.write_i8_prefixed(field_str(settings, "background")?.as_bytes());
    writer.write_i8_prefixed(field_str(settings, "frame")?.as_bytes());
    Ok(())
}

impl std::fmt::Debug for KoikatuScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KoikatuScene")
            .field("version", &self.version)
            .field("objects", &self.objects.len())
            .field("has_mod", &self.mod_section.is_some())
            .finish()
    }
}
