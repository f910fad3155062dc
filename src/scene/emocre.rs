//! EmotionCreators map and scene containers.
//!
//! Maps carry their own node tree (items, folders, capture regions) with
//! JSON-string transforms; scenes are a header plus embedded character
//! cards and PNG-less maps. The reference implementation has no scene
//! writer, so scenes load only; their embedded documents save through
//! their own types.

use std::cmp::Ordering;
use std::path::Path;

use crate::cursor::{Cursor, Writer};
use crate::document::Document;
use crate::error::Result;
use crate::mpack::Value;
use crate::png;
use crate::variant::Variant;

use super::compare_versions;
use super::object::{field, field_f32, field_i32, field_str, read_flag, write_flag, type_error, Fields};

/// Node type codes inside a map: 1 item, 3 folder, 4 capture region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapNodeType(pub i32);

impl MapNodeType {
    pub const ITEM: Self = Self(1);
    pub const FOLDER: Self = Self(3);
    pub const REGION: Self = Self(4);
}

#[derive(Debug)]
pub struct MapNode {
    pub node_type: MapNodeType,
    /// Scalar fields in wire order; transforms are verbatim JSON strings.
    pub data: Value,
    /// Pillar sub-node of items (newer map versions), stored without
    /// tree-state fields.
    pub piller: Option<Box<MapNode>>,
    pub children: Vec<MapNode>,
}

pub struct EmocreMap {
    pub image: Option<Vec<u8>>,
    pub product_no: i32,
    pub magic: String,
    pub version: String,
    pub userid: String,
    pub dataid: String,
    pub packages: Vec<i32>,
    pub name: String,
    pub language: i32,
    /// Present from map format 0.0.5.3 on.
    pub object_counts: Option<(i32, Value)>,
    pub nodes: Vec<MapNode>,
    pub camera: Value,
    pub light: Value,
    pub map_no: i32,
    pub map_type: i32,
}

impl EmocreMap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let split = png::split(data)?;
        let mut cursor = Cursor::new(data);
        cursor.seek(data.len() - split.tail.len());
        Self::read(&mut cursor, Some(split.image.to_vec()))
    }

    pub(crate) fn read(cursor: &mut Cursor<'_>, image: Option<Vec<u8>>) -> Result<Self> {
        let product_no = cursor.read_i32()?;
        let magic = cursor.read_i8_string()?;
        let version = cursor.read_i8_string()?;
        let userid = cursor.read_i8_string()?;
        let dataid = cursor.read_i8_string()?;

        let package_count = cursor.read_i32()?.max(0) as usize;
        let mut packages = Vec::with_capacity(package_count);
        for _ in 0..package_count {
            packages.push(cursor.read_i32()?);
        }
        let name = cursor.read_i8_string()?;
        let language = cursor.read_i32()?;

        let object_counts = if compare_versions(&version, "0.0.5.2") == Ordering::Greater {
            Some((cursor.read_i32()?, read_flag(cursor)?))
        } else {
            None
        };

        // Maps older than 0.0.5.2 interleave a constant -1 before each
        // node type.
        let old_format = compare_versions(&version, "0.0.5.2") == Ordering::Less;
        let node_count = cursor.read_i32()?.max(0) as usize;
        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            if old_format {
                cursor.read_i32()?;
            }
            let node_type = cursor.read_i32()?;
            nodes.push(read_node(cursor, &version, node_type, false)?);
        }

        let camera = Value::map(vec![
            (Value::str("version"), Value::str(cursor.read_i8_string()?)),
            (Value::str("pos"), Value::str(cursor.read_i8_string()?)),
            (Value::str("rot"), Value::str(cursor.read_i8_string()?)),
            (Value::str("dist"), Value::F32(cursor.read_f32()?)),
            (Value::str("parse"), Value::F32(cursor.read_f32()?)),
            (Value::str("graphic_size"), Value::F32(cursor.read_f32()?)),
        ]);
        let light = Value::map(vec![
            (Value::str("color"), Value::str(cursor.read_i8_string()?)),
            (Value::str("intensity"), Value::F32(cursor.read_f32()?)),
            (Value::str("rot0"), Value::F32(cursor.read_f32()?)),
            (Value::str("rot1"), Value::F32(cursor.read_f32()?)),
            (Value::str("shadow"), read_flag(cursor)?),
        ]);
        let map_no = cursor.read_i32()?;
        let map_type = cursor.read_i32()?;

        Ok(Self {
            image,
            product_no,
            magic,
            version,
            userid,
            dataid,
            packages,
            name,
            language,
            object_counts,
            nodes,
            camera,
            light,
            map_no,
            map_type,
        })
    }

    pub fn variant(&self) -> Variant {
        Variant::EmocreMap
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        if let Some(image) = &self.image {
            writer.write_bytes(image);
        }
        self.write(&mut writer)?;
        Ok(writer.into_bytes())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save_bytes()?)?;
        Ok(())
    }

    pub(crate) fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i32(self.product_no);
        writer.write_i8_prefixed(self.magic.as_bytes());
        writer.write_i8_prefixed(self.version.as_bytes());
        writer.write_i8_prefixed(self.userid.as_bytes());
        writer.write_i8_prefixed(self.dataid.as_bytes());
        writer.write_i32(self.packages.len() as i32);
        for package in &self.packages {
            writer.write_i32(*package);
        }
        writer.write_i8_prefixed(self.name.as_bytes());
        writer.write_i32(self.language);
        if let Some((count, scene_flag)) = &self.object_counts {
            writer.write_i32(*count);
            write_flag(scene_flag, writer)?;
        }

        let old_format = compare_versions(&self.version, "0.0.5.2") == Ordering::Less;
        writer.write_i32(self.nodes.len() as i32);
        for node in &self.nodes {
            if old_format {
                writer.write_i32(-1);
            }
            writer.write_i32(node.node_type.0);
            write_node(node, &self.version, writer)?;
        }

        writer.write_i8_prefixed(field_str(&self.camera, "version")?.as_bytes());
        writer.write_i8_prefixed(field_str(&self.camera, "pos")?.as_bytes());
        writer.write_i8_prefixed(field_str(&self.camera, "rot")?.as_bytes());
        writer.write_f32(field_f32(&self.camera, "dist")?);
        writer.write_f32(field_f32(&self.camera, "parse")?);
        writer.write_f32(field_f32(&self.camera, "graphic_size")?);

        writer.write_i8_prefixed(field_str(&self.light, "color")?.as_bytes());
        writer.write_f32(field_f32(&self.light, "intensity")?);
        writer.write_f32(field_f32(&self.light, "rot0")?);
        writer.write_f32(field_f32(&self.light, "rot1")?);
        write_flag(field(&self.light, "shadow")?, writer)?;

        writer.write_i32(self.map_no);
        writer.write_i32(self.map_type);
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

fn read_node(
    cursor: &mut Cursor<'_>,
    version: &str,
    node_type: i32,
    bare: bool,
) -> Result<MapNode> {
    let mut fields = Fields::new();
    fields.push("dickey", Value::int(cursor.read_i32()? as i64));
    fields.push("pos", Value::str(cursor.read_i8_string()?));
    fields.push("angle", Value::str(cursor.read_i8_string()?));
    fields.push("scale", Value::str(cursor.read_i8_string()?));
    if !bare {
        fields.push("treestate", Value::int(cursor.read_i32()? as i64));
        fields.push("visible", read_flag(cursor)?);
    }

    let mut piller = None;
    let mut children = Vec::new();
    match node_type {
        1 => {
            fields.push("package", Value::int(cursor.read_i32()? as i64));
            fields.push("no", Value::int(cursor.read_i32()? as i64));
            fields.push("animspeed", Value::F32(cursor.read_f32()?));
            let mut colors = Vec::with_capacity(8);
            for _ in 0..8 {
                colors.push(Value::str(cursor.read_i8_string()?));
            }
            fields.push("colors", Value::array(colors));
            let mut patterns = Vec::with_capacity(3);
            for _ in 0..3 {
                patterns.push(Value::map(vec![
                    (Value::str("key"), Value::int(cursor.read_i32()? as i64)),
                    (Value::str("clamp"), read_flag(cursor)?),
                    (Value::str("uv"), Value::str(cursor.read_i8_string()?)),
                    (Value::str("rot"), Value::F32(cursor.read_f32()?)),
                ]));
            }
            fields.push("patterns", Value::array(patterns));
            fields.push("alpha", Value::F32(cursor.read_f32()?));
            fields.push("linecolor", Value::str(cursor.read_i8_string()?));
            fields.push("linewidth", Value::F32(cursor.read_f32()?));
            fields.push("emissioncolor", Value::str(cursor.read_i8_string()?));
            fields.push("emissionpower", Value::F32(cursor.read_f32()?));
            fields.push("lightcancel", Value::F32(cursor.read_f32()?));
            if compare_versions(version, "0.0.3") == Ordering::Greater {
                piller = Some(Box::new(read_node(cursor, version, -1, true)?));
            }
            if compare_versions(version, "0.0.5.3") == Ordering::Greater {
                fields.push("sielding", read_flag(cursor)?);
            }
            children = read_node_children(cursor, version)?;
        }
        3 => {
            fields.push("name", Value::str(cursor.read_varint_string()?));
            children = read_node_children(cursor, version)?;
        }
        4 => {
            fields.push("name", Value::str(cursor.read_i8_string()?));
            fields.push("center", Value::str(cursor.read_i8_string()?));
            fields.push("size", Value::str(cursor.read_i8_string()?));
            children = read_node_children(cursor, version)?;
        }
        _ => {}
    }

    Ok(MapNode {
        node_type: MapNodeType(node_type),
        data: fields.into_value(),
        piller,
        children,
    })
}

fn read_node_children(cursor: &mut Cursor<'_>, version: &str) -> Result<Vec<MapNode>> {
    let count = cursor.read_i32()?.max(0) as usize;
    let mut children = Vec::with_capacity(count);
    for _ in 0..count {
        let node_type = cursor.read_i32()?;
        children.push(read_node(cursor, version, node_type, false)?);
    }
    Ok(children)
}

fn write_node(node: &MapNode, version: &str, writer: &mut Writer) -> Result<()> {
    let data = &node.data;
    writer.write_i32(field_i32(data, "dickey")?);
    writer.write_i8_prefixed(field_str(data, "pos")?.as_bytes());
    writer.write_i8_prefixed(field_str(data, "angle")?.as_bytes());
    writer.write_i8_prefixed(field_str(data, "scale")?.as_bytes());
    let bare = data.get("treestate").is_none();
    if !bare {
        writer.write_i32(field_i32(data, "treestate")?);
        write_flag(field(data, "visible")?, writer)?;
    }

    match node.node_type.0 {
        1 => {
            writer.write_i32(field_i32(data, "package")?);
            writer.write_i32(field_i32(data, "no")?);
            writer.write_f32(field_f32(data, "animspeed")?);
            for color in field(data, "colors")?.as_array().into_iter().flatten() {
                let text = color.as_str().ok_or(type_error("colors", "string"))?;
                writer.write_i8_prefixed(text.as_bytes());
            }
            for pattern in field(data, "patterns")?.as_array().into_iter().flatten() {
                writer.write_i32(field_i32(pattern, "key")?);
                write_flag(field(pattern, "clamp")?, writer)?;
                writer.write_i8_prefixed(field_str(pattern, "uv")?.as_bytes());
                writer.write_f32(field_f32(pattern, "rot")?);
            }
            writer.write_f32(field_f32(data, "alpha")?);
            writer.write_i8_prefixed(field_str(data, "linecolor")?.as_bytes());
            writer.write_f32(field_f32(data, "linewidth")?);
            writer.write_i8_prefixed(field_str(data, "emissioncolor")?.as_bytes());
            writer.write_f32(field_f32(data, "emissionpower")?);
            writer.write_f32(field_f32(data, "lightcancel")?);
            if let Some(piller) = &node.piller {
                write_node(piller, version, writer)?;
            }
            if compare_versions(version, "0.0.5.3") == Ordering::Greater {
                write_flag(field(data, "sielding")?, writer)?;
            }
            write_node_children(&node.children, version, writer)?;
        }
        3 => {
            writer.write_varint_prefixed(field_str(data, "name")?.as_bytes());
            write_node_children(&node.children, version, writer)?;
        }
        4 => {
            writer.write_i8_prefixed(field_str(data, "name")?.as_bytes());
            writer.write_i8_prefixed(field_str(data, "center")?.as_bytes());
            writer.write_i8_prefixed(field_str(data, "size")?.as_bytes());
            write_node_children(&node.children, version, writer)?;
        }
        _ => {}
    }
    Ok(())
}

fn write_node_children(children: &[MapNode], version: &str, writer: &mut Writer) -> Result<()> {
    writer.write_i32(children.len() as i32);
    for child in children {
        writer.write_i32(child.node_type.0);
        write_node(child, version, writer)?;
    }
    Ok(())
}

/// An EmotionCreators scene: header, then full character cards and
/// PNG-less maps. Load-only; see the module docs.
pub struct EmocreScene {
    pub image: Vec<u8>,
    pub product_no: i32,
    pub magic: String,
    pub version: String,
    pub language: i32,
    pub userid: String,
    pub dataid: String,
    pub title: String,
    pub comment: String,
    pub default_bgm: i32,
    pub tags: Vec<i32>,
    pub males: i32,
    pub females: i32,
    pub is_playing: bool,
    pub uses_adv: bool,
    pub uses_hpart: bool,
    pub chara_packages: Vec<i32>,
    pub map_packages: Vec<i32>,
    pub uses_mapset: bool,
    pub map_objects: i32,
    pub charas: Vec<Document>,
    pub maps: Vec<EmocreMap>,
}

impl EmocreScene {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let split = png::split(data)?;
        let mut cursor = Cursor::new(data);
        cursor.seek(data.len() - split.tail.len());

        let product_no = cursor.read_i32()?;
        let magic = cursor.read_i8_string()?;
        let version = cursor.read_i8_string()?;
        let language = cursor.read_i32()?;
        let userid = cursor.read_i8_string()?;
        let dataid = cursor.read_i8_string()?;
        let title = cursor.read_i8_string()?;
        let comment = cursor.read_i8_string()?;
        let default_bgm = cursor.read_i32()?;

        let tags = read_i32_list(&mut cursor)?;
        let males = cursor.read_i32()?;
        let females = cursor.read_i32()?;
        let is_playing = cursor.read_i8()? != 0;
        let uses_adv = cursor.read_i8()? != 0;
        let uses_hpart = cursor.read_i8()? != 0;
        let chara_packages = read_i32_list(&mut cursor)?;
        let map_packages = read_i32_list(&mut cursor)?;
        let uses_mapset = cursor.read_i8()? != 0;
        let map_objects = cursor.read_i32()?;

        let chara_count = cursor.read_i32()?.max(0) as usize;
        let mut charas = Vec::with_capacity(chara_count);
        for _ in 0..chara_count {
            charas.push(Document::read_embedded(&mut cursor, true)?);
        }
        let map_count = cursor.read_i32()?.max(0) as usize;
        let mut maps = Vec::with_capacity(map_count);
        for _ in 0..map_count {
            maps.push(EmocreMap::read(&mut cursor, None)?);
        }

        Ok(Self {
            image: split.image.to_vec(),
            product_no,
            magic,
            version,
            language,
            userid,
            dataid,
            title,
            comment,
            default_bgm,
            tags,
            males,
            females,
            is_playing,
            uses_adv,
            uses_hpart,
            chara_packages,
            map_packages,
            uses_mapset,
            map_objects,
            charas,
            maps,
        })
    }

    pub fn variant(&self) -> Variant {
        Variant::EmocreScene
    }
}

impl std::fmt::Debug for EmocreScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmocreScene")
            .field("title", &self.title)
            .field("charas", &self.charas.len())
            .field("maps", &self.maps.len())
            .finish()
    }
}
