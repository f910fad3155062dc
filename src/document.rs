use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine as _;

use crate::blocks::BlockCodec;
use crate::catalog::Catalog;
use crate::cursor::{Cursor, Writer};
use crate::error::{Error, Result};
use crate::mpack::{BytesMode, Value};
use crate::nested::{self, NestedDecodeWarning};
use crate::png;
use crate::variant::{detect_card, FieldKind, HeaderValue, Variant};

/// Payload of one block: decoded when the variant's schema covers it,
/// otherwise the untouched body bytes.
#[derive(Debug, Clone)]
pub enum BlockPayload {
    Decoded(Value),
    Opaque(Vec<u8>),
}

/// One named block from the catalog.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub version: String,
    payload: BlockPayload,
    codec: Option<BlockCodec>,
    /// Body length recorded in the catalog at load time.
    pub original_size: usize,
}

impl Block {
    pub fn is_opaque(&self) -> bool {
        matches!(self.payload, BlockPayload::Opaque(_))
    }

    /// The decoded value tree, if this block was understood.
    pub fn value(&self) -> Option<&Value> {
        match &self.payload {
            BlockPayload::Decoded(v) => Some(v),
            BlockPayload::Opaque(_) => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut Value> {
        match &mut self.payload {
            BlockPayload::Decoded(v) => Some(v),
            BlockPayload::Opaque(_) => None,
        }
    }

    /// Raw bytes of an opaque block.
    pub fn opaque_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            BlockPayload::Opaque(b) => Some(b),
            BlockPayload::Decoded(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value()?.get(key)
    }

    /// Set a map entry on the decoded value. Returns false for opaque
    /// blocks or non-map payloads.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        match self.value_mut() {
            Some(v) => v.set(key, value),
            None => false,
        }
    }

    /// Human-readable pretty print. Byte strings are summarized, not dumped.
    pub fn prettify(&self) -> String {
        match &self.payload {
            BlockPayload::Decoded(v) => {
                serde_json::to_string_pretty(&v.to_json(BytesMode::Summarize))
                    .unwrap_or_else(|_| "<unprintable>".to_owned())
            }
            BlockPayload::Opaque(b) => format!("<opaque: {} bytes>", b.len()),
        }
    }

    fn encode_body(&self) -> Result<Vec<u8>> {
        match (&self.payload, self.codec) {
            (BlockPayload::Opaque(bytes), _) => Ok(bytes.clone()),
            (BlockPayload::Decoded(value), Some(codec)) => codec.encode(value),
            (BlockPayload::Decoded(_), None) => Err(Error::SchemaMismatch {
                context: "block encode",
                expected: "codec for decoded block",
                found: self.name.clone(),
            }),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match &self.payload {
            BlockPayload::Decoded(v) => v.to_json(BytesMode::Base64),
            BlockPayload::Opaque(b) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            ),
        }
    }
}

impl std::ops::Index<&str> for Block {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key)
            .unwrap_or_else(|| panic!("block {:?} has no entry {key:?}", self.name))
    }
}

/// A loaded character card.
///
/// The PNG prefix is opaque; everything behind it is the catalog-driven
/// block tree. Re-encoding an unmodified document reproduces the input
/// bytes; after a point mutation only the enclosing block's bytes (and the
/// catalog numbers that depend on its size) change.
pub struct Document {
    variant: Variant,
    /// Card image, empty for cards embedded without one.
    pub image: Vec<u8>,
    /// Second PNG when the container carries one back-to-back.
    pub face_image: Option<Vec<u8>>,
    pub product_no: i32,
    /// The bracketed magic string, e.g. 【KoiKatuChara】.
    pub magic: String,
    pub version: String,
    header: Vec<(String, HeaderValue)>,
    blocks: Vec<Block>,
    by_name: HashMap<String, usize>,
    catalog: Catalog,
    nested_warnings: Vec<NestedDecodeWarning>,
    source_path: Option<PathBuf>,
}

impl Document {
    /// Load a card file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let mut doc = Self::from_bytes(&data)?;
        doc.source_path = Some(path.as_ref().to_owned());
        Ok(doc)
    }

    /// Load a card from a full file image (PNG prefix included).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let split = png::split(data)?;
        let mut cursor = Cursor::new(data);
        cursor.seek(data.len() - split.tail.len());
        let doc = Self::read_card(
            &mut cursor,
            split.image.to_vec(),
            split.face_image.map(<[u8]>::to_vec),
        )?;
        if cursor.remaining() != 0 {
            return Err(Error::SchemaMismatch {
                context: "card file",
                expected: "no data after block section",
                found: format!("{} trailing bytes", cursor.remaining()),
            });
        }
        Ok(doc)
    }

    /// Read a card embedded inside another stream (save files, scenes).
    /// The cursor is left just past the block-data section.
    pub(crate) fn read_embedded(cursor: &mut Cursor<'_>, with_png: bool) -> Result<Self> {
        if with_png {
            let start = cursor.position();
            let image_len = png::png_length(cursor.data(), start)?;
            let image = cursor.read_bytes(image_len)?.to_vec();
            Self::read_card(cursor, image, None)
        } else {
            Self::read_card(cursor, Vec::new(), None)
        }
    }

    fn read_card(
        cursor: &mut Cursor<'_>,
        image: Vec<u8>,
        face_image: Option<Vec<u8>>,
    ) -> Result<Self> {
        let product_no = cursor.read_i32()?;
        let magic = cursor.read_i8_string()?;
        let variant = detect_card(&magic).ok_or_else(|| Error::UnknownVariant {
            magic: magic.clone(),
        })?;
        let version = cursor.read_i8_string()?;

        let mut header = Vec::new();
        for &(name, kind) in variant.header_tail() {
            let value = match kind {
                FieldKind::I32 => HeaderValue::Int(cursor.read_i32()?),
                FieldKind::TextI8 => HeaderValue::Text(cursor.read_i8_string()?),
                FieldKind::BytesI32 => HeaderValue::Bytes(cursor.read_i32_prefixed()?.to_vec()),
                FieldKind::I32List => {
                    let count = cursor.read_i32()?.max(0) as usize;
                    let mut items = Vec::with_capacity(count);
                    for _ in 0..count {
                        items.push(cursor.read_i32()?);
                    }
                    HeaderValue::IntList(items)
                }
            };
            header.push((name.to_owned(), value));
        }

        let catalog_bytes = cursor.read_i32_prefixed()?;
        let catalog = Catalog::decode(catalog_bytes)?;
        let body = cursor.read_i64_prefixed()?;

        let mut blocks = Vec::with_capacity(catalog.len());
        let mut by_name = HashMap::new();
        let mut nested_warnings = Vec::new();
        for entry in catalog.entries() {
            let end = entry.pos.checked_add(entry.size).filter(|&e| e <= body.len());
            let slice = match end {
                Some(end) => &body[entry.pos..end],
                None => {
                    return Err(Error::Truncated {
                        offset: entry.pos,
                        need: entry.size,
                        have: body.len().saturating_sub(entry.pos),
                    })
                }
            };
            let codec = variant.block_codec(&entry.name, &entry.version);
            let payload = match codec {
                Some(codec) => {
                    let mut value = codec.decode(slice)?;
                    if codec == BlockCodec::KkEx && variant.has_nested_plugins() {
                        nested::process(&entry.name, &mut value, &mut nested_warnings);
                    }
                    BlockPayload::Decoded(value)
                }
                None => BlockPayload::Opaque(slice.to_vec()),
            };
            by_name.entry(entry.name.clone()).or_insert(blocks.len());
            blocks.push(Block {
                name: entry.name.clone(),
                version: entry.version.clone(),
                payload,
                codec,
                original_size: entry.size,
            });
        }

        Ok(Self {
            variant,
            image,
            face_image,
            product_no,
            magic,
            version,
            header,
            blocks,
            by_name,
            catalog,
            nested_warnings,
            source_path: None,
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Nested plugin payloads that failed to decode on load.
    pub fn nested_warnings(&self) -> &[NestedDecodeWarning] {
        &self.nested_warnings
    }

    /// Header fields after product/magic/version, in wire order.
    pub fn header_fields(&self) -> &[(String, HeaderValue)] {
        &self.header
    }

    pub fn header_field(&self, name: &str) -> Option<&HeaderValue> {
        self.header
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn header_field_mut(&mut self, name: &str) -> Option<&mut HeaderValue> {
        self.header
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// All blocks in catalog order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.by_name.get(name).map(|&i| &self.blocks[i])
    }

    pub fn block_mut(&mut self, name: &str) -> Option<&mut Block> {
        let idx = *self.by_name.get(name)?;
        Some(&mut self.blocks[idx])
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Block names in catalog order.
    pub fn blockdata(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.name.as_str()).collect()
    }

    /// Names of blocks carried opaque.
    pub fn unknown_blockdata(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|b| b.is_opaque())
            .map(|b| b.name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Block)> {
        self.blocks.iter().map(|b| (b.name.as_str(), b))
    }

    /// Serialize back to a full file image.
    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::with_capacity(self.image.len() + 4096);
        writer.write_bytes(&self.image);
        if let Some(face) = &self.face_image {
            writer.write_bytes(face);
        }
        self.write_card(&mut writer)?;
        Ok(writer.into_bytes())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.save_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Write the card (header + catalog + bodies) without the PNG prefix,
    /// for embedding into saves and scenes.
    pub(crate) fn write_card(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i32(self.product_no);
        writer.write_i8_prefixed(self.magic.as_bytes());
        writer.write_i8_prefixed(self.version.as_bytes());
        for (_, value) in &self.header {
            match value {
                HeaderValue::Int(v) => writer.write_i32(*v),
                HeaderValue::Text(s) => writer.write_i8_prefixed(s.as_bytes()),
                HeaderValue::Bytes(b) => writer.write_i32_prefixed(b),
                HeaderValue::IntList(items) => {
                    writer.write_i32(items.len() as i32);
                    for item in items {
                        writer.write_i32(*item);
                    }
                }
            }
        }

        let mut bodies = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            bodies.push(block.encode_body()?);
        }
        let sizes: Vec<usize> = bodies.iter().map(Vec::len).collect();
        let catalog_bytes = self.catalog.encode_with_sizes(&sizes);
        writer.write_i32_prefixed(&catalog_bytes);

        let body_len: usize = sizes.iter().sum();
        writer.write_i64(body_len as i64);
        for idx in self.catalog.body_order() {
            writer.write_bytes(&bodies[idx]);
        }
        Ok(())
    }

    /// Map the document onto a JSON structure for inspection. One-way:
    /// the export is not a serialization format.
    pub fn to_json(&self, include_image: bool) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        root.insert("product_no".into(), self.product_no.into());
        root.insert("header".into(), self.magic.clone().into());
        root.insert("version".into(), self.version.clone().into());
        root.insert(
            "blockdata".into(),
            serde_json::Value::Array(
                self.blockdata().iter().map(|&n| n.into()).collect(),
            ),
        );
        let b64 = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);
        for (name, value) in &self.header {
            match value {
                HeaderValue::Int(v) => {
                    root.insert(name.clone(), (*v).into());
                }
                HeaderValue::Text(s) => {
                    root.insert(name.clone(), s.clone().into());
                }
                HeaderValue::Bytes(bytes) => {
                    if include_image {
                        root.insert(name.clone(), b64(bytes).into());
                    }
                }
                HeaderValue::IntList(items) => {
                    root.insert(
                        name.clone(),
                        serde_json::Value::Array(items.iter().map(|&v| v.into()).collect()),
                    );
                }
            }
        }
        if include_image {
            root.insert("image".into(), b64(&self.image).into());
            if let Some(face) = &self.face_image {
                root.insert("face_image_png".into(), b64(face).into());
            }
        }
        let mut versions = serde_json::Map::new();
        for block in &self.blocks {
            root.insert(block.name.clone(), block.to_json());
            versions.insert(block.name.clone(), block.version.clone().into());
        }
        root.insert("blockdata_versions".into(), versions.into());
        serde_json::Value::Object(root)
    }

    pub fn save_json(&self, path: impl AsRef<Path>, include_image: bool) -> Result<()> {
        let json = self.to_json(include_image);
        let text = serde_json::to_string_pretty(&json).map_err(|e| Error::SchemaMismatch {
            context: "json export",
            expected: "serializable document",
            found: e.to_string(),
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl std::ops::Index<&str> for Document {
    type Output = Block;

    fn index(&self, name: &str) -> &Block {
        self.block(name)
            .unwrap_or_else(|| panic!("no such blockdata {name:?}"))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("variant", &self.variant)
            .field("magic", &self.magic)
            .field("version", &self.version)
            .field("image_len", &self.image.len())
            .field("blocks", &self.blockdata())
            .finish()
    }
}
