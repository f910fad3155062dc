use crate::error::{Error, Result};
use crate::mpack::{self, Value};

/// One block listed in the catalog.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub name: String,
    pub version: String,
    /// Byte offset of the block body within the block-data section.
    pub pos: usize,
    /// Byte length of the block body.
    pub size: usize,
}

/// The `lstInfo` catalog preceding the block-data section.
///
/// The decoded value tree is kept alongside the typed entries: on save only
/// the `pos`/`size` numbers are patched, so a catalog the game serializer
/// wrote with unusual tag widths still re-encodes byte-for-byte when
/// nothing changed.
#[derive(Debug, Clone)]
pub struct Catalog {
    value: Value,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = mpack::decode(bytes)?;
        let list = value
            .get("lstInfo")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::SchemaMismatch {
                context: "block catalog",
                expected: "map with an lstInfo array",
                found: summarize(&value),
            })?;

        let mut entries = Vec::with_capacity(list.len());
        for item in list {
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| entry_error("name", item))?
                .to_owned();
            let version = item
                .get("version")
                .and_then(Value::as_str)
                .ok_or_else(|| entry_error("version", item))?
                .to_owned();
            let pos = item
                .get("pos")
                .and_then(Value::as_u64)
                .ok_or_else(|| entry_error("pos", item))? as usize;
            let size = item
                .get("size")
                .and_then(Value::as_u64)
                .ok_or_else(|| entry_error("size", item))? as usize;
            entries.push(CatalogEntry {
                name,
                version,
                pos,
                size,
            });
        }
        Ok(Self { value, entries })
    }

    /// Entries in catalog listing order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry indices ordered by body position. Bodies are concatenated in
    /// this order; the catalog may list them differently.
    pub fn body_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| self.entries[i].pos);
        order
    }

    /// Re-encode the catalog for bodies whose new sizes are given in
    /// catalog order. Positions are reassigned sequentially following the
    /// original body order; untouched numbers keep their tag memo.
    pub fn encode_with_sizes(&self, sizes: &[usize]) -> Vec<u8> {
        debug_assert_eq!(sizes.len(), self.entries.len());
        let mut positions = vec![0usize; self.entries.len()];
        let mut cursor = 0usize;
        for idx in self.body_order() {
            positions[idx] = cursor;
            cursor += sizes[idx];
        }
        let mut value = self.value.clone();
        if let Some(list) = value.get_mut("lstInfo").and_then(Value::as_array_mut) {
            for (idx, item) in list.iter_mut().enumerate() {
                patch_number(item, "pos", positions[idx] as u64);
                patch_number(item, "size", sizes[idx] as u64);
            }
        }
        mpack::encode(&value)
    }

    /// Total length of the block-data section implied by the entries.
    pub fn body_len(&self) -> usize {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Overwrite a numeric field only when its value actually changed, so an
/// unchanged catalog reproduces its original bytes.
fn patch_number(entry: &mut Value, key: &str, new: u64) {
    if let Some(slot) = entry.get_mut(key) {
        if slot.as_u64() != Some(new) {
            *slot = Value::uint(new);
        }
    }
}

fn entry_error(field: &'static str, item: &Value) -> Error {
    Error::SchemaMismatch {
        context: "block catalog entry",
        expected: field,
        found: summarize(item),
    }
}

fn summarize(value: &Value) -> String {
    format!("{value:?}").chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_value(entries: &[(&str, &str, u64, u64)]) -> Value {
        Value::map(vec![(
            Value::str("lstInfo"),
            Value::array(
                entries
                    .iter()
                    .map(|(name, version, pos, size)| {
                        Value::map(vec![
                            (Value::str("name"), Value::str(*name)),
                            (Value::str("version"), Value::str(*version)),
                            (Value::str("pos"), Value::uint(*pos)),
                            (Value::str("size"), Value::uint(*size)),
                        ])
                    })
                    .collect(),
            ),
        )])
    }

    #[test]
    fn decode_and_reencode_unchanged() {
        let bytes = mpack::encode(&catalog_value(&[
            ("Custom", "0.0.0", 0, 10),
            ("Parameter", "0.0.5", 10, 4),
        ]));
        let catalog = Catalog::decode(&bytes).unwrap();
        assert_eq!(catalog.entries()[0].name, "Custom");
        assert_eq!(catalog.entries()[1].pos, 10);
        assert_eq!(catalog.encode_with_sizes(&[10, 4]), bytes);
    }

    #[test]
    fn positions_follow_body_order_not_listing_order() {
        // Catalog lists Parameter first but its body sits second on disk.
        let bytes = mpack::encode(&catalog_value(&[
            ("Parameter", "0.0.5", 7, 4),
            ("Custom", "0.0.0", 0, 7),
        ]));
        let catalog = Catalog::decode(&bytes).unwrap();
        assert_eq!(catalog.body_order(), vec![1, 0]);
        // Custom grows to 9 bytes; Parameter's pos must move to 9.
        let reencoded = Catalog::decode(&catalog.encode_with_sizes(&[4, 9])).unwrap();
        assert_eq!(reencoded.entries()[0].pos, 9);
        assert_eq!(reencoded.entries()[1].pos, 0);
    }

    #[test]
    fn malformed_catalog_is_schema_mismatch() {
        let bytes = mpack::encode(&Value::int(3));
        assert!(matches!(
            Catalog::decode(&bytes),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
