use crate::mpack::{self, Value};

/// Plugin payload locations inside the KKEx block.
///
/// Each path is `(plugin key, element index, data key)`: the plugin entry
/// is a two-element list whose second slot holds the data map. The byte
/// string found under the data key is an independently encoded value graph
/// written by that plugin.
pub const NESTED_PATHS: &[(&str, usize, &str)] = &[
    ("Accessory_States", 1, "CoordinateData"),
    ("Additional_Card_Info", 1, "CardInfo"),
    ("Additional_Card_Info", 1, "CoordinateInfo"),
    ("KCOX", 1, "Overlays"),
    ("KKABMPlugin.ABMData", 1, "boneData"),
    ("KSOX", 1, "Lookup"),
    ("MigrationHelper", 1, "Info"),
    ("com.deathweasel.bepinex.clothingunlocker", 1, "ClothingUnlocked"),
    ("com.deathweasel.bepinex.dynamicboneeditor", 1, "AccessoryDynamicBoneData"),
    ("com.deathweasel.bepinex.hairaccessorycustomizer", 1, "HairAccessories"),
    ("com.deathweasel.bepinex.materialeditor", 1, "MaterialColorPropertyList"),
    ("com.deathweasel.bepinex.materialeditor", 1, "MaterialFloatPropertyList"),
    ("com.deathweasel.bepinex.materialeditor", 1, "MaterialShaderList"),
    ("com.deathweasel.bepinex.materialeditor", 1, "MaterialTexturePropertyList"),
    ("com.deathweasel.bepinex.materialeditor", 1, "RendererPropertyList"),
    ("com.deathweasel.bepinex.materialeditor", 1, "TextureDictionary"),
    ("com.deathweasel.bepinex.pushup", 1, "Pushup_BodyData"),
    ("com.deathweasel.bepinex.pushup", 1, "Pushup_BraData"),
    ("com.deathweasel.bepinex.pushup", 1, "Pushup_TopData"),
    ("com.jim60105.kk.charaoverlaysbasedoncoordinate", 1, "IrisDisplaySideList"),
    ("com.snw.bepinex.breastphysicscontroller", 1, "DynamicBoneParameter"),
    ("madevil.kk.ass", 1, "CharaTriggerInfo"),
    ("madevil.kk.ass", 1, "CharaVirtualGroupInfo"),
    ("madevil.kk.ass", 1, "CharaVirtualGroupNames"),
    ("madevil.kk.ass", 1, "TriggerGroupList"),
    ("madevil.kk.ass", 1, "TriggerPropertyList"),
    ("madevil.kk.ca", 1, "AAAPKExtdata"),
    ("madevil.kk.ca", 1, "AccStateSyncExtdata"),
    ("madevil.kk.ca", 1, "DynamicBoneEditorExtdata"),
    ("madevil.kk.ca", 1, "HairAccessoryCustomizerExtdata"),
    ("madevil.kk.ca", 1, "MaterialEditorExtdata"),
    ("madevil.kk.ca", 1, "MoreAccessoriesExtdata"),
    ("madevil.kk.ca", 1, "ResolutionInfoExtdata"),
    ("madevil.kk.ca", 1, "TextureContainer"),
    ("marco.authordata", 1, "Authors"),
    ("orange.spork.advikplugin", 1, "ResizeChainAdjustments"),
];

/// A nested plugin payload that could not be decoded. The field keeps its
/// raw bytes; loading continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedDecodeWarning {
    pub block: String,
    pub path: String,
}

/// Decode the nested plugin payloads of a KKEx value in place.
///
/// A byte string is replaced with `Nested` only when the inner decode
/// consumed it entirely; empty or partial payloads stay opaque and are
/// reported. Decoded payloads are processed again, so plugins that embed
/// other plugins' data resolve to their full depth.
pub fn process(block: &str, value: &mut Value, warnings: &mut Vec<NestedDecodeWarning>) {
    for &(plugin, index, key) in NESTED_PATHS {
        let Some(slot) = lookup_path(value, plugin, index, key) else {
            continue;
        };
        let Value::Bin(bytes, format) = slot else {
            continue;
        };
        let format = *format;
        match mpack::decode(bytes.as_slice()) {
            Ok(mut inner) => {
                process(block, &mut inner, warnings);
                *slot = Value::Nested(Box::new(inner), format);
            }
            Err(err) => {
                tracing::warn!(block, plugin, key, %err, "nested payload left opaque");
                warnings.push(NestedDecodeWarning {
                    block: block.to_owned(),
                    path: format!("{plugin}/{index}/{key}"),
                });
            }
        }
    }
}

/// Navigate `plugin -> element -> key`. The element step accepts either a
/// list index or an integer map key; plugin payloads have been seen both
/// ways.
fn lookup_path<'v>(
    value: &'v mut Value,
    plugin: &str,
    index: usize,
    key: &str,
) -> Option<&'v mut Value> {
    let entry = value.get_mut(plugin)?;
    let element = match entry {
        Value::Array(..) | Value::Nested(..) => entry.get_index_mut(index),
        Value::Map(..) => entry.get_int_mut(index as i64),
        _ => None,
    }?;
    match element.get_mut(key)? {
        Value::Null => None,
        slot => Some(slot),
    }
}
