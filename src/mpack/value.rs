use base64::Engine as _;

/// On-disk representation of an integer value.
///
/// `Auto` is what programmatically built values carry; the encoder then
/// picks the shortest form that fits, which is what the game serializers
/// produce. Every decoded value records the exact tag it was read from so
/// re-encoding reproduces the input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntFormat {
    Auto,
    FixPos,
    FixNeg,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

/// On-disk representation of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrFormat {
    Auto,
    Fix,
    Str8,
    Str16,
    Str32,
}

/// On-disk representation of a byte string.
///
/// The `FixStr`/`Str*` variants cover byte strings that arrived under a
/// string tag but failed UTF-8 validation; they re-encode under the same
/// string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinFormat {
    Auto,
    Bin8,
    Bin16,
    Bin32,
    FixStr,
    Str8,
    Str16,
    Str32,
}

/// Length-tag class of an array or map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqFormat {
    Auto,
    Fix,
    Len16,
    Len32,
}

/// On-disk representation of an extension value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtFormat {
    Auto,
    Fix1,
    Fix2,
    Fix4,
    Fix8,
    Fix16,
    Ext8,
    Ext16,
    Ext32,
}

/// A decoded object-codec value.
///
/// Maps are ordered pair lists, never hashed: key order is part of the
/// on-disk byte sequence. Keys may be any value (integer keys are common
/// in plugin payloads).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64, IntFormat),
    UInt(u64, IntFormat),
    F32(f32),
    F64(f64),
    Str(String, StrFormat),
    Bin(Vec<u8>, BinFormat),
    Array(Vec<Value>, SeqFormat),
    Map(Vec<(Value, Value)>, SeqFormat),
    Ext(i8, Vec<u8>, ExtFormat),
    /// A byte string whose content decoded as an independent value graph.
    /// The memo keeps the tag class of the byte string it replaces.
    Nested(Box<Value>, BinFormat),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into(), StrFormat::Auto)
    }

    pub fn int(v: i64) -> Self {
        Value::Int(v, IntFormat::Auto)
    }

    pub fn uint(v: u64) -> Self {
        Value::UInt(v, IntFormat::Auto)
    }

    pub fn bin(b: impl Into<Vec<u8>>) -> Self {
        Value::Bin(b.into(), BinFormat::Auto)
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(items, SeqFormat::Auto)
    }

    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        Value::Map(pairs, SeqFormat::Auto)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v, _) => Some(*v),
            Value::UInt(v, _) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v, _) => Some(*v),
            Value::Int(v, _) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s, _) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b, _) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items, _) => Some(items),
            Value::Nested(inner, _) => inner.as_array(),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items, _) => Some(items),
            Value::Nested(inner, _) => inner.as_array_mut(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(pairs, _) => Some(pairs),
            Value::Nested(inner, _) => inner.as_map(),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Vec<(Value, Value)>> {
        match self {
            Value::Map(pairs, _) => Some(pairs),
            Value::Nested(inner, _) => inner.as_map_mut(),
            _ => None,
        }
    }

    /// Look up a string-keyed map entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.as_map_mut()?
            .iter_mut()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Look up an integer-keyed map entry.
    pub fn get_int(&self, key: i64) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_i64() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn get_int_mut(&mut self, key: i64) -> Option<&mut Value> {
        self.as_map_mut()?
            .iter_mut()
            .find(|(k, _)| k.as_i64() == Some(key))
            .map(|(_, v)| v)
    }

    /// Look up an array element.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_array()?.get(index)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.as_array_mut()?.get_mut(index)
    }

    /// Replace a string-keyed map entry in place, or append it.
    ///
    /// An existing key keeps its position (and so its on-disk order); a new
    /// key goes to the end and the map re-encodes with a widened length
    /// class if the fixed one no longer fits.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        let Some(pairs) = self.as_map_mut() else {
            return false;
        };
        if let Some(slot) = pairs
            .iter_mut()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
        {
            *slot = value;
        } else {
            pairs.push((Value::str(key), value));
        }
        true
    }

    /// Remove a string-keyed map entry. Returns the removed value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pairs = self.as_map_mut()?;
        let idx = pairs.iter().position(|(k, _)| k.as_str() == Some(key))?;
        Some(pairs.remove(idx).1)
    }

    /// Map this value onto `serde_json::Value` for export.
    ///
    /// Integers and floats widen to JSON numbers (non-finite floats become
    /// null). Non-string map keys are stringified. Extension values export
    /// as `[code, base64]` pairs.
    pub fn to_json(&self, bytes: BytesMode) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Int(v, _) => J::from(*v),
            Value::UInt(v, _) => J::from(*v),
            Value::F32(v) => serde_json::Number::from_f64(*v as f64)
                .map(J::Number)
                .unwrap_or(J::Null),
            Value::F64(v) => serde_json::Number::from_f64(*v)
                .map(J::Number)
                .unwrap_or(J::Null),
            Value::Str(s, _) => J::String(s.clone()),
            Value::Bin(b, _) => bytes_to_json(b, bytes),
            Value::Array(items, _) => {
                J::Array(items.iter().map(|v| v.to_json(bytes)).collect())
            }
            Value::Map(pairs, _) => {
                let mut out = serde_json::Map::new();
                for (k, v) in pairs {
                    if bytes == BytesMode::Omit && matches!(v, Value::Bin(..)) {
                        continue;
                    }
                    out.insert(json_key(k), v.to_json(bytes));
                }
                J::Object(out)
            }
            Value::Ext(code, data, _) => J::Array(vec![
                J::from(*code),
                bytes_to_json(data, bytes),
            ]),
            Value::Nested(inner, _) => inner.to_json(bytes),
        }
    }
}

/// How byte strings appear in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesMode {
    /// Base64-encode.
    Base64,
    /// Replace with a short `<N bytes>` marker (prettify).
    Summarize,
    /// Drop map entries holding bytes, null elsewhere.
    Omit,
}

fn bytes_to_json(b: &[u8], mode: BytesMode) -> serde_json::Value {
    match mode {
        BytesMode::Base64 => {
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        BytesMode::Summarize => serde_json::Value::String(format!("<{} bytes>", b.len())),
        BytesMode::Omit => serde_json::Value::Null,
    }
}

fn json_key(key: &Value) -> String {
    match key {
        Value::Str(s, _) => s.clone(),
        Value::Int(v, _) => v.to_string(),
        Value::UInt(v, _) => v.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

impl std::ops::Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key)
            .unwrap_or_else(|| panic!("no map entry for key {key:?}"))
    }
}

impl std::ops::Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.get_index(index)
            .unwrap_or_else(|| panic!("array index {index} out of bounds"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_set_preserves_position() {
        let mut v = Value::map(vec![
            (Value::str("a"), Value::int(1)),
            (Value::str("b"), Value::int(2)),
        ]);
        v.set("a", Value::str("x"));
        let pairs = v.as_map().unwrap();
        assert_eq!(pairs[0].0.as_str(), Some("a"));
        assert_eq!(pairs[0].1.as_str(), Some("x"));
        v.set("c", Value::int(3));
        assert_eq!(v.as_map().unwrap().len(), 3);
        assert_eq!(v.as_map().unwrap()[2].0.as_str(), Some("c"));
    }

    #[test]
    fn int_keyed_lookup() {
        let v = Value::map(vec![(Value::int(7), Value::str("seven"))]);
        assert_eq!(v.get_int(7).and_then(Value::as_str), Some("seven"));
        assert!(v.get("7").is_none());
    }

    #[test]
    fn json_export_modes() {
        let v = Value::map(vec![
            (Value::str("data"), Value::bin(vec![1, 2, 3])),
            (Value::str("n"), Value::int(5)),
        ]);
        let full = v.to_json(BytesMode::Base64);
        assert_eq!(full["data"], serde_json::json!("AQID"));
        let omitted = v.to_json(BytesMode::Omit);
        assert!(omitted.get("data").is_none());
        assert_eq!(omitted["n"], serde_json::json!(5));
    }
}
