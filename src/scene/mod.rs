//! Scene documents: PNG-prefixed sequential field streams holding a
//! dictionary of studio objects plus scene-wide settings.
//!
//! Object records are a tagged sum over the studio's integer type codes;
//! each record's scalar fields live in an ordered `Value` map and its
//! children in a typed tree. `walk` traverses that tree depth-first with
//! an explicit stack, so pathologically deep scenes cannot overflow the
//! call stack.

pub mod emocre;
pub mod honeycome;
pub mod koikatu;
mod object;

use std::cmp::Ordering;

use crate::document::Document;
use crate::error::Error;
use crate::mpack::Value;

/// Studio object type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Character,
    Item,
    Light,
    Folder,
    Route,
    Camera,
    Text,
}

impl ObjectKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ObjectKind::Character),
            1 => Some(ObjectKind::Item),
            2 => Some(ObjectKind::Light),
            3 => Some(ObjectKind::Folder),
            4 => Some(ObjectKind::Route),
            5 => Some(ObjectKind::Camera),
            7 => Some(ObjectKind::Text),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ObjectKind::Character => 0,
            ObjectKind::Item => 1,
            ObjectKind::Light => 2,
            ObjectKind::Folder => 3,
            ObjectKind::Route => 4,
            ObjectKind::Camera => 5,
            ObjectKind::Text => 7,
        }
    }
}

/// Child objects of a record. Characters key their children by an integer
/// slot; items, folders, and routes carry a flat list; the rest have none.
#[derive(Debug, Default)]
pub enum Children {
    #[default]
    None,
    List(Vec<ObjectRecord>),
    Keyed(Vec<(i32, Vec<ObjectRecord>)>),
}

impl Children {
    pub fn is_none(&self) -> bool {
        matches!(self, Children::None)
    }

    /// Total number of records in this subtree level.
    pub fn len(&self) -> usize {
        match self {
            Children::None => 0,
            Children::List(list) => list.len(),
            Children::Keyed(groups) => groups.iter().map(|(_, list)| list.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One studio object.
#[derive(Debug)]
pub struct ObjectRecord {
    pub kind: ObjectKind,
    /// Scalar fields in wire order.
    pub data: Value,
    /// Embedded character card (Character records only).
    pub character: Option<Box<Document>>,
    pub children: Children,
}

impl ObjectRecord {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            data: Value::map(Vec::new()),
            character: None,
            children: Children::None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Depth-first pre-order traversal over an object dictionary.
///
/// Yields `(composite_key, record, depth)` where `composite_key` is the
/// dotted path of integer ids from the root: the top-level dictionary key,
/// then child-slot keys and list indices. A kind filter hides records but
/// still descends into their children. The iterator borrows the scene, so
/// it can be restarted by calling `walk` again.
pub struct Walk<'a> {
    stack: Vec<(String, &'a ObjectRecord, usize)>,
    filter: Option<ObjectKind>,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(objects: &'a [(i32, ObjectRecord)], filter: Option<ObjectKind>) -> Self {
        let mut stack = Vec::with_capacity(objects.len());
        for (key, record) in objects.iter().rev() {
            stack.push((key.to_string(), record, 0));
        }
        Self { stack, filter }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a ObjectRecord, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((key, record, depth)) = self.stack.pop() {
            match &record.children {
                Children::None => {}
                Children::List(list) => {
                    for (idx, child) in list.iter().enumerate().rev() {
                        self.stack.push((format!("{key}.{idx}"), child, depth + 1));
                    }
                }
                Children::Keyed(groups) => {
                    for (slot, list) in groups.iter().rev() {
                        for (idx, child) in list.iter().enumerate().rev() {
                            self.stack
                                .push((format!("{key}.{slot}.{idx}"), child, depth + 1));
                        }
                    }
                }
            }
            if self.filter.is_none() || self.filter == Some(record.kind) {
                return Some((key, record, depth));
            }
        }
        None
    }
}

/// Compare dotted version strings, shorter one padded with zeros.
pub(crate) fn compare_versions(version: &str, target: &str) -> Ordering {
    let parse = |s: &str| -> Vec<i64> {
        s.split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };
    let a = parse(version);
    let b = parse(target);
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

pub(crate) fn unknown_object_kind(code: i32) -> Error {
    Error::SchemaMismatch {
        context: "scene object",
        expected: "known object type code",
        found: code.to_string(),
    }
}

pub use object::{load_object, save_object};

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ObjectKind, children: Children) -> ObjectRecord {
        ObjectRecord {
            kind,
            data: Value::map(Vec::new()),
            character: None,
            children,
        }
    }

    fn sample_objects() -> Vec<(i32, ObjectRecord)> {
        // 10: folder -> [item -> [light], camera]
        // 20: character -> {0: [item]}
        let light = record(ObjectKind::Light, Children::None);
        let item = record(ObjectKind::Item, Children::List(vec![light]));
        let camera = record(ObjectKind::Camera, Children::None);
        let folder = record(ObjectKind::Folder, Children::List(vec![item, camera]));
        let char_item = record(ObjectKind::Item, Children::None);
        let character = record(
            ObjectKind::Character,
            Children::Keyed(vec![(0, vec![char_item])]),
        );
        vec![(10, folder), (20, character)]
    }

    #[test]
    fn walk_is_depth_first_preorder() {
        let objects = sample_objects();
        let keys: Vec<String> = Walk::new(&objects, None).map(|(k, _, _)| k).collect();
        assert_eq!(keys, ["10", "10.0", "10.0.0", "10.1", "20", "20.0.0"]);
    }

    #[test]
    fn walk_counts_every_node() {
        let objects = sample_objects();
        assert_eq!(Walk::new(&objects, None).count(), 6);
    }

    #[test]
    fn walk_filter_still_descends() {
        let objects = sample_objects();
        let items: Vec<String> = Walk::new(&objects, Some(ObjectKind::Item))
            .map(|(k, _, _)| k)
            .collect();
        // The nested item under the filtered-out folder is still found.
        assert_eq!(items, ["10.0", "20.0.0"]);
    }

    #[test]
    fn walk_reports_depth() {
        let objects = sample_objects();
        let depths: Vec<usize> = Walk::new(&objects, None).map(|(_, _, d)| d).collect();
        assert_eq!(depths, [0, 1, 2, 1, 0, 1]);
    }

    #[test]
    fn walk_is_restartable() {
        let objects = sample_objects();
        assert_eq!(Walk::new(&objects, None).count(), Walk::new(&objects, None).count());
    }

    #[test]
    fn deep_scene_does_not_recurse() {
        // 20k-deep folder chain; a recursive walk would blow the stack.
        let mut node = record(ObjectKind::Folder, Children::None);
        for _ in 0..20_000 {
            node = record(ObjectKind::Folder, Children::List(vec![node]));
        }
        let objects = vec![(1, node)];
        assert_eq!(Walk::new(&objects, None).count(), 20_001);
    }

    #[test]
    fn version_compare() {
        assert_eq!(compare_versions("1.0.3", "1.0.3"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.3", "1.0.4.1"), Ordering::Less);
        assert_eq!(compare_versions("1.1", "1.0.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.0.0"), Ordering::Equal);
    }
}
