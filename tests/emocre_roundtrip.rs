mod common;

use charafile::cursor::Writer;
use charafile::scene::emocre::{EmocreMap, EmocreScene, MapNodeType};
use charafile::Variant;

use common::*;

fn write_node_base(w: &mut Writer, dickey: i32) {
    w.write_i32(dickey);
    w.write_i8_prefixed(br#"{"x":0.0,"y":0.0,"z":0.0}"#);
    w.write_i8_prefixed(br#"{"x":0.0,"y":0.0,"z":0.0}"#);
    w.write_i8_prefixed(br#"{"x":1.0,"y":1.0,"z":1.0}"#);
    w.write_i32(0);
    w.write_i8(1);
}

fn write_item_node(w: &mut Writer, dickey: i32) {
    w.write_i32(1); // node type
    write_node_base(w, dickey);
    w.write_i32(2); // package
    w.write_i32(14); // no
    w.write_f32(1.0);
    for _ in 0..8 {
        w.write_i8_prefixed(br#"{"r":1.0,"g":1.0,"b":1.0,"a":1.0}"#);
    }
    for _ in 0..3 {
        w.write_i32(0);
        w.write_i8(1);
        w.write_i8_prefixed(br#"{"x":0.0,"y":0.0,"z":1.0,"w":1.0}"#);
        w.write_f32(0.0);
    }
    w.write_f32(1.0); // alpha
    w.write_i8_prefixed(br#"{"r":0.5,"g":0.5,"b":0.5,"a":1.0}"#);
    w.write_f32(1.0);
    w.write_i8_prefixed(br#"{"r":1.0,"g":1.0,"b":1.0,"a":1.0}"#);
    w.write_f32(0.0);
    w.write_f32(0.0);
    // Pillar sub-node, stored bare.
    w.write_i32(99);
    w.write_i8_prefixed(br#"{"x":0.0,"y":0.0,"z":0.0}"#);
    w.write_i8_prefixed(br#"{"x":0.0,"y":0.0,"z":0.0}"#);
    w.write_i8_prefixed(br#"{"x":1.0,"y":1.0,"z":1.0}"#);
    w.write_i8(0); // sielding
    w.write_i32(0); // children
}

fn emocre_map_bytes(with_png: bool) -> Vec<u8> {
    let mut w = Writer::new();
    if with_png {
        w.write_bytes(&tiny_png(6));
    }
    w.write_i32(200);
    w.write_i8_prefixed("\u{3010}EroMakeMap\u{3011}".as_bytes());
    w.write_i8_prefixed(b"0.0.7");
    w.write_i8_prefixed(b"map-user");
    w.write_i8_prefixed(b"map-data");
    w.write_i32(1);
    w.write_i32(2000);
    w.write_i8_prefixed("公園".as_bytes());
    w.write_i32(0); // language
    w.write_i32(2); // objects_num
    w.write_i8(0); // map_scene

    w.write_i32(2); // node count
    write_item_node(&mut w, 1);
    // Folder node holding one item.
    w.write_i32(3);
    write_node_base(&mut w, 2);
    w.write_varint_prefixed(b"props");
    w.write_i32(1);
    write_item_node(&mut w, 3);

    w.write_i8_prefixed(b"1.0");
    w.write_i8_prefixed(br#"{"x":0.0,"y":1.0,"z":-3.0}"#);
    w.write_i8_prefixed(br#"{"x":10.0,"y":0.0,"z":0.0}"#);
    w.write_f32(4.0);
    w.write_f32(23.0);
    w.write_f32(1.0);

    w.write_i8_prefixed(br#"{"r":1.0,"g":1.0,"b":1.0,"a":1.0}"#);
    w.write_f32(1.0);
    w.write_f32(40.0);
    w.write_f32(-20.0);
    w.write_i8(1);

    w.write_i32(7); // map_no
    w.write_i32(0); // map_type
    w.into_bytes()
}

#[test]
fn emocre_map_roundtrip() {
    let bytes = emocre_map_bytes(true);
    let map = EmocreMap::from_bytes(&bytes).unwrap();
    assert_eq!(map.variant(), Variant::EmocreMap);
    assert_eq!(map.name, "公園");
    assert_eq!(map.nodes.len(), 2);
    assert_eq!(map.nodes[0].node_type, MapNodeType::ITEM);
    assert!(map.nodes[0].piller.is_some());
    assert_eq!(map.nodes[1].node_type, MapNodeType::FOLDER);
    assert_eq!(map.nodes[1].children.len(), 1);
    assert_eq!(map.map_no, 7);
    assert_eq!(map.save_bytes().unwrap(), bytes);
}

#[test]
fn emocre_scene_loads_embedded_documents() {
    let mut w = Writer::new();
    w.write_bytes(&tiny_png(9));
    w.write_i32(200);
    w.write_i8_prefixed("\u{3010}EroMakeHScene\u{3011}".as_bytes());
    w.write_i8_prefixed(b"0.0.3");
    w.write_i32(0); // language
    w.write_i8_prefixed(b"scene-user");
    w.write_i8_prefixed(b"scene-data");
    w.write_i8_prefixed("初デート".as_bytes());
    w.write_i8_prefixed("コメント".as_bytes());
    w.write_i32(5); // defaultbgm
    w.write_i32(2); // tags
    w.write_i32(10);
    w.write_i32(11);
    w.write_i32(1); // males
    w.write_i32(1); // females
    w.write_i8(0);
    w.write_i8(1);
    w.write_i8(0);
    w.write_i32(1); // charapackages
    w.write_i32(1000);
    w.write_i32(0); // mappackages
    w.write_i8(0); // uses_mapset
    w.write_i32(12); // mapobjects
    w.write_i32(1); // chara count
    w.write_bytes(&emocre_card(&default_koikatu_blocks()));
    w.write_i32(1); // map count
    w.write_bytes(&emocre_map_bytes(false));
    let bytes = w.into_bytes();

    let scene = EmocreScene::from_bytes(&bytes).unwrap();
    assert_eq!(scene.variant(), Variant::EmocreScene);
    assert_eq!(scene.title, "初デート");
    assert_eq!(scene.tags, [10, 11]);
    assert_eq!(scene.charas.len(), 1);
    assert_eq!(scene.charas[0].variant(), Variant::EmotionCreators);
    assert_eq!(
        scene.charas[0]["Parameter"]["nickname"].as_str(),
        Some("かずのん")
    );
    assert_eq!(scene.maps.len(), 1);
    assert_eq!(scene.maps[0].name, "公園");
    assert!(scene.maps[0].image.is_none());
}
