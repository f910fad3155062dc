mod common;

use charafile::cursor::Writer;
use charafile::mpack::{self, Value};
use charafile::scene::honeycome::HoneycomeScene;
use charafile::scene::koikatu::KoikatuScene;
use charafile::ObjectKind;

use common::*;

fn write_vec3(w: &mut Writer, x: f32, y: f32, z: f32) {
    w.write_f32(x);
    w.write_f32(y);
    w.write_f32(z);
}

/// Shared object prelude: dicKey, transform, treeState, visible.
fn write_object_base(w: &mut Writer, dic_key: i32) {
    w.write_i32(dic_key);
    write_vec3(w, 0.0, 1.0, 0.0);
    write_vec3(w, 0.0, 0.0, 0.0);
    write_vec3(w, 1.0, 1.0, 1.0);
    w.write_i32(0);
    w.write_i8(1);
}

fn write_light(w: &mut Writer, dic_key: i32) {
    w.write_i32(2); // type
    write_object_base(w, dic_key);
    w.write_i32(0);
    for channel in [1.0f32, 0.9, 0.8, 1.0] {
        w.write_f32(channel);
    }
    w.write_f32(1.2);
    w.write_f32(50.0);
    w.write_f32(30.0);
    w.write_i8(1);
    w.write_i8(1);
    w.write_i8(0);
}

fn write_camera(w: &mut Writer, dic_key: i32, name: &str) {
    w.write_i32(5); // type
    write_object_base(w, dic_key);
    w.write_varint_prefixed(name.as_bytes());
    w.write_i8(1);
}

fn write_folder(w: &mut Writer, dic_key: i32, name: &str, child_count: i32) {
    w.write_i32(3); // type
    write_object_base(w, dic_key);
    w.write_varint_prefixed(name.as_bytes());
    w.write_i32(child_count);
}

fn write_camera_data(w: &mut Writer) {
    w.write_i32(2);
    write_vec3(w, 0.0, 1.0, -3.0);
    write_vec3(w, 10.0, 0.0, 0.0);
    write_vec3(w, 0.0, 0.0, 2.5);
    w.write_f32(23.0);
}

fn write_light_base(w: &mut Writer) {
    w.write_varint_prefixed(br#"{"r":1.0,"g":1.0,"b":1.0,"a":1.0}"#);
    w.write_f32(1.0);
    w.write_f32(30.0);
    w.write_f32(-20.0);
    w.write_i8(1);
}

/// A complete 1.1.2.1 scene: a folder holding a camera, plus a light.
fn koikatu_scene_bytes() -> Vec<u8> {
    let mut w = Writer::new();
    w.write_bytes(&tiny_png(7));
    w.write_varint_prefixed(b"1.1.2.1");

    w.write_i32(2); // object count
    w.write_i32(10);
    write_folder(&mut w, 10, "stage", 1);
    write_camera(&mut w, 11, "cam-main");
    w.write_i32(20);
    write_light(&mut w, 20);

    // Map + ambience settings.
    w.write_i32(3);
    write_vec3(&mut w, 0.0, 0.0, 0.0);
    write_vec3(&mut w, 0.0, 0.0, 0.0);
    write_vec3(&mut w, 1.0, 1.0, 1.0);
    w.write_i32(0); // sunLightType
    w.write_i8(1); // mapOption
    w.write_i32(-1); // aceNo
    w.write_f32(0.5); // aceBlend
    w.write_i8(1); // enableAOE
    w.write_i8_prefixed(br#"{"r":0.7,"g":0.7,"b":0.7,"a":1.0}"#);
    w.write_f32(0.1); // aoeRadius
    w.write_i8(1); // enableBloom
    w.write_f32(0.4);
    w.write_f32(0.8);
    w.write_f32(0.6); // bloomThreshold
    w.write_i8(0); // enableDepth
    w.write_f32(0.95);
    w.write_f32(0.6);
    w.write_i8(1); // enableVignette
    w.write_i8(0); // enableFog
    w.write_i8_prefixed(br#"{"r":0.5,"g":0.7,"b":0.8,"a":1.0}"#);
    w.write_f32(1.0);
    w.write_f32(0.0);
    w.write_i8(0); // enableSunShafts
    w.write_i8_prefixed(br#"{"r":0.5,"g":0.5,"b":0.5,"a":1.0}"#);
    w.write_i8_prefixed(br#"{"r":1.0,"g":1.0,"b":1.0,"a":1.0}"#);
    w.write_i32(-1); // sunCaster
    w.write_i8(1); // enableShadow
    w.write_i8(0); // faceNormal
    w.write_i8(0); // faceShadow
    w.write_f32(0.0); // lineColorG
    w.write_i8_prefixed(br#"{"r":0.5,"g":0.5,"b":0.5,"a":1.0}"#);
    w.write_f32(0.0); // lineWidthG
    w.write_i32(0); // rampG
    w.write_f32(0.0); // ambientShadowG
    w.write_i32(0); // shaderType
    let sky = mpack::encode(&Value::map(vec![
        (Value::str("Enable"), Value::Bool(false)),
        (Value::str("Pattern"), Value::uint(0)),
    ]));
    w.write_i32_prefixed(&sky);

    write_camera_data(&mut w);
    for _ in 0..10 {
        write_camera_data(&mut w);
    }
    write_light_base(&mut w); // charaLight
    write_light_base(&mut w); // mapLight base
    w.write_i32(0); // mapLight type

    for _ in 0..2 {
        // bgmCtrl / envCtrl
        w.write_i32(0);
        w.write_i32(0);
        w.write_i8(0);
    }
    w.write_i32(0); // outside repeat
    w.write_varint_prefixed(b""); // fileName
    w.write_i8(0); // play

    w.write_i8_prefixed(b"");
    w.write_i8_prefixed(b"");
    w.write_varint_prefixed("\u{3010}KStudio\u{3011}".as_bytes());
    w.into_bytes()
}

#[test]
fn koikatu_scene_roundtrip() {
    let bytes = koikatu_scene_bytes();
    let scene = KoikatuScene::from_bytes(&bytes).unwrap();
    assert_eq!(scene.version, "1.1.2.1");
    assert_eq!(scene.objects.len(), 2);
    assert_eq!(scene.save_bytes().unwrap(), bytes);
}

#[test]
fn koikatu_scene_walk_counts_and_filters() {
    let bytes = koikatu_scene_bytes();
    let scene = KoikatuScene::from_bytes(&bytes).unwrap();

    let all: Vec<String> = scene.walk(None).map(|(k, _, _)| k).collect();
    assert_eq!(all, ["10", "10.0", "20"]);

    let cameras: Vec<(String, usize)> = scene
        .walk(Some(ObjectKind::Camera))
        .map(|(k, _, d)| (k, d))
        .collect();
    assert_eq!(cameras, [("10.0".to_string(), 1)]);

    let lights: Vec<&str> = scene
        .walk(Some(ObjectKind::Light))
        .map(|(_, r, _)| r.get("no").unwrap().as_i64().unwrap())
        .map(|_| "light")
        .collect();
    assert_eq!(lights.len(), 1);
}

#[test]
fn koikatu_scene_mod_tail_roundtrip() {
    let mut bytes = koikatu_scene_bytes();
    let mut tail = Writer::new();
    tail.write_i8_prefixed(b"ModMarker");
    tail.write_i32(3);
    tail.write_i32_prefixed(&mpack::encode(&Value::map(vec![(
        Value::str("plugin"),
        Value::str("data"),
    )])));
    bytes.extend_from_slice(&tail.into_bytes());

    let scene = KoikatuScene::from_bytes(&bytes).unwrap();
    let mods = scene.mod_section.as_ref().expect("mod section");
    assert_eq!(mods.header, "ModMarker");
    assert_eq!(mods.unknown, 3);
    assert_eq!(scene.save_bytes().unwrap(), bytes);
}

#[test]
fn scene_object_mutation_survives_resave() {
    let bytes = koikatu_scene_bytes();
    let mut scene = KoikatuScene::from_bytes(&bytes).unwrap();
    scene.objects[0]
        .1
        .data
        .set("name", Value::str("renamed"));
    let out = scene.save_bytes().unwrap();
    let reloaded = KoikatuScene::from_bytes(&out).unwrap();
    assert_eq!(
        reloaded.objects[0].1.get("name").unwrap().as_str(),
        Some("renamed")
    );
}

/// Honeycome scene: folder + camera objects, opaque tail blocks.
fn honeycome_scene_bytes() -> Vec<u8> {
    let mut w = Writer::new();
    w.write_bytes(&tiny_png(8));
    w.write_varint_prefixed(b"1.0.0");
    w.write_varint_prefixed(b"hc-user");
    w.write_varint_prefixed(b"hc-data");
    w.write_varint_prefixed("机と椅子".as_bytes());
    w.write_i32(1);
    w.write_i32_prefixed(&[0x11; 32]);

    w.write_i32(1); // object count
    w.write_i32(5); // dictionary key
    w.write_i32(3); // folder
    write_object_base(&mut w, 5);
    w.write_varint_prefixed(b"root");
    w.write_i32(1); // one child
    w.write_i32(5); // camera
    write_object_base(&mut w, 6);
    w.write_varint_prefixed(b"cam");
    w.write_i8(1);

    for i in 0..10u8 {
        w.write_i32_prefixed(&[i; 4]);
    }
    w.write_varint_prefixed(b"frame.png");
    w.write_i32_prefixed(&[0x22; 8]);
    w.write_varint_prefixed("\u{3010}DigitalCraft\u{3011}".as_bytes());
    w.into_bytes()
}

#[test]
fn honeycome_scene_roundtrip_and_walk() {
    let bytes = honeycome_scene_bytes();
    let scene = HoneycomeScene::from_bytes(&bytes).unwrap();
    assert_eq!(scene.title, "机と椅子");
    assert_eq!(scene.user_id, "hc-user");
    assert_eq!(scene.tail_blocks.len(), 10);
    assert_eq!(scene.footer_marker, "\u{3010}DigitalCraft\u{3011}");

    let keys: Vec<String> = scene.walk(None).map(|(k, _, _)| k).collect();
    assert_eq!(keys, ["5", "5.0"]);
    assert_eq!(scene.walk(Some(ObjectKind::Folder)).count(), 1);

    assert_eq!(scene.save_bytes().unwrap(), bytes);
}

#[test]
fn honeycome_scene_rejects_bad_footer() {
    let mut bytes = honeycome_scene_bytes();
    let marker = "\u{3010}DigitalCraft\u{3011}".as_bytes();
    let pos = bytes
        .windows(marker.len())
        .rposition(|w| w == marker)
        .unwrap();
    bytes[pos + 3] ^= 0xFF;
    assert!(HoneycomeScene::from_bytes(&bytes).is_err());
}
