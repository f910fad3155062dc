mod common;

use charafile::cursor::Writer;
use charafile::mpack::{self, Value};
use charafile::{KoikatuSave, SummerVacationSave};

use common::*;

/// One PNG-less Koikatu card inside a character slot.
fn write_chara_slot(w: &mut Writer, callname: &str) {
    w.write_i32(1); // chara_class
    w.write_i32(7); // class_idx
    w.write_bytes(&koikatu_card(false, &default_koikatu_blocks()));
    w.write_i32(0); // nametype
    w.write_i32(2); // callid
    w.write_varint_prefixed(callname.as_bytes());
}

fn write_heroine(w: &mut Writer) {
    write_chara_slot(w, "先輩");
    // favor .. menstruction: 13 slots, widths per the stat table.
    for value in [50i32, 0, 0] {
        w.write_i32(value);
    }
    for flag in [0i8, 1, 0] {
        w.write_i8(flag);
    }
    w.write_i32(-1);
    w.write_i8(0);
    w.write_i8(0);
    for value in [3i32, 0, 12] {
        w.write_i32(value);
    }
    w.write_i8(0);
    // h_exps / massage_exps
    w.write_i32(2);
    w.write_f32(0.5);
    w.write_f32(1.5);
    w.write_i32(0);
    // vars2
    w.write_i8(1);
    w.write_i8(1);
    w.write_f32(0.0);
    w.write_f32(0.0);
    w.write_i8(0);
    w.write_i32(0);
    w.write_i32(0);
    // talk_events
    w.write_i32(1);
    w.write_i32(42);
    w.write_bytes(&[7u8; 39]);
    w.write_i8(1); // conffessed
    // motionspeeds
    w.write_i32(1);
    w.write_varint_prefixed(b"walk");
    w.write_f32(1.25);
    // vars3
    w.write_f32(0.0);
    w.write_i32(3);
    w.write_i8(0);
    w.write_i32(60);
}

fn koikatu_save_bytes() -> Vec<u8> {
    let mut w = Writer::new();
    w.write_varint_prefixed(b"1.0.3");
    w.write_varint_prefixed("私立学園".as_bytes());
    w.write_i32(2); // emblem
    w.write_i8(1); // opening
    w.write_i32(14); // week
    write_chara_slot(&mut w, "俺");
    // player vars
    for value in [1i32, 0, 0, 5, 80, 70, 30] {
        w.write_i32(value);
    }
    w.write_f32(1234.5);
    w.write_i32(0);
    w.write_i32(360);
    // heroines
    w.write_i32(1);
    write_heroine(&mut w);
    // met_personality
    w.write_i32(2);
    w.write_i32(0);
    w.write_i32(5);
    // club data
    w.write_i32(100);
    w.write_i32(1);
    w.write_i32(3); // club key
    w.write_i32(2);
    w.write_i32(11);
    w.write_i32(12);
    w.write_i32(1);
    w.write_i32(9);
    // school vars
    for value in [0i32, 0] {
        w.write_i32(value);
    }
    w.write_f32(0.5);
    for value in [2i32, 500, 1, 0] {
        w.write_i32(value);
    }
    // action controls
    w.write_i32(1);
    w.write_i32(0);
    w.write_i32(1);
    w.write_i32(2);
    w.write_i32(4);
    w.write_i32(5);
    w.write_i32(6);
    w.write_i32(7);
    w.into_bytes()
}

#[test]
fn koikatu_save_roundtrip() {
    let bytes = koikatu_save_bytes();
    let save = KoikatuSave::from_bytes(&bytes).unwrap();
    assert_eq!(save.school_name, "私立学園");
    assert_eq!(save.week, 14);
    assert_eq!(save.heroines.len(), 1);
    assert_eq!(
        save.player.chara["Parameter"]["nickname"].as_str(),
        Some("かずのん")
    );
    assert_eq!(
        save.heroines[0].stats.get("favor").unwrap().as_i64(),
        Some(50)
    );
    assert_eq!(save.heroines[0].talk_temper.len(), 39);
    assert_eq!(save.save_bytes().unwrap(), bytes);
}

#[test]
fn koikatu_save_embedded_card_edit() {
    let bytes = koikatu_save_bytes();
    let mut save = KoikatuSave::from_bytes(&bytes).unwrap();
    save.player
        .chara
        .block_mut("Parameter")
        .unwrap()
        .set("nickname", Value::str("店長"));
    let out = save.save_bytes().unwrap();
    let reloaded = KoikatuSave::from_bytes(&out).unwrap();
    assert_eq!(
        reloaded.player.chara["Parameter"]["nickname"].as_str(),
        Some("店長")
    );
    // The heroine card was untouched.
    assert_eq!(
        reloaded.heroines[0].slot.chara["Parameter"]["nickname"].as_str(),
        Some("かずのん")
    );
}

fn sv_card() -> Vec<u8> {
    illgames_card(
        "\u{3010}SVChara\u{3011}",
        &[("GameParameter_SV", "0.0.0", status_body())],
    )
}

fn summer_save_bytes(entries: &[(bool, Vec<u8>)]) -> Vec<u8> {
    let meta = mpack::encode(&Value::map(vec![
        (Value::str("title"), Value::str("夏休み")),
        (Value::str("slot"), Value::uint(1)),
    ]));

    let mut chara_section = Writer::new();
    let mut player_offset = 0u64;
    let mut before_player = true;
    for (index, (is_player, card)) in entries.iter().enumerate() {
        let detail = mpack::encode(&Value::map(vec![(
            Value::str("charasGameParam"),
            Value::map(vec![
                (Value::str("Index"), Value::uint(index as u64)),
                (Value::str("isPC"), Value::Bool(*is_player)),
            ]),
        )]));
        let entry_len = 4 + detail.len() + card.len();
        if *is_player {
            before_player = false;
        }
        if before_player {
            player_offset += 4 + entry_len as u64;
        }
        chara_section.write_u32(entry_len as u32);
        chara_section.write_i32_prefixed(&detail);
        chara_section.write_bytes(card);
    }
    let chara_bytes = chara_section.into_bytes();

    let data_length = meta.len() as u64 + chara_bytes.len() as u64 + 16;
    let mut w = Writer::new();
    w.write_i32_prefixed(&meta);
    w.write_u64(data_length);
    w.write_u32(entries.len() as u32);
    w.write_bytes(&chara_bytes);
    w.write_u32(1);
    w.write_u64(meta.len() as u64 + 16 + player_offset);
    w.into_bytes()
}

#[test]
fn summer_save_roundtrip() {
    let bytes = summer_save_bytes(&[(false, sv_card()), (true, sv_card())]);
    let save = SummerVacationSave::from_bytes(&bytes).unwrap();
    assert_eq!(save.entries.len(), 2);
    assert!(!save.entries[0].is_player());
    assert!(save.entries[1].is_player());
    assert_eq!(save.meta.get("title").unwrap().as_str(), Some("夏休み"));
    assert_eq!(save.save_bytes().unwrap(), bytes);
}

#[test]
fn summer_save_recomputes_offsets_after_edit() {
    let bytes = summer_save_bytes(&[(false, sv_card()), (true, sv_card())]);
    let mut save = SummerVacationSave::from_bytes(&bytes).unwrap();
    // Grow the first (non-player) card; the player offset must move.
    save.entries[0]
        .chara
        .block_mut("Parameter")
        .unwrap()
        .set("nickname", Value::str("ずっとながいあだな"));
    let out = save.save_bytes().unwrap();
    assert_ne!(out.len(), bytes.len());
    let reloaded = SummerVacationSave::from_bytes(&out).unwrap();
    assert_eq!(
        reloaded.entries[0].chara["Parameter"]["nickname"].as_str(),
        Some("ずっとながいあだな")
    );
    assert!(reloaded.entries[1].is_player());
}
