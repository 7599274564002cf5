mod common;

use proptest::prelude::*;

use card_png::character::{Revision, SPEC_V2, SPEC_V3, Sheet};
use card_png::png::layout::HEADER_SIZE;
use card_png::png::{CharacterCard, PngData, Processor, RawCard, ScanMode};

fn base_png() -> PngData {
    PngData::from_png_bytes(common::png_bytes(6, 4)).expect("split fixture failed")
}

#[test]
fn sheet_round_trips_through_png_bytes() {
    let mut sheet = Sheet::default_for(Revision::V3);
    sheet.set_name("Lumi");
    sheet.data.insert("tags".to_string(), serde_json::json!(["quiet", "curious"]));

    let card = CharacterCard {
        png: base_png(),
        sheet: Some(sheet.clone()),
    };
    let bytes = card.encode().unwrap().to_bytes().unwrap();

    let restored = Processor::from_bytes(bytes).get().unwrap().decode().unwrap();
    assert_eq!(restored.sheet, Some(sheet));
    assert_eq!(restored.png, card.png);
}

#[test]
fn v2_json_in_png_decodes_to_v2_sheet() {
    let json = common::sheet_json("chara_card_v2", "2.0", "Tomo");
    let bytes = common::insert_after_header(&common::png_bytes(2, 2), &[common::card_chunk(b"chara\0", &json)]);

    let character = Processor::from_bytes(bytes).get().unwrap().decode().unwrap();
    let sheet = character.sheet.unwrap();
    assert_eq!(sheet.revision, Revision::V2);
    assert_eq!(sheet.spec, SPEC_V2);
    assert_eq!(sheet.name(), "Tomo");
}

#[test]
fn empty_payload_is_not_injected() {
    let png = base_png();
    let card = RawCard {
        png: png.clone(),
        raw_chara_data: Vec::new(),
        revision: Revision::V3,
    };

    let bytes = card.to_bytes().unwrap();
    assert_eq!(bytes, png.to_vec());
    assert!(!bytes.windows(4).any(|w| w == b"tEXt"));
}

#[test]
fn unknown_revision_is_written_with_the_v2_keyword() {
    let card = RawCard {
        png: base_png(),
        raw_chara_data: b"eyJzcGVjIjoiY2hhcmFfY2FyZF92MiJ9".to_vec(),
        revision: Revision(9),
    };
    let bytes = card.to_bytes().unwrap();
    assert_eq!(&bytes[HEADER_SIZE + 8..HEADER_SIZE + 14], b"chara\0");

    let rescanned = Processor::from_bytes(bytes).get().unwrap();
    assert_eq!(rescanned.revision, Revision::V2);
    assert_eq!(rescanned.raw_chara_data, card.raw_chara_data);
}

#[test]
fn converted_jpeg_can_carry_a_card() {
    let png = Processor::from_bytes(common::jpeg_bytes(8, 6)).get().unwrap().png;

    let mut sheet = Sheet::default_for(Revision::V3);
    sheet.set_name("Converted");
    let bytes = CharacterCard {
        png,
        sheet: Some(sheet),
    }
    .encode()
    .unwrap()
    .to_bytes()
    .unwrap();

    let mut processor = Processor::from_bytes(bytes);
    assert!(processor.is_scanning());
    assert_eq!(processor.image_size(), Some((8, 6)));

    let sheet = processor.get().unwrap().decode().unwrap().sheet.unwrap();
    assert_eq!(sheet.spec, SPEC_V3);
    assert_eq!(sheet.name(), "Converted");
}

#[test]
fn replacing_payload_keeps_a_single_card_chunk() {
    let old = common::sheet_json("chara_card_v2", "2.0", "Old");
    let bytes = common::insert_after_header(&common::png_bytes(3, 3), &[common::card_chunk(b"chara\0", &old)]);

    let mut card = Processor::from_bytes(bytes).last_version().get().unwrap();
    let mut sheet = card.decode().unwrap().sheet.unwrap();
    sheet.set_name("New");
    sheet.set_revision(Revision::V3);
    card = CharacterCard {
        png: card.png,
        sheet: Some(sheet),
    }
    .encode()
    .unwrap();

    let bytes = card.to_bytes().unwrap();
    let count = bytes.windows(4).filter(|w| *w == b"tEXt").count();
    assert_eq!(count, 1);

    let rescanned = Processor::from_bytes(bytes).last_version().get().unwrap();
    assert_eq!(rescanned.revision, Revision::V3);
    assert_eq!(rescanned.decode().unwrap().sheet.unwrap().name(), "New");
}

#[test]
fn placeholder_scales_down_and_keeps_payload() {
    let mut card = RawCard::placeholder(32).unwrap();
    card.raw_chara_data = b"e30=".to_vec();
    card.revision = Revision::V2;

    card.png.scale_down(8, image::imageops::FilterType::Nearest).unwrap();
    let rescanned = Processor::from_bytes(card.to_bytes().unwrap()).get().unwrap();

    assert_eq!((rescanned.png.width(), rescanned.png.height()), (8, 8));
    assert_eq!(rescanned.raw_chara_data, b"e30=");
}

fn revision_strategy() -> impl Strategy<Value = Revision> {
    prop_oneof![Just(Revision::V2), Just(Revision::V3)]
}

fn mode_strategy() -> impl Strategy<Value = ScanMode> {
    prop_oneof![
        Just(ScanMode::FIRST),
        Just(ScanMode::LAST_VERSION),
        Just(ScanMode::LAST_LONGEST)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn injected_payload_is_recovered_by_every_mode(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        revision in revision_strategy(),
        mode in mode_strategy(),
    ) {
        use base64::{Engine as _, engine::general_purpose};

        let png = base_png();
        let card = RawCard {
            png: png.clone(),
            raw_chara_data: general_purpose::STANDARD.encode(&payload).into_bytes(),
            revision,
        };

        let rescanned = Processor::from_bytes(card.to_bytes().unwrap()).scan_mode(mode).get().unwrap();
        prop_assert_eq!(&rescanned.png, &png);
        prop_assert_eq!(&rescanned.raw_chara_data, &card.raw_chara_data);
        prop_assert_eq!(rescanned.revision, revision);
        prop_assert_eq!(rescanned.to_raw_json().unwrap().raw_json_data, payload);
    }
}
