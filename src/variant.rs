use crate::blocks::BlockCodec;

/// Every known document flavor across the game family.
///
/// Card variants are detected from the bracketed magic string in the file
/// header; scene and save containers have no leading magic and are opened
/// through their own entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Koikatu,
    EmotionCreators,
    Honeycome,
    SummerVacationChara,
    SummerVacationSave,
    KoikatuSave,
    EmocreMap,
    EmocreScene,
    KoikatuScene,
    HoneycomeScene,
    Aicomi,
}

/// Wire shape of one card header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `i32le`
    I32,
    /// `i8` length + UTF-8 bytes
    TextI8,
    /// `i32le` length + raw bytes
    BytesI32,
    /// `i32le` count + that many `i32le`
    I32List,
}

/// A decoded header field.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i32),
    Text(String),
    Bytes(Vec<u8>),
    IntList(Vec<i32>),
}

/// Card header fields following product number, magic, and version.
const TAIL_FACE_IMAGE: &[(&str, FieldKind)] = &[("face_image", FieldKind::BytesI32)];

const TAIL_EMOCRE: &[(&str, FieldKind)] = &[
    ("language", FieldKind::I32),
    ("userid", FieldKind::TextI8),
    ("dataid", FieldKind::TextI8),
    ("packages", FieldKind::I32List),
];

/// Magic prefixes in match priority order. First hit wins; the Koikatu
/// entry is a prefix so the Steam/Sunshine suffixed magics land there too.
const MAGIC_TABLE: &[(&str, Variant)] = &[
    ("\u{3010}KoiKatuChara", Variant::Koikatu),
    ("\u{3010}EroMakeChara\u{3011}", Variant::EmotionCreators),
    ("\u{3010}HCPChara\u{3011}", Variant::Honeycome),
    ("\u{3010}HCChara\u{3011}", Variant::Honeycome),
    ("\u{3010}SVChara\u{3011}", Variant::SummerVacationChara),
    ("\u{3010}ACChara\u{3011}", Variant::Aicomi),
];

/// Match a card header magic against the registry.
pub fn detect_card(magic: &str) -> Option<Variant> {
    let variant = MAGIC_TABLE
        .iter()
        .find(|(prefix, _)| magic.starts_with(prefix))
        .map(|(_, v)| *v);
    tracing::debug!(magic, ?variant, "card magic dispatch");
    variant
}

const KK_CUSTOM_FIELDS: &[&str] = &["face", "body", "hair"];
const HC_CUSTOM_FIELDS: &[&str] = &["face", "body"];
const EC_COORDINATE_FIELDS: &[&str] = &["clothes", "accessory"];

impl Variant {
    /// Header fields after the common product/magic/version prelude.
    pub fn header_tail(self) -> &'static [(&'static str, FieldKind)] {
        match self {
            Variant::EmotionCreators => TAIL_EMOCRE,
            _ => TAIL_FACE_IMAGE,
        }
    }

    /// Payload codec for a known block, or `None` for the opaque path.
    ///
    /// The block's catalog version participates: Koikatu coordinate data
    /// changed shape between 0.0.0 and the EmotionCreators-era 0.0.1.
    pub fn block_codec(self, name: &str, version: &str) -> Option<BlockCodec> {
        match self {
            Variant::Koikatu | Variant::EmotionCreators => match name {
                "Custom" => Some(BlockCodec::Fielded(KK_CUSTOM_FIELDS)),
                "Coordinate" => match version {
                    "0.0.0" => Some(BlockCodec::KoikatuCoordinate),
                    "0.0.1" => Some(BlockCodec::Fielded(EC_COORDINATE_FIELDS)),
                    _ => None,
                },
                "Parameter" | "Status" | "About" => Some(BlockCodec::Plain),
                "KKEx" => Some(BlockCodec::KkEx),
                _ => None,
            },
            Variant::Honeycome | Variant::SummerVacationChara | Variant::Aicomi => match name {
                "Custom" => Some(BlockCodec::Fielded(HC_CUSTOM_FIELDS)),
                "Coordinate" => Some(BlockCodec::HoneycomeCoordinate),
                "Parameter" | "Status" | "Graphic" | "About" => Some(BlockCodec::Plain),
                "GameParameter_HCP" | "GameInfo_HCP" | "GameParameter_HC" | "GameInfo_HC"
                    if self == Variant::Honeycome =>
                {
                    Some(BlockCodec::Plain)
                }
                "GameParameter_SV" | "GameInfo_SV" if self == Variant::SummerVacationChara => {
                    Some(BlockCodec::Plain)
                }
                "GameParameter_AC" | "GameInfo_AC" if self == Variant::Aicomi => {
                    Some(BlockCodec::Plain)
                }
                _ => None,
            },
            // Non-card containers never reach block dispatch.
            _ => None,
        }
    }

    /// Whether this variant's KKEx block carries nested plugin payloads.
    pub fn has_nested_plugins(self) -> bool {
        matches!(self, Variant::Koikatu | Variant::EmotionCreators)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_dispatch_priority() {
        assert_eq!(
            detect_card("\u{3010}KoiKatuChara\u{3011}"),
            Some(Variant::Koikatu)
        );
        // Sunshine cards suffix the magic; prefix match catches them.
        assert_eq!(
            detect_card("\u{3010}KoiKatuCharaSP\u{3011}"),
            Some(Variant::Koikatu)
        );
        assert_eq!(
            detect_card("\u{3010}EroMakeChara\u{3011}"),
            Some(Variant::EmotionCreators)
        );
        assert_eq!(
            detect_card("\u{3010}HCPChara\u{3011}"),
            Some(Variant::Honeycome)
        );
        assert_eq!(
            detect_card("\u{3010}HCChara\u{3011}"),
            Some(Variant::Honeycome)
        );
        assert_eq!(
            detect_card("\u{3010}SVChara\u{3011}"),
            Some(Variant::SummerVacationChara)
        );
        assert_eq!(
            detect_card("\u{3010}ACChara\u{3011}"),
            Some(Variant::Aicomi)
        );
        assert_eq!(detect_card("\u{3010}Nothing\u{3011}"), None);
    }

    #[test]
    fn coordinate_codec_follows_block_version() {
        assert!(matches!(
            Variant::Koikatu.block_codec("Coordinate", "0.0.0"),
            Some(BlockCodec::KoikatuCoordinate)
        ));
        assert!(matches!(
            Variant::EmotionCreators.block_codec("Coordinate", "0.0.1"),
            Some(BlockCodec::Fielded(_))
        ));
        assert!(Variant::Koikatu.block_codec("Coordinate", "9.9.9").is_none());
    }

    #[test]
    fn game_blocks_scoped_to_their_title() {
        assert!(Variant::Honeycome
            .block_codec("GameParameter_HC", "0.0.0")
            .is_some());
        assert!(Variant::Aicomi
            .block_codec("GameParameter_HC", "0.0.0")
            .is_none());
        assert!(Variant::SummerVacationChara
            .block_codec("GameInfo_SV", "0.0.0")
            .is_some());
    }
}
