//! Reader/writer for the character-card and scene files of the Koikatu
//! game family (Koikatu, EmotionCreators, Honeycome, SummerVacation
//! Scramble, Aicomi).
//!
//! Three-layer architecture:
//! - **Layer 1** (`cursor`/`png`): raw byte I/O — PNG framing, primitive
//!   reads and writes
//! - **Layer 2** (`mpack`/`catalog`/`blocks`/`nested`): the object codec
//!   with round-trip tag memos, the block catalog, and per-block payload
//!   layouts
//! - **Layer 3** (`document`/`scene`/`save`): typed containers — cards,
//!   studio scenes, game saves
//!
//! The invariant the whole crate is built around: decoding a file and
//! re-encoding it unchanged reproduces the input byte-for-byte, across
//! every supported game revision. Editing one value only moves the bytes
//! of its enclosing block.

pub mod blocks;
pub mod catalog;
pub mod cursor;
pub mod document;
pub mod error;
pub mod mpack;
pub mod nested;
pub mod png;
pub mod save;
pub mod scene;
pub mod variant;

pub use document::{Block, BlockPayload, Document};
pub use error::{Error, Result};
pub use mpack::Value;
pub use nested::NestedDecodeWarning;
pub use save::koikatu::KoikatuSave;
pub use save::summer::SummerVacationSave;
pub use scene::emocre::{EmocreMap, EmocreScene};
pub use scene::honeycome::HoneycomeScene;
pub use scene::koikatu::KoikatuScene;
pub use scene::{ObjectKind, ObjectRecord};
pub use variant::Variant;
