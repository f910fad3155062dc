//! MessagePack-family object codec.
//!
//! Decoding records the exact tag class of every integer, float, string,
//! byte string, container, and extension; encoding replays those memos so
//! that `encode(decode(bytes)) == bytes` for any accepted input. Values
//! built programmatically carry `Auto` formats and encode in the shortest
//! form, matching the game serializers.

mod decode;
mod encode;
mod value;

pub use decode::{decode, decode_prefix, decode_value};
pub use encode::{encode, encode_value};
pub use value::{BinFormat, BytesMode, ExtFormat, IntFormat, SeqFormat, StrFormat, Value};
