use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed container: {reason}")]
    MalformedContainer { reason: &'static str },

    #[error("unknown variant magic {magic:?}")]
    UnknownVariant { magic: String },

    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {have})")]
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("unsupported msgpack tag {tag:#04x} at offset {offset:#x}")]
    UnsupportedTag { tag: u8, offset: usize },

    #[error("{context}: expected {expected}, found {found}")]
    SchemaMismatch {
        context: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("string at offset {offset:#x} is not valid UTF-8: {source}")]
    InvalidString {
        offset: usize,
        source: std::string::FromUtf8Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
