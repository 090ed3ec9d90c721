pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialized print truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("Serialized print has bad magic {0:02X?}")]
    BadMagic([u8; 3]),

    #[error("Unsupported print format version {0}")]
    UnsupportedVersion(u8),

    #[error("Print has no matching payload")]
    MissingPayload,

    #[error("Invalid finger value: {0}")]
    InvalidFinger(u8),

    #[error("Invalid enroll date: {0} days from CE")]
    InvalidDate(i32),

    #[error("Invalid UTF-8 in field `{field}`")]
    InvalidUtf8 { field: &'static str },

    #[error("{0} trailing bytes after serialized print")]
    TrailingBytes(usize),
}
