//! Error types for glbuffers

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Format must be present")]
    EmptyFormat,

    #[error("Format string is not valid")]
    InvalidFormat,

    #[error("\"{0}\" is not a valid variable name")]
    InvalidName(String),

    #[error("Duplicate field name \"{0}\"")]
    DuplicateField(String),

    #[error("Index \"{index}\" out of bound, buffer has a length of \"{length}\"")]
    IndexOutOfBound { index: i64, length: usize },

    #[error("Slices indexes \"{start}:{stop}\" out of bound, buffer has a length of \"{length}\"")]
    SliceOutOfBound { start: i64, stop: i64, length: usize },

    #[error("Step cannot be 0")]
    ZeroStep,

    #[error("Expected Sequence with format \"{format}\", found \"{found}\"")]
    UnexpectedValue { format: String, found: String },

    #[error("invalid index")]
    InvalidIndex,

    #[error("No data to pack")]
    NoData,

    #[error("Impossible to unpack data that was not packed by the formatter")]
    ForeignRecord,

    #[error("Buffer do not support resizing")]
    Resize,

    #[error("Unmapped buffer write do not support steps different than 1.")]
    UnmappedStridedWrite,

    #[error("Key must be an integer or a slice, got {0}")]
    KeyKind(String),

    #[error("Buffer was freed")]
    Freed,

    #[error("Buffer is already mapped")]
    AlreadyMapped,

    #[error("Cannot resize a mapped buffer")]
    MappedResize,

    #[error("device error: {message}")]
    Device { message: String, retryable: bool },
}

impl Error {
    /// Whether the failure came from the device boundary and may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Device { retryable: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
