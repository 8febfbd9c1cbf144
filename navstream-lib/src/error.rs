use crate::nmea::SentenceError;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Sentence(#[from] SentenceError),

    /// A recognized message whose payload is smaller than its fixed layout.
    #[error("{kind} payload too short: got {got} bytes, want {want}")]
    PayloadTooShort {
        kind: &'static str,
        got: usize,
        want: usize,
    },

    #[error("checksum mismatch for class=0x{class:02X} id=0x{id:02X}: expected {expected:02X?}, got {actual:02X?}")]
    ChecksumMismatch {
        class: u8,
        id: u8,
        expected: [u8; 2],
        actual: [u8; 2],
    },

    /// Writing a record to a sink failed.
    #[error("sink write failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
