/// Errors that can occur in realm transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The caller addressed a realm other than the one this output reaches.
    #[error("target origin '{target}' does not match destination '{destination}'")]
    OriginMismatch { target: String, destination: String },

    /// The receiving realm is gone; nothing is listening on the other end.
    #[error("destination realm '{0}' is disconnected")]
    Disconnected(String),

    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x524C \"RL\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred on a byte-stream port.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
