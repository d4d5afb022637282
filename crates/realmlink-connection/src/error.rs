use std::time::Duration;

/// Errors raised by a realm connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] realmlink_transport::TransportError),

    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] realmlink_codec::CodecError),

    /// A message was not valid JSON or had the wrong shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input ended before the remote exports arrived.
    #[error("input closed before the handshake completed")]
    HandshakeInterrupted,

    /// No handshake message arrived in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// An apply message named a function this side never exported.
    #[error("no exported function for key {0}")]
    UnknownFunction(String),

    /// A return message named no pending call.
    #[error("no pending call for key {0}")]
    UnknownReturn(String),

    /// A return message carried neither a value nor a reason.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// An exported function panicked while handling a call.
    #[error("exported function panicked: {0}")]
    FunctionPanicked(String),

    /// The connection was closed.
    #[error("connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
