//! Realm messages over an async byte stream.
//!
//! Used when the two realms live in different processes (a Unix socket, a
//! pipe, a TCP stream). Each message becomes one frame, see [`crate::codec`].

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::codec::{FrameConfig, MessageCodec};
use crate::error::{Result, TransportError};
use crate::traits::{check_origin, MessageInput, MessageOutput};

/// Constructor for stream-backed realm endpoints.
pub struct StreamPort;

/// Receiving half of a stream port.
pub struct StreamInput<S> {
    frames: FramedRead<ReadHalf<S>, MessageCodec>,
}

/// Sending half of a stream port. Cheap to clone.
///
/// Posts are queued and written by a background task, so posting never
/// waits on the socket.
#[derive(Debug, Clone)]
pub struct StreamOutput {
    destination: Arc<str>,
    tx: mpsc::UnboundedSender<Bytes>,
}

impl StreamPort {
    /// Wrap `stream` with default framing.
    ///
    /// Must be called from within a tokio runtime: the writer task is spawned here.
    pub fn new<S>(stream: S, remote_origin: &str) -> (StreamInput<S>, StreamOutput)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_config(stream, remote_origin, FrameConfig::default())
    }

    /// Wrap `stream` with explicit framing configuration.
    pub fn with_config<S>(
        stream: S,
        remote_origin: &str,
        config: FrameConfig,
    ) -> (StreamInput<S>, StreamOutput)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let frames = FramedRead::new(read_half, MessageCodec::new(config.clone()));
        let sink = FramedWrite::new(write_half, MessageCodec::new(config));

        let destination: Arc<str> = Arc::from(remote_origin);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(sink, rx, destination.clone()));

        (StreamInput { frames }, StreamOutput { destination, tx })
    }
}

async fn write_loop<S>(
    mut sink: FramedWrite<WriteHalf<S>, MessageCodec>,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    destination: Arc<str>,
) where
    S: AsyncWrite + Send,
{
    while let Some(message) = rx.recv().await {
        if let Err(err) = sink.send(message).await {
            tracing::warn!(destination = %destination, error = %err, "stream write failed");
            break;
        }
    }
    tracing::debug!(destination = %destination, "stream writer stopped");
}

impl<S> MessageInput for StreamInput<S>
where
    S: AsyncRead + Send + 'static,
{
    async fn recv(&mut self) -> Option<Bytes> {
        match self.frames.next().await {
            Some(Ok(message)) => Some(message),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "stream read failed, closing input");
                None
            }
            None => None,
        }
    }
}

impl MessageOutput for StreamOutput {
    fn origin(&self) -> &str {
        &self.destination
    }

    fn post_message(&self, message: Bytes, target_origin: &str) -> Result<()> {
        check_origin(target_origin, &self.destination)?;
        self.tx
            .send(message)
            .map_err(|_| TransportError::Disconnected(self.destination.to_string()))
    }
}
