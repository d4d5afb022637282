//! Two realms living in one process, joined by unbounded queues.
//!
//! Each side owns one queue per direction. A message posted before the
//! other side starts listening waits in the queue, so nothing is lost to
//! listener-attachment races.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::traits::{check_origin, MessageInput, MessageOutput};

/// One end of an in-memory realm pair.
#[derive(Debug)]
pub struct RealmPort {
    origin: Arc<str>,
    input: PortInput,
    output: PortOutput,
}

/// Receiving half of a [`RealmPort`].
#[derive(Debug)]
pub struct PortInput {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

/// Sending half of a [`RealmPort`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PortOutput {
    destination: Arc<str>,
    tx: mpsc::UnboundedSender<Bytes>,
}

/// Create two realms that can message each other.
///
/// The left port's output delivers to the right realm, so it only accepts
/// posts addressed to `right_origin` (and vice versa).
pub fn realm_pair(left_origin: &str, right_origin: &str) -> (RealmPort, RealmPort) {
    let left_origin: Arc<str> = Arc::from(left_origin);
    let right_origin: Arc<str> = Arc::from(right_origin);
    let (to_right, from_left) = mpsc::unbounded_channel();
    let (to_left, from_right) = mpsc::unbounded_channel();

    let left = RealmPort {
        origin: left_origin.clone(),
        input: PortInput { rx: from_right },
        output: PortOutput {
            destination: right_origin.clone(),
            tx: to_right,
        },
    };
    let right = RealmPort {
        origin: right_origin,
        input: PortInput { rx: from_left },
        output: PortOutput {
            destination: left_origin,
            tx: to_left,
        },
    };

    (left, right)
}

impl RealmPort {
    /// Origin of the realm that owns this port.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Origin of the realm on the other side.
    pub fn peer_origin(&self) -> &str {
        &self.output.destination
    }

    /// Split into independently owned input and output halves.
    pub fn split(self) -> (PortInput, PortOutput) {
        (self.input, self.output)
    }
}

impl MessageInput for PortInput {
    async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl MessageOutput for PortOutput {
    fn origin(&self) -> &str {
        &self.destination
    }

    fn post_message(&self, message: Bytes, target_origin: &str) -> Result<()> {
        check_origin(target_origin, &self.destination)?;
        tracing::trace!(
            destination = %self.destination,
            size = message.len(),
            "posting message"
        );
        self.tx
            .send(message)
            .map_err(|_| TransportError::Disconnected(self.destination.to_string()))
    }
}
