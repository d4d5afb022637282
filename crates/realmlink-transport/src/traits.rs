use std::future::Future;

use bytes::Bytes;

use crate::error::{Result, TransportError};

/// Target origin that matches any destination.
pub const ANY_ORIGIN: &str = "*";

/// The receiving half of a realm endpoint.
///
/// Messages arrive whole and in the order the peer posted them.
/// `None` means the peer can never deliver again.
pub trait MessageInput: Send + 'static {
    fn recv(&mut self) -> impl Future<Output = Option<Bytes>> + Send;
}

/// The sending half of a realm endpoint.
///
/// Posting never blocks. The message is queued for the destination realm,
/// which processes it whenever it next listens.
pub trait MessageOutput: Send + Sync + 'static {
    /// Origin of the realm this output delivers to.
    fn origin(&self) -> &str;

    /// Post one message, refusing it unless `target_origin` names the destination.
    fn post_message(&self, message: Bytes, target_origin: &str) -> Result<()>;
}

/// Verify that a post addressed to `target` may be delivered to `destination`.
pub fn check_origin(target: &str, destination: &str) -> Result<()> {
    if target == ANY_ORIGIN || target == destination {
        Ok(())
    } else {
        Err(TransportError::OriginMismatch {
            target: target.to_string(),
            destination: destination.to_string(),
        })
    }
}
