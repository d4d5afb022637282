//! Message endpoints for realmlink.
//!
//! A realm talks to another realm only by posting whole messages to an
//! output and receiving whole messages from an input. This crate provides
//! that primitive and nothing else:
//! - [`MessageInput`] / [`MessageOutput`]: the endpoint traits
//! - [`realm_pair`]: two in-memory realms wired to each other
//! - [`StreamPort`]: messages framed over any async byte stream
//!
//! Every post names the origin it expects to reach. A mismatch is refused
//! rather than delivered.

pub mod codec;
pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

pub use codec::{decode_frame, encode_frame, FrameConfig, MessageCodec, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{Result, TransportError};
pub use memory::{realm_pair, PortInput, PortOutput, RealmPort};
pub use stream::{StreamInput, StreamOutput, StreamPort};
pub use traits::{check_origin, MessageInput, MessageOutput, ANY_ORIGIN};
