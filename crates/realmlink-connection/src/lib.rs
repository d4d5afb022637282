//! Handshake, function proxies and connection lifecycle for realmlink.
//!
//! Opening a connection posts the local exports, waits for the remote
//! exports and exposes them as [`Connection::imports`]. Functions among
//! the imports are proxies: calling one posts a `functionApply` message and
//! resolves when the matching `functionReturn` arrives.
//!
//! Errors raised while handling inbound messages never escape the listener.
//! They are published on [`Connection::errors`] so a long-lived connection
//! survives a bad message.

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod references;

pub use config::{ConnectionConfig, DEFAULT_ERROR_CAPACITY};
pub use connection::{open, Connection, ConnectionBuilder, CLOSED_MESSAGE};
pub use error::{ConnectionError, Result};
pub use message::{FunctionApply, FunctionReturn, Message, FUNCTION_APPLY, FUNCTION_RETURN};
pub use references::new_key;
