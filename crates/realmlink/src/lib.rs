//! Exchange rich values and callable functions between isolated realms.
//!
//! Two realms share nothing but a message channel. realmlink lets each side
//! export a value (data and functions alike) and receive the other side's
//! exports as its imports. Calling an imported function posts a message to
//! the owning realm and resolves with its result.
//!
//! # Crate Structure
//!
//! - [`transport`]: Message endpoints over in-memory realm pairs and framed byte streams
//! - [`codec`]: Value model, type registry and sanitizer
//! - [`connection`]: Handshake, function proxies and connection lifecycle
//!
//! ```no_run
//! use realmlink::{open, realm_pair, Function, Object, Value};
//!
//! # async fn demo() -> realmlink::connection::Result<()> {
//! let (host, guest) = realm_pair("realm://host", "realm://guest");
//! let (host_in, host_out) = host.split();
//! let (guest_in, guest_out) = guest.split();
//!
//! let add = Function::from_fn(2, |args| {
//!     let a = args.first().and_then(Value::as_f64).unwrap_or(0.0);
//!     let b = args.get(1).and_then(Value::as_f64).unwrap_or(0.0);
//!     Ok(Value::Number(a + b))
//! });
//! let exports = Value::object(Object::new().with("add", add));
//!
//! let (host, guest) = tokio::join!(
//!     open(exports, host_in, host_out, "realm://guest"),
//!     open(Value::Undefined, guest_in, guest_out, "realm://host"),
//! );
//! let (_host, guest) = (host?, guest?);
//!
//! let remote_add = guest.imports().get("add").and_then(Value::as_function).unwrap();
//! let sum = remote_add.call(vec![Value::from(1), Value::from(2)]).await;
//! assert_eq!(sum, Ok(Value::from(3)));
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use realmlink_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use realmlink_codec::*;
}

/// Re-export connection types.
pub mod connection {
    pub use realmlink_connection::*;
}

pub use realmlink_codec::{
    inspect, sanitize, sanitize_function, Codec, ErrorValue, Function, Object, Symbol,
    Transmittable, TypeRegistry, Value,
};
pub use realmlink_connection::{open, Connection, ConnectionConfig, ConnectionError};
pub use realmlink_transport::{realm_pair, MessageInput, MessageOutput, RealmPort, StreamPort};
