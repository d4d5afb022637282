//! Value model and typed wire codec for realmlink.
//!
//! A realm's values are described by an ordered [`TypeRegistry`]. Encoding
//! picks the first descriptor whose predicate accepts a value and produces
//! an `[typeName, payload]` pair; decoding dispatches on the type name.
//!
//! Within one encode/decode call, a composite referenced several times is
//! encoded once and decodes to one shared value (see [`memo`]). Decoded
//! values are immutable: the receiving realm can never mutate the sender's
//! data, only build new values of its own.
//!
//! Functions cross the boundary through a [`FunctionBinder`], which the
//! connection layer implements with its keyed-reference table.

pub mod codec;
pub mod context;
pub mod error;
pub mod function;
pub mod inspect;
pub mod json;
pub mod memo;
pub mod registry;
pub mod sanitize;
pub mod types;
pub mod value;

pub use codec::{standard_registry, tagged, untag, Codec, Encoded, REF_TYPE};
pub use context::{identity_reviver, DecodeContext, EncodeContext, FunctionBinder, Reviver};
pub use error::{CodecError, Result};
pub use function::{CallFuture, CallResult, Function};
pub use inspect::{inspect, INSPECTION_CUTOFF};
pub use registry::{TypeDescriptor, TypeRegistry, TypeRegistryBuilder};
pub use sanitize::{sanitize, sanitize_function, Sanitizer};
pub use value::{ErrorValue, Object, Symbol, Transmittable, Value};
