//! Per-call encode and decode state.
//!
//! Descriptors recurse into children through [`EncodeContext::encode`] and
//! [`DecodeContext::decode`], never through the codec entry points, so the
//! identity cache is shared by the whole payload.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::codec::{tagged, untag, REF_TYPE};
use crate::error::{CodecError, Result};
use crate::function::Function;
use crate::inspect::inspect;
use crate::memo::{DecodeMemo, EncodeMemo, MemoKey, Visit};
use crate::registry::TypeRegistry;
use crate::value::Value;

/// Bound on chained custom conversions for a single value.
const MAX_CONVERSIONS: usize = 16;

/// Post-decode transform, called with the key and the freshly decoded value.
pub type Reviver = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

/// The reviver that returns every value unchanged.
pub fn identity_reviver() -> Reviver {
    Arc::new(|_, value| value)
}

/// Bridge between function values and the keyed-reference table.
///
/// Only contexts that carry a binder may encode or decode functions.
pub trait FunctionBinder: Send + Sync {
    /// Key for `function`, registering it the first time it is seen.
    fn export_function(&self, function: &Function) -> String;

    /// Local stand-in for the remote function behind `key`.
    /// The same key always yields the same function.
    fn import_function(&self, key: &str, arity: usize) -> Function;
}

/// State for one top-level encode.
pub struct EncodeContext<'a> {
    registry: &'a TypeRegistry,
    binder: Option<&'a dyn FunctionBinder>,
    memo: EncodeMemo,
    // Converted values stay alive until the encode ends so their addresses
    // cannot be reused by later allocations and confuse the memo.
    retained: Vec<Value>,
}

impl<'a> EncodeContext<'a> {
    pub fn new(registry: &'a TypeRegistry, binder: Option<&'a dyn FunctionBinder>) -> Self {
        Self {
            registry,
            binder,
            memo: EncodeMemo::new(),
            retained: Vec::new(),
        }
    }

    /// Binder for live references, absent outside exports.
    pub fn binder(&self) -> Option<&'a dyn FunctionBinder> {
        self.binder
    }

    /// Encode `value` found under `key`, sharing identity with the rest of the payload.
    pub fn encode(&mut self, value: &Value, key: &str) -> Result<Json> {
        let Some(original) = value.as_transmittable().and(MemoKey::of(value)) else {
            return self.encode_described(value);
        };
        if let Some(slot) = self.memo.begin_conversion(original)? {
            return Ok(tagged(REF_TYPE, Json::from(slot)));
        }

        let converted = convert(value, key)?;
        if let Some(converted) = &converted {
            self.retained.push(converted.clone());
        }
        let target = converted.as_ref().unwrap_or(value);
        let code = self.encode_described(target)?;
        let slot = MemoKey::of(target).and_then(|target| self.memo.slot(target));
        self.memo.end_conversion(original, slot);
        Ok(code)
    }

    fn encode_described(&mut self, value: &Value) -> Result<Json> {
        let registry = self.registry;
        let descriptor = registry
            .find(value)
            .ok_or_else(|| CodecError::UnsupportedType(inspect(value)))?;

        let shared = MemoKey::of(value).filter(|_| descriptor.shares_identity());
        if let Some(shared) = shared {
            if let Visit::Repeat(slot) = self.memo.visit(shared)? {
                return Ok(tagged(REF_TYPE, Json::from(slot)));
            }
        }

        let payload = descriptor.encode(self, value)?;
        if let Some(shared) = shared {
            self.memo.finish(shared);
        }
        Ok(tagged(descriptor.name(), payload))
    }
}

/// Apply custom conversions until the value no longer offers one.
fn convert(value: &Value, key: &str) -> Result<Option<Value>> {
    let Some(transmittable) = value.as_transmittable() else {
        return Ok(None);
    };
    let mut current = transmittable.to_transmittable(key);
    for _ in 1..MAX_CONVERSIONS {
        let next = match current.as_transmittable() {
            Some(transmittable) => transmittable.to_transmittable(key),
            None => return Ok(Some(current)),
        };
        current = next;
    }
    match current.as_transmittable() {
        Some(_) => Err(CodecError::ConversionLimit(MAX_CONVERSIONS)),
        None => Ok(Some(current)),
    }
}

/// State for one top-level decode.
pub struct DecodeContext<'a> {
    registry: &'a TypeRegistry,
    binder: Option<&'a dyn FunctionBinder>,
    reviver: &'a (dyn Fn(&str, Value) -> Value + Send + Sync),
    memo: DecodeMemo,
}

impl<'a> DecodeContext<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        binder: Option<&'a dyn FunctionBinder>,
        reviver: &'a (dyn Fn(&str, Value) -> Value + Send + Sync),
    ) -> Self {
        Self {
            registry,
            binder,
            reviver,
            memo: DecodeMemo::new(),
        }
    }

    pub fn binder(&self) -> Option<&'a dyn FunctionBinder> {
        self.binder
    }

    /// Decode `code` found under `key`, then hand it to the reviver.
    pub fn decode(&mut self, code: &Json, key: &str) -> Result<Value> {
        let (type_name, payload) = untag(code)?;

        if type_name == REF_TYPE {
            let slot = payload
                .as_u64()
                .ok_or_else(|| CodecError::malformed(REF_TYPE, "expected a slot number"))?;
            return self.memo.resolve(slot);
        }

        let registry = self.registry;
        let descriptor = registry
            .get(type_name)
            .ok_or_else(|| CodecError::UnknownType(type_name.to_string()))?;

        let slot = descriptor.shares_identity().then(|| self.memo.reserve());
        let decoded = descriptor.decode(self, payload)?;
        let revived = (self.reviver)(key, decoded);
        if let Some(slot) = slot {
            self.memo.fill(slot, revived.clone());
        }
        Ok(revived)
    }
}
