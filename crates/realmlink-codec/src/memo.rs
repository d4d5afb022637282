//! Per-call identity caches.
//!
//! A composite met for the first time during an encode is numbered in
//! pre-order. Every later occurrence is written as `["ref", n]` instead of
//! being encoded again. The decoder numbers composites in the same order,
//! so a reference resolves to the very value decoded earlier. A custom value
//! is remembered under its own identity and converted once; later sightings
//! refer to the slot of its conversion.
//!
//! Caches live for one top-level encode or decode and are then dropped, so
//! identity is never shared across payloads.

use std::collections::HashMap;

use crate::error::{CodecError, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy)]
enum Slot {
    InProgress(u64),
    Done(u64),
    /// A custom value whose conversion is being encoded.
    Converting,
}

/// Identity of a by-reference value as the encoder sees it.
///
/// Variants can share one allocation (an array and a set over the same
/// items), so the kind is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey {
    kind: &'static str,
    identity: usize,
}

impl MemoKey {
    pub fn of(value: &Value) -> Option<Self> {
        value.identity().map(|identity| Self {
            kind: value.kind(),
            identity,
        })
    }
}

/// Encode-side cache keyed by value identity.
#[derive(Debug, Default)]
pub struct EncodeMemo {
    seen: HashMap<MemoKey, Slot>,
    next: u64,
}

/// What the encoder should do with a shared composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// First sighting: encode in full.
    First,
    /// Already encoded: emit a reference to this slot.
    Repeat(u64),
}

impl EncodeMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit to `key`.
    ///
    /// Fails when the value is still being encoded further up the stack.
    pub fn visit(&mut self, key: MemoKey) -> Result<Visit> {
        match self.seen.get(&key) {
            Some(Slot::Done(slot)) => Ok(Visit::Repeat(*slot)),
            Some(Slot::InProgress(_) | Slot::Converting) => Err(CodecError::Cycle),
            None => {
                let slot = self.next;
                self.next += 1;
                self.seen.insert(key, Slot::InProgress(slot));
                Ok(Visit::First)
            }
        }
    }

    /// Mark `key` as fully encoded.
    pub fn finish(&mut self, key: MemoKey) {
        if let Some(entry) = self.seen.get_mut(&key) {
            if let Slot::InProgress(slot) = *entry {
                *entry = Slot::Done(slot);
            }
        }
    }

    /// Slot of a fully encoded value.
    pub fn slot(&self, key: MemoKey) -> Option<u64> {
        match self.seen.get(&key) {
            Some(Slot::Done(slot)) => Some(*slot),
            _ => None,
        }
    }

    /// Start converting the custom value behind `key`.
    ///
    /// Returns the slot its earlier conversion was encoded into, if any.
    pub fn begin_conversion(&mut self, key: MemoKey) -> Result<Option<u64>> {
        match self.seen.get(&key) {
            Some(Slot::Done(slot)) => Ok(Some(*slot)),
            Some(_) => Err(CodecError::Cycle),
            None => {
                self.seen.insert(key, Slot::Converting);
                Ok(None)
            }
        }
    }

    /// Later sightings of `key` refer to `slot`. Without a slot the
    /// conversion produced no shared composite and runs again next time.
    pub fn end_conversion(&mut self, key: MemoKey, slot: Option<u64>) {
        match slot {
            Some(slot) => {
                self.seen.insert(key, Slot::Done(slot));
            }
            None => {
                self.seen.remove(&key);
            }
        }
    }

    /// Number of shared composites seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Decode-side cache keyed by slot number.
#[derive(Debug, Default)]
pub struct DecodeMemo {
    slots: Vec<Option<Value>>,
}

impl DecodeMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next slot before decoding a composite's children.
    pub fn reserve(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    pub fn fill(&mut self, slot: usize, value: Value) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(value);
        }
    }

    /// Resolve a back-reference.
    pub fn resolve(&self, slot: u64) -> Result<Value> {
        usize::try_from(slot)
            .ok()
            .and_then(|index| self.slots.get(index))
            .and_then(Option::clone)
            .ok_or(CodecError::DanglingReference(slot))
    }
}
