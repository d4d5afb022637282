//! The value vocabulary of a realm.
//!
//! Composite values are reference counted and immutable. Two handles to the
//! same composite are "the same object" ([`Value::same`]); two separately
//! built composites with equal contents are equal ([`PartialEq`]) but not
//! the same.

use std::fmt;
use std::sync::Arc;

use crate::function::Function;

/// A value that can live in a realm.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Array(Arc<[Value]>),
    Error(Arc<ErrorValue>),
    Function(Function),
    Map(Arc<[(Value, Value)]>),
    Set(Arc<[Value]>),
    Object(Arc<Object>),
    /// Opaque, identity-compared token. Not described by the standard registry.
    Symbol(Symbol),
    /// Host value that knows its own transmittable form.
    Custom(Arc<dyn Transmittable>),
}

/// Capability of a host value to convert itself into a describable value.
///
/// The codec asks for the conversion before consulting the registry and
/// encodes the result in place of the original. `key` is the property name
/// or index under which the value was found (empty at the top level).
pub trait Transmittable: Send + Sync + fmt::Debug {
    fn to_transmittable(&self, key: &str) -> Value;
}

/// Opaque token compared by identity.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(description: &str) -> Self {
        Self(Arc::from(description))
    }

    pub fn description(&self) -> &str {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Symbol) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Plain object with insertion-ordered string keys.
#[derive(Clone, Default, PartialEq)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a property. A replaced property keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Error value: a message plus any extra enumerable properties.
#[derive(Clone, PartialEq)]
pub struct ErrorValue {
    message: String,
    properties: Object,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            properties: Object::new(),
        }
    }

    pub fn with_properties(message: impl Into<String>, properties: Object) -> Self {
        Self {
            message: message.into(),
            properties,
        }
    }

    /// Builder-style property insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn properties(&self) -> &Object {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .field("properties", &self.properties)
            .finish()
    }
}

impl Value {
    pub fn string(value: impl AsRef<str>) -> Self {
        Value::String(Arc::from(value.as_ref()))
    }

    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Array(items.into_iter().collect())
    }

    pub fn map<I: IntoIterator<Item = (Value, Value)>>(entries: I) -> Self {
        let mut unique: Vec<(Value, Value)> = Vec::new();
        for (key, value) in entries {
            match unique.iter_mut().find(|(existing, _)| existing.same_value_zero(&key)) {
                Some((_, slot)) => *slot = value,
                None => unique.push((key, value)),
            }
        }
        Value::Map(Arc::from(unique))
    }

    pub fn set<I: IntoIterator<Item = Value>>(items: I) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.iter().any(|existing| existing.same_value_zero(&item)) {
                unique.push(item);
            }
        }
        Value::Set(Arc::from(unique))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn error(error: ErrorValue) -> Self {
        Value::Error(Arc::new(error))
    }

    pub fn custom(value: impl Transmittable + 'static) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Short lowercase name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Error(_) => "error",
            Value::Function(_) => "function",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Object(_) => "object",
            Value::Symbol(_) => "symbol",
            Value::Custom(_) => "custom",
        }
    }

    /// Address of the shared allocation behind a by-reference value.
    pub fn identity(&self) -> Option<usize> {
        let ptr = match self {
            Value::Array(items) | Value::Set(items) => Arc::as_ptr(items) as *const (),
            Value::Error(error) => Arc::as_ptr(error) as *const (),
            Value::Function(function) => return Some(function.identity()),
            Value::Map(entries) => Arc::as_ptr(entries) as *const (),
            Value::Object(object) => Arc::as_ptr(object) as *const (),
            Value::Symbol(symbol) => Arc::as_ptr(&symbol.0) as *const u8 as *const (),
            Value::Custom(custom) => Arc::as_ptr(custom) as *const (),
            _ => return None,
        };
        Some(ptr as usize)
    }

    /// Strict identity, the way `===` compares: primitives by value,
    /// everything else by reference.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b && self.kind() == other.kind(),
                _ => false,
            },
        }
    }

    /// Key equality of maps and sets: [`Value::same`], except that NaN
    /// equals NaN.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self.same(other),
        }
    }

    pub fn as_transmittable(&self) -> Option<&dyn Transmittable> {
        match self {
            Value::Custom(custom) => Some(custom.as_ref()),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// Property of an object or error.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(object) => object.get(key),
            Value::Error(error) => error.get(key),
            _ => None,
        }
    }

    /// Element of an array.
    pub fn index(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|items| items.get(index))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        if self.same(other) {
            return true;
        }
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.is_nan() && b.is_nan(),
            (Value::Array(a), Value::Array(b)) | (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Error(error) => fmt::Debug::fmt(error, f),
            Value::Function(function) => fmt::Debug::fmt(function, f),
            Value::Map(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(key, value)| (key, value)))
                .finish(),
            Value::Set(items) => f.debug_set().entries(items.iter()).finish(),
            Value::Object(object) => fmt::Debug::fmt(object, f),
            Value::Symbol(symbol) => fmt::Debug::fmt(symbol, f),
            Value::Custom(custom) => fmt::Debug::fmt(custom, f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Arc::from(items))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::object(object)
    }
}

impl From<ErrorValue> for Value {
    fn from(error: ErrorValue) -> Self {
        Value::error(error)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_are_the_same_object() {
        let object = Value::object(Object::new().with("a", 1));
        let copy = object.clone();
        assert!(object.same(&copy));
    }

    #[test]
    fn equal_contents_are_equal_but_not_same() {
        let left = Value::object(Object::new().with("a", 1));
        let right = Value::object(Object::new().with("a", 1));
        assert_eq!(left, right);
        assert!(!left.same(&right));
    }

    #[test]
    fn primitives_compare_by_value() {
        assert!(Value::from("x").same(&Value::from("x")));
        assert!(Value::from(2).same(&Value::Number(2.0)));
        assert!(!Value::Null.same(&Value::Undefined));
    }

    #[test]
    fn nan_is_equal_but_not_same() {
        let nan = Value::Number(f64::NAN);
        assert!(!nan.same(&nan));
        assert_eq!(nan, Value::Number(f64::NAN));
    }

    #[test]
    fn symbols_compare_by_identity() {
        let wat = Symbol::new("wat");
        let other = Symbol::new("wat");
        assert_eq!(Value::from(wat.clone()), Value::from(wat.clone()));
        assert_ne!(Value::from(wat), Value::from(other));
    }

    #[test]
    fn object_insert_replaces_in_place() {
        let object = Object::new().with("a", 1).with("b", 2).with("a", 3);
        let keys: Vec<&str> = object.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(object.get("a"), Some(&Value::from(3)));
    }

    #[test]
    fn set_drops_repeated_members() {
        let shared = Value::object(Object::new());
        let set = Value::set([Value::from(1), Value::from(1), shared.clone(), shared]);
        assert_eq!(set.as_set().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn nan_members_and_keys_collapse() {
        let set = Value::set([Value::Number(f64::NAN), Value::Number(f64::NAN), Value::from(0)]);
        assert_eq!(set.as_set().map(<[Value]>::len), Some(2));

        let map = Value::map([
            (Value::Number(f64::NAN), Value::from(1)),
            (Value::Number(f64::NAN), Value::from(2)),
            (Value::Number(-0.0), Value::from(3)),
            (Value::from(0), Value::from(4)),
        ]);
        let entries = map.as_map().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, Value::from(2));
        assert_eq!(entries[1].1, Value::from(4));
    }

    #[test]
    fn map_keeps_last_value_for_repeated_key() {
        let map = Value::map([
            (Value::from("a"), Value::from(1)),
            (Value::from("a"), Value::from(2)),
        ]);
        let entries = map.as_map().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, Value::from(2));
    }

    #[test]
    fn get_reads_object_and_error_properties() {
        let object = Value::object(Object::new().with("answer", 42));
        assert_eq!(object.get("answer"), Some(&Value::from(42)));

        let error = Value::error(ErrorValue::new("boom").with("code", "E1"));
        assert_eq!(error.get("code"), Some(&Value::from("E1")));
        assert_eq!(error.as_error().map(ErrorValue::message), Some("boom"));
    }

    #[test]
    fn distinct_empty_arrays_have_distinct_identity() {
        let left = Value::array([]);
        let right = Value::array([]);
        assert!(!left.same(&right));
        assert_eq!(left, right);
    }
}
