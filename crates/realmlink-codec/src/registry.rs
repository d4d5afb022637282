use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::codec::REF_TYPE;
use crate::context::{DecodeContext, EncodeContext};
use crate::error::{CodecError, Result};
use crate::types;
use crate::value::Value;

/// One entry of the wire vocabulary.
pub trait TypeDescriptor: Send + Sync {
    /// Type name written on the wire.
    fn name(&self) -> &str;

    /// Whether this descriptor handles `value`.
    fn test(&self, value: &Value) -> bool;

    fn encode(&self, cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json>;

    fn decode(&self, cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value>;

    /// Whether repeated occurrences within one payload decode to one value.
    fn shares_identity(&self) -> bool {
        false
    }
}

/// Ordered, immutable set of type descriptors.
///
/// Predicates may overlap, so the first descriptor whose `test` accepts a
/// value wins. The standard order is boolean, null, number, string,
/// undefined, array, error, function, map, set, object.
#[derive(Clone)]
pub struct TypeRegistry {
    types: Vec<Arc<dyn TypeDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl TypeRegistry {
    /// The standard vocabulary.
    pub fn standard() -> Self {
        Self {
            types: Vec::new(),
            by_name: HashMap::new(),
        }
        .rebuild(types::standard())
    }

    /// Start from an empty registry.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder { types: Vec::new() }
    }

    /// Start from the standard vocabulary.
    pub fn standard_builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder {
            types: types::standard(),
        }
    }

    fn rebuild(mut self, types: Vec<Arc<dyn TypeDescriptor>>) -> Self {
        self.by_name = types
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (descriptor.name().to_string(), index))
            .collect();
        self.types = types;
        self
    }

    /// First descriptor, in priority order, that accepts `value`.
    pub fn find(&self, value: &Value) -> Option<&dyn TypeDescriptor> {
        self.types
            .iter()
            .find(|descriptor| descriptor.test(value))
            .map(|descriptor| descriptor.as_ref())
    }

    /// Descriptor registered under `name`.
    pub fn get(&self, name: &str) -> Option<&dyn TypeDescriptor> {
        self.by_name
            .get(name)
            .and_then(|&index| self.types.get(index))
            .map(|descriptor| descriptor.as_ref())
    }

    /// Type names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|descriptor| descriptor.name())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether `value` can be encoded, directly or through its own conversion.
    pub fn can_serialize(&self, value: &Value) -> bool {
        value.as_transmittable().is_some() || self.find(value).is_some()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Assembles a [`TypeRegistry`].
pub struct TypeRegistryBuilder {
    types: Vec<Arc<dyn TypeDescriptor>>,
}

impl TypeRegistryBuilder {
    /// Append a descriptor at the lowest priority.
    pub fn with(mut self, descriptor: impl TypeDescriptor + 'static) -> Self {
        self.types.push(Arc::new(descriptor));
        self
    }

    /// Insert a descriptor just ahead of `name`, or at the end if `name` is absent.
    pub fn with_before(mut self, name: &str, descriptor: impl TypeDescriptor + 'static) -> Self {
        let index = self
            .types
            .iter()
            .position(|existing| existing.name() == name)
            .unwrap_or(self.types.len());
        self.types.insert(index, Arc::new(descriptor));
        self
    }

    /// Drop the descriptor registered under `name`.
    pub fn without(mut self, name: &str) -> Self {
        self.types.retain(|existing| existing.name() != name);
        self
    }

    pub fn build(self) -> Result<TypeRegistry> {
        let mut seen = HashMap::new();
        for descriptor in &self.types {
            let name = descriptor.name();
            if name == REF_TYPE {
                return Err(CodecError::InvalidRegistry(format!(
                    "type name {REF_TYPE:?} is reserved"
                )));
            }
            if seen.insert(name.to_string(), ()).is_some() {
                return Err(CodecError::InvalidRegistry(format!(
                    "duplicate type name {name:?}"
                )));
            }
        }

        Ok(TypeRegistry {
            types: Vec::new(),
            by_name: HashMap::new(),
        }
        .rebuild(self.types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ErrorValue, Object, Symbol};

    #[test]
    fn standard_order() {
        let registry = TypeRegistry::standard();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "boolean",
                "null",
                "number",
                "string",
                "undefined",
                "array",
                "error",
                "function",
                "map",
                "set",
                "object"
            ]
        );
    }

    #[test]
    fn find_picks_specific_type() {
        let registry = TypeRegistry::standard();
        let find = |value: &Value| registry.find(value).map(|d| d.name().to_string());

        assert_eq!(find(&Value::array([])).as_deref(), Some("array"));
        assert_eq!(find(&Value::error(ErrorValue::new("x"))).as_deref(), Some("error"));
        assert_eq!(find(&Value::object(Object::new())).as_deref(), Some("object"));
        assert_eq!(find(&Value::Undefined).as_deref(), Some("undefined"));
        assert!(find(&Value::Symbol(Symbol::new("opaque"))).is_none());
    }

    #[test]
    fn can_serialize() {
        let registry = TypeRegistry::standard();
        assert!(registry.can_serialize(&Value::from(42)));
        assert!(!registry.can_serialize(&Value::Symbol(Symbol::new("description"))));
    }

    #[test]
    fn without_removes_type() {
        let registry = TypeRegistry::standard_builder()
            .without("set")
            .build()
            .unwrap();
        assert!(registry.get("set").is_none());
        assert!(registry.find(&Value::set([Value::from(1)])).is_none());
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = TypeRegistry::standard_builder()
            .with(types::NullType)
            .build();
        assert!(matches!(result, Err(CodecError::InvalidRegistry(_))));
    }

    #[test]
    fn rejects_reserved_name() {
        struct RefType;

        impl TypeDescriptor for RefType {
            fn name(&self) -> &str {
                REF_TYPE
            }

            fn test(&self, _value: &Value) -> bool {
                false
            }

            fn encode(&self, _cx: &mut EncodeContext<'_>, _value: &Value) -> Result<Json> {
                Ok(Json::Null)
            }

            fn decode(&self, _cx: &mut DecodeContext<'_>, _payload: &Json) -> Result<Value> {
                Ok(Value::Null)
            }
        }

        let result = TypeRegistry::builder().with(RefType).build();
        assert!(matches!(result, Err(CodecError::InvalidRegistry(_))));
    }

    #[test]
    fn with_before_sets_priority() {
        let registry = TypeRegistry::builder()
            .with(types::ObjectType)
            .with_before("object", types::ArrayType)
            .build()
            .unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["array", "object"]);
    }
}
