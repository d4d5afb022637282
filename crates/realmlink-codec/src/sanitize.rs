//! Advisory filtering of values before they are exported.
//!
//! Sanitizing drops data silently: function-valued properties and values no
//! descriptor can encode disappear from objects and errors, and any other
//! unsanitary value becomes null. Arrays, maps and sets are kept as they are.

use std::sync::Arc;

use crate::codec::standard_registry;
use crate::function::Function;
use crate::registry::TypeRegistry;
use crate::value::{ErrorValue, Object, Value};

/// Sanitizer bound to the registry that decides what is encodable.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    registry: Arc<TypeRegistry>,
}

impl Sanitizer {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    fn is_sanitary(&self, value: &Value) -> bool {
        !matches!(value, Value::Function(_)) && self.registry.can_serialize(value)
    }

    fn sanitize_object(&self, object: &Object) -> Object {
        object
            .iter()
            .filter(|(_, value)| self.is_sanitary(value))
            .map(|(key, value)| (key, self.sanitize(value)))
            .collect()
    }

    /// Copy of `value` holding only encodable, non-function data.
    pub fn sanitize(&self, value: &Value) -> Value {
        match value {
            Value::Error(error) => Value::error(ErrorValue::with_properties(
                error.message(),
                self.sanitize_object(error.properties()),
            )),
            Value::Object(object) => Value::object(self.sanitize_object(object)),
            other if self.is_sanitary(other) => other.clone(),
            _ => Value::Null,
        }
    }

    /// Wrap `function` so its arguments, result and thrown reason are sanitized.
    pub fn sanitize_function(&self, function: &Function) -> Function {
        let sanitizer = self.clone();
        let inner = function.clone();
        Function::new(function.arity(), move |args: Vec<Value>| {
            let sanitizer = sanitizer.clone();
            let args = args.iter().map(|arg| sanitizer.sanitize(arg)).collect();
            let call = inner.call(args);
            async move {
                match call.await {
                    Ok(value) => Ok(sanitizer.sanitize(&value)),
                    Err(reason) => Err(sanitizer.sanitize(&reason)),
                }
            }
        })
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(Arc::clone(standard_registry()))
    }
}

/// [`Sanitizer::sanitize`] with the standard registry.
pub fn sanitize(value: &Value) -> Value {
    Sanitizer::default().sanitize(value)
}

/// [`Sanitizer::sanitize_function`] with the standard registry.
pub fn sanitize_function(function: &Function) -> Function {
    Sanitizer::default().sanitize_function(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Symbol;

    fn noop() -> Function {
        Function::from_fn(0, |_| Ok(Value::Undefined))
    }

    #[test]
    fn drops_function_properties() {
        let value = Value::object(Object::new().with("a", 1).with("b", noop()));
        assert_eq!(sanitize(&value), Value::object(Object::new().with("a", 1)));
    }

    #[test]
    fn rebuilds_errors() {
        let error = Value::error(
            ErrorValue::new("broken")
                .with("code", 500)
                .with("retry", noop())
                .with("token", Symbol::new("secret")),
        );
        let clean = sanitize(&error);

        let clean = clean.as_error().unwrap();
        assert_eq!(clean.message(), "broken");
        assert_eq!(clean.get("code"), Some(&Value::from(500)));
        assert!(!clean.properties().contains_key("retry"));
        assert!(!clean.properties().contains_key("token"));
    }

    #[test]
    fn sanitizes_nested_objects() {
        let value = Value::object(
            Object::new().with("inner", Object::new().with("keep", "yes").with("drop", noop())),
        );
        let expected = Value::object(Object::new().with("inner", Object::new().with("keep", "yes")));
        assert_eq!(sanitize(&value), expected);
    }

    #[test]
    fn unsanitary_top_level_becomes_null() {
        assert_eq!(sanitize(&noop().into()), Value::Null);
        assert_eq!(sanitize(&Symbol::new("opaque").into()), Value::Null);
    }

    #[test]
    fn arrays_pass_through() {
        let array = Value::array([Value::from(1), noop().into()]);
        assert!(sanitize(&array).same(&array));
    }

    #[tokio::test]
    async fn wrapped_function_sanitizes_both_ways() {
        let leaky = Function::new(1, |args: Vec<Value>| async move {
            let seen = args.into_iter().next().unwrap_or(Value::Undefined);
            Err(Value::error(
                ErrorValue::new("request failed")
                    .with("request", seen)
                    .with("abort", Function::from_fn(0, |_| Ok(Value::Undefined))),
            ))
        });
        let safe = sanitize_function(&leaky);
        assert_eq!(safe.arity(), 1);

        let arg = Value::object(Object::new().with("url", "/x").with("callback", noop()));
        let reason = safe.call(vec![arg]).await.unwrap_err();
        let error = reason.as_error().unwrap();
        assert_eq!(error.message(), "request failed");
        assert!(!error.properties().contains_key("abort"));
        assert_eq!(
            error.get("request"),
            Some(&Value::object(Object::new().with("url", "/x")))
        );
    }
}
