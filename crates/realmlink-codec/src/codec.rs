use std::sync::{Arc, OnceLock};

use serde_json::Value as Json;

use crate::context::{DecodeContext, EncodeContext, FunctionBinder};
use crate::error::{CodecError, Result};
use crate::inspect::inspect;
use crate::registry::TypeRegistry;
use crate::value::Value;

/// Wire type for a back-reference to an earlier composite in the same payload.
pub const REF_TYPE: &str = "ref";

/// An encoded value: `[typeName, payload]`.
pub type Encoded = Json;

/// Build the `[name, payload]` pair.
pub fn tagged(name: &str, payload: Json) -> Encoded {
    Json::Array(vec![Json::String(name.to_string()), payload])
}

/// Split an encoded value into its type name and payload.
pub fn untag(code: &Json) -> Result<(&str, &Json)> {
    match code.as_array().map(Vec::as_slice) {
        Some([Json::String(name), payload]) => Ok((name.as_str(), payload)),
        _ => Err(CodecError::malformed(
            "encoded value",
            "expected a [typeName, payload] pair",
        )),
    }
}

/// Process-wide standard registry.
pub fn standard_registry() -> &'static Arc<TypeRegistry> {
    static STANDARD: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
    STANDARD.get_or_init(|| Arc::new(TypeRegistry::standard()))
}

/// Encoder and decoder bound to one registry.
///
/// Every call builds a fresh context, so identity is shared within one
/// payload and never across payloads.
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<TypeRegistry>,
}

impl Codec {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Encode `value`. Functions are exported through `binder`; without one
    /// they fail with [`CodecError::FunctionOutsideExports`].
    pub fn encode(&self, value: &Value, binder: Option<&dyn FunctionBinder>) -> Result<Encoded> {
        let mut cx = EncodeContext::new(&self.registry, binder);
        cx.encode(value, "").map_err(|source| {
            tracing::trace!(error = %source, "encode failed");
            CodecError::Encode {
                value: inspect(value),
                source: Box::new(source),
            }
        })
    }

    /// Encode a value that must not carry live references.
    pub fn encode_without_references(&self, value: &Value) -> Result<Encoded> {
        self.encode(value, None)
    }

    /// Decode `code`, handing every decoded value to `reviver`.
    pub fn decode(
        &self,
        code: &Json,
        binder: Option<&dyn FunctionBinder>,
        reviver: &(dyn Fn(&str, Value) -> Value + Send + Sync),
    ) -> Result<Value> {
        let mut cx = DecodeContext::new(&self.registry, binder, reviver);
        let decoded = cx.decode(code, "");
        if let Err(err) = &decoded {
            tracing::trace!(error = %err, "decode failed");
        }
        decoded
    }

    /// Decode with the identity reviver and no live references.
    pub fn decode_plain(&self, code: &Json) -> Result<Value> {
        self.decode(code, None, &|_, value| value)
    }

    pub fn can_serialize(&self, value: &Value) -> bool {
        self.registry.can_serialize(value)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Arc::clone(standard_registry()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::function::Function;
    use crate::registry::TypeDescriptor;
    use crate::value::{ErrorValue, Object, Symbol, Transmittable};

    fn round_trip(value: &Value) -> Value {
        let codec = Codec::default();
        let code = codec.encode_without_references(value).unwrap();
        let text = serde_json::to_string(&code).unwrap();
        let parsed: Json = serde_json::from_str(&text).unwrap();
        codec.decode_plain(&parsed).unwrap()
    }

    #[test]
    fn primitives_round_trip() {
        for value in [
            Value::Undefined,
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::from(0),
            Value::from(-17.25),
            Value::Number(f64::NAN),
            Value::Number(f64::INFINITY),
            Value::Number(f64::NEG_INFINITY),
            Value::from(""),
            Value::from("hëllo"),
        ] {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn composites_round_trip() {
        let value = Value::object(
            Object::new()
                .with("list", Value::array([Value::from(1), Value::from("two")]))
                .with(
                    "lookup",
                    Value::map([
                        (Value::from("k"), Value::from(true)),
                        (Value::from(3), Value::Null),
                    ]),
                )
                .with("members", Value::set([Value::from(1), Value::from(2)]))
                .with("nothing", Value::Undefined)
                .with("failure", ErrorValue::new("boom").with("code", 42)),
        );
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn wire_shapes() {
        let codec = Codec::default();
        let code = codec
            .encode_without_references(&Value::object(
                Object::new()
                    .with("n", 1)
                    .with("e", ErrorValue::new("bad").with("why", "because")),
            ))
            .unwrap();

        assert_eq!(
            code,
            json!(["object", [
                ["n", ["number", 1]],
                ["e", ["error", {
                    "message": ["string", "bad"],
                    "entries": [["why", ["string", "because"]]]
                }]]
            ]])
        );
    }

    #[test]
    fn repeated_object_decodes_to_one_value() {
        let shared = Value::object(Object::new().with("a", 1));
        let value = Value::array([shared.clone(), shared]);

        let codec = Codec::default();
        let code = codec.encode_without_references(&value).unwrap();
        assert_eq!(code, json!(["array", [["object", [["a", ["number", 1]]]], ["ref", 1]]]));

        let decoded = codec.decode_plain(&code).unwrap();
        let a = decoded.index(0).unwrap();
        let b = decoded.index(1).unwrap();
        assert!(a.same(b));
    }

    #[test]
    fn array_and_set_over_one_allocation_keep_their_kinds() {
        let items: Arc<[Value]> = Arc::from(vec![Value::from(1)]);
        let value = Value::array([Value::Array(items.clone()), Value::Set(items)]);

        let codec = Codec::default();
        let code = codec.encode_without_references(&value).unwrap();
        assert_eq!(
            code,
            json!(["array", [
                ["array", [["number", 1]]],
                ["set", [["number", 1]]]
            ]])
        );

        let decoded = codec.decode_plain(&code).unwrap();
        assert_eq!(decoded.index(0).map(Value::kind), Some("array"));
        assert_eq!(decoded.index(1).map(Value::kind), Some("set"));
    }

    #[test]
    fn repeated_custom_value_converts_once() {
        let sentinel = Value::custom(Sentinel);
        let value = Value::array([sentinel.clone(), sentinel]);

        let codec = Codec::default();
        let code = codec.encode_without_references(&value).unwrap();
        assert_eq!(code[1][1], json!(["ref", 1]));

        let decoded = codec.decode_plain(&code).unwrap();
        assert!(decoded.index(0).unwrap().same(decoded.index(1).unwrap()));
    }

    #[derive(Debug)]
    struct Nested(Value);

    impl Transmittable for Nested {
        fn to_transmittable(&self, _key: &str) -> Value {
            Value::array([self.0.clone()])
        }
    }

    #[test]
    fn nested_custom_values_share_identity() {
        let inner = Value::custom(Sentinel);
        let outer = Value::custom(Nested(inner.clone()));
        let value = Value::array([outer.clone(), inner, outer]);

        let decoded = round_trip(&value);
        assert!(decoded.index(0).unwrap().same(decoded.index(2).unwrap()));
        let first_inner = decoded.index(0).and_then(|outer| outer.index(0)).unwrap();
        assert!(first_inner.same(decoded.index(1).unwrap()));
    }

    #[test]
    fn identity_is_not_shared_across_payloads() {
        let shared = Value::object(Object::new());
        let codec = Codec::default();
        let first = codec.decode_plain(&codec.encode_without_references(&shared).unwrap());
        let second = codec.decode_plain(&codec.encode_without_references(&shared).unwrap());
        assert!(!first.unwrap().same(&second.unwrap()));
    }

    #[test]
    fn equal_but_distinct_values_stay_distinct() {
        let value = Value::array([Value::object(Object::new()), Value::object(Object::new())]);
        let decoded = round_trip(&value);
        assert!(!decoded.index(0).unwrap().same(decoded.index(1).unwrap()));
    }

    #[test]
    fn symbol_is_unsupported() {
        let codec = Codec::default();
        let err = codec
            .encode_without_references(&Value::object(
                Object::new().with("s", Symbol::new("opaque")),
            ))
            .unwrap_err();
        assert!(matches!(err.root(), CodecError::UnsupportedType(_)));
        assert!(err.to_string().starts_with("exception while encoding {"));
    }

    #[test]
    fn function_without_binder_fails() {
        let codec = Codec::default();
        let f = Function::from_fn(0, |_| Ok(Value::Undefined));
        let err = codec
            .encode_without_references(&Value::array([f.into()]))
            .unwrap_err();
        assert!(matches!(err.root(), CodecError::FunctionOutsideExports));
        assert!(err
            .to_string()
            .ends_with("cannot encode functions outside of exports"));
    }

    #[test]
    fn unknown_type_fails() {
        let err = Codec::default()
            .decode_plain(&json!(["bigint", "12"]))
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(name) if name == "bigint"));
    }

    #[test]
    fn malformed_code_fails() {
        let codec = Codec::default();
        assert!(matches!(
            codec.decode_plain(&json!({"type": "null"})),
            Err(CodecError::Malformed { .. })
        ));
        assert!(matches!(
            codec.decode_plain(&json!(["array", {"0": 1}])),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn forward_reference_is_dangling() {
        let err = Codec::default()
            .decode_plain(&json!(["array", [["ref", 3]]]))
            .unwrap_err();
        assert!(matches!(err, CodecError::DanglingReference(3)));
    }

    #[test]
    fn reviver_sees_keys() {
        let seen = Mutex::new(Vec::new());
        let reviver = |key: &str, value: Value| {
            seen.lock().unwrap().push(key.to_string());
            value
        };

        let value = Value::object(
            Object::new()
                .with("list", Value::array([Value::from(1)]))
                .with(
                    "lookup",
                    Value::map([(Value::from("k"), Value::from(2))]),
                ),
        );
        let codec = Codec::default();
        let code = codec.encode_without_references(&value).unwrap();
        codec.decode(&code, None, &reviver).unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec!["0", "list", "", "k", "lookup", ""]);
    }

    #[derive(Debug)]
    struct Sentinel;

    impl Transmittable for Sentinel {
        fn to_transmittable(&self, _key: &str) -> Value {
            Value::object(Object::new().with("type", "symbol").with("description", "wat"))
        }
    }

    #[test]
    fn custom_conversion_and_reviver_restore_sentinel() {
        let sentinel = Value::custom(Sentinel);
        let value = Value::object(Object::new().with("marker", sentinel.clone()));

        let codec = Codec::default();
        let code = codec.encode_without_references(&value).unwrap();

        let restored = sentinel.clone();
        let reviver = move |_: &str, value: Value| match value.as_object() {
            Some(object)
                if object.get("type") == Some(&Value::from("symbol"))
                    && object.get("description") == Some(&Value::from("wat")) =>
            {
                restored.clone()
            }
            _ => value,
        };
        let decoded = codec.decode(&code, None, &reviver).unwrap();
        assert!(decoded.get("marker").unwrap().same(&sentinel));
    }

    #[derive(Debug)]
    struct Loop;

    impl Transmittable for Loop {
        fn to_transmittable(&self, _key: &str) -> Value {
            Value::custom(Loop)
        }
    }

    #[test]
    fn endless_conversion_is_bounded() {
        let err = Codec::default()
            .encode_without_references(&Value::custom(Loop))
            .unwrap_err();
        assert!(matches!(err.root(), CodecError::ConversionLimit(_)));
    }

    struct SymbolType;

    impl TypeDescriptor for SymbolType {
        fn name(&self) -> &str {
            "symbol"
        }

        fn test(&self, value: &Value) -> bool {
            matches!(value, Value::Symbol(_))
        }

        fn encode(&self, _cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
            let description = value.as_symbol().map(Symbol::description).unwrap_or("");
            Ok(Json::String(description.to_string()))
        }

        fn decode(&self, _cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
            let description = payload
                .as_str()
                .ok_or_else(|| CodecError::malformed("symbol", "expected a string"))?;
            Ok(Value::Symbol(Symbol::new(description)))
        }
    }

    #[test]
    fn injected_registry_teaches_new_type() {
        let registry = TypeRegistry::standard_builder()
            .with_before("object", SymbolType)
            .build()
            .unwrap();
        let codec = Codec::new(Arc::new(registry));

        let code = codec
            .encode_without_references(&Symbol::new("wat").into())
            .unwrap();
        assert_eq!(code, json!(["symbol", "wat"]));

        let decoded = codec.decode_plain(&code).unwrap();
        assert_eq!(decoded.as_symbol().map(Symbol::description), Some("wat"));
        assert!(Codec::default().decode_plain(&code).is_err());
    }
}
