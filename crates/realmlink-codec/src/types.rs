//! The standard wire vocabulary.

use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as Json};

use crate::context::{DecodeContext, EncodeContext};
use crate::error::{CodecError, Result};
use crate::registry::TypeDescriptor;
use crate::value::{ErrorValue, Object, Value};

/// Largest magnitude at which every integer is exact in an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Descriptors in standard priority order.
pub(crate) fn standard() -> Vec<Arc<dyn TypeDescriptor>> {
    vec![
        Arc::new(BooleanType),
        Arc::new(NullType),
        Arc::new(NumberType),
        Arc::new(StringType),
        Arc::new(UndefinedType),
        Arc::new(ArrayType),
        Arc::new(ErrorType),
        Arc::new(FunctionType),
        Arc::new(MapType),
        Arc::new(SetType),
        Arc::new(ObjectType),
    ]
}

fn mismatch(descriptor: &str, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        descriptor: descriptor.to_string(),
        actual: value.kind(),
    }
}

/// Text form of a number, as a property key would spell it.
pub(crate) fn number_text(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_infinite() {
        let text = if number > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}

/// Reviver key for a map entry.
fn map_key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.to_string(),
        Value::Number(number) => number_text(*number),
        _ => String::new(),
    }
}

fn entries<'j>(type_name: &str, payload: &'j Json) -> Result<&'j [Json]> {
    payload
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| CodecError::malformed(type_name, "expected a list"))
}

fn pair<'j>(type_name: &str, entry: &'j Json) -> Result<(&'j Json, &'j Json)> {
    match entry.as_array().map(Vec::as_slice) {
        Some([first, second]) => Ok((first, second)),
        _ => Err(CodecError::malformed(type_name, "expected a two-element entry")),
    }
}

fn encode_properties(cx: &mut EncodeContext<'_>, object: &Object) -> Result<Json> {
    let mut encoded = Vec::with_capacity(object.len());
    for (key, value) in object.iter() {
        let code = cx.encode(value, key)?;
        encoded.push(Json::Array(vec![Json::String(key.to_string()), code]));
    }
    Ok(Json::Array(encoded))
}

fn decode_properties(
    cx: &mut DecodeContext<'_>,
    type_name: &str,
    payload: &Json,
) -> Result<Object> {
    let mut object = Object::new();
    for entry in entries(type_name, payload)? {
        let (key, code) = pair(type_name, entry)?;
        let key = key
            .as_str()
            .ok_or_else(|| CodecError::malformed(type_name, "property keys must be strings"))?;
        let value = cx.decode(code, key)?;
        object.insert(key, value);
    }
    Ok(object)
}

pub struct BooleanType;

impl TypeDescriptor for BooleanType {
    fn name(&self) -> &str {
        "boolean"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn encode(&self, _cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        value
            .as_bool()
            .map(Json::Bool)
            .ok_or_else(|| mismatch(self.name(), value))
    }

    fn decode(&self, _cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        payload
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| CodecError::malformed(self.name(), "expected true or false"))
    }
}

pub struct NullType;

impl TypeDescriptor for NullType {
    fn name(&self) -> &str {
        "null"
    }

    fn test(&self, value: &Value) -> bool {
        value.is_null()
    }

    fn encode(&self, _cx: &mut EncodeContext<'_>, _value: &Value) -> Result<Json> {
        Ok(Json::Null)
    }

    fn decode(&self, _cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        match payload {
            Json::Null => Ok(Value::Null),
            _ => Err(CodecError::malformed(self.name(), "expected null")),
        }
    }
}

/// Finite numbers travel as JSON numbers, the rest as `"NaN"`,
/// `"Infinity"` or `"-Infinity"`.
pub struct NumberType;

impl TypeDescriptor for NumberType {
    fn name(&self) -> &str {
        "number"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Number(_))
    }

    fn encode(&self, _cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        let number = value.as_f64().ok_or_else(|| mismatch(self.name(), value))?;
        if !number.is_finite() {
            return Ok(Json::String(number_text(number)));
        }
        let negative_zero = number == 0.0 && number.is_sign_negative();
        if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER && !negative_zero {
            return Ok(Json::from(number as i64));
        }
        serde_json::Number::from_f64(number)
            .map(Json::Number)
            .ok_or_else(|| mismatch(self.name(), value))
    }

    fn decode(&self, _cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        let number = match payload {
            Json::Number(number) => number.as_f64(),
            Json::String(text) => match text.as_str() {
                "NaN" => Some(f64::NAN),
                "Infinity" => Some(f64::INFINITY),
                "-Infinity" => Some(f64::NEG_INFINITY),
                _ => None,
            },
            _ => None,
        };
        number
            .map(Value::Number)
            .ok_or_else(|| CodecError::malformed(self.name(), "expected a number"))
    }
}

pub struct StringType;

impl TypeDescriptor for StringType {
    fn name(&self) -> &str {
        "string"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn encode(&self, _cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        value
            .as_str()
            .map(|text| Json::String(text.to_string()))
            .ok_or_else(|| mismatch(self.name(), value))
    }

    fn decode(&self, _cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        payload
            .as_str()
            .map(Value::string)
            .ok_or_else(|| CodecError::malformed(self.name(), "expected a string"))
    }
}

pub struct UndefinedType;

impl TypeDescriptor for UndefinedType {
    fn name(&self) -> &str {
        "undefined"
    }

    fn test(&self, value: &Value) -> bool {
        value.is_undefined()
    }

    fn encode(&self, _cx: &mut EncodeContext<'_>, _value: &Value) -> Result<Json> {
        Ok(Json::Null)
    }

    fn decode(&self, _cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        match payload {
            Json::Null => Ok(Value::Undefined),
            _ => Err(CodecError::malformed(self.name(), "expected null")),
        }
    }
}

/// Elements are keyed by index.
pub struct ArrayType;

impl TypeDescriptor for ArrayType {
    fn name(&self) -> &str {
        "array"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Array(_))
    }

    fn encode(&self, cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        let items = value.as_array().ok_or_else(|| mismatch(self.name(), value))?;
        let mut encoded = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            encoded.push(cx.encode(item, &index.to_string())?);
        }
        Ok(Json::Array(encoded))
    }

    fn decode(&self, cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        let codes = entries(self.name(), payload)?;
        let mut items = Vec::with_capacity(codes.len());
        for (index, code) in codes.iter().enumerate() {
            items.push(cx.decode(code, &index.to_string())?);
        }
        Ok(Value::from(items))
    }

    fn shares_identity(&self) -> bool {
        true
    }
}

/// `{"message": EncodedValue, "entries": [[key, EncodedValue]...]}`.
pub struct ErrorType;

impl TypeDescriptor for ErrorType {
    fn name(&self) -> &str {
        "error"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Error(_))
    }

    fn encode(&self, cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        let error = value.as_error().ok_or_else(|| mismatch(self.name(), value))?;
        let mut payload = JsonMap::new();
        payload.insert(
            "message".to_string(),
            cx.encode(&Value::string(error.message()), "")?,
        );
        payload.insert(
            "entries".to_string(),
            encode_properties(cx, error.properties())?,
        );
        Ok(Json::Object(payload))
    }

    fn decode(&self, cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        let message = payload
            .get("message")
            .ok_or_else(|| CodecError::malformed(self.name(), "missing message"))?;
        let message = cx.decode(message, "")?;
        let message = message
            .as_str()
            .ok_or_else(|| CodecError::malformed(self.name(), "message must be a string"))?;

        let properties = match payload.get("entries") {
            Some(entries) => decode_properties(cx, self.name(), entries)?,
            None => Object::new(),
        };
        Ok(Value::error(ErrorValue::with_properties(message, properties)))
    }

    fn shares_identity(&self) -> bool {
        true
    }
}

/// `{"key": string, "arity": integer}`, resolved through the context's binder.
pub struct FunctionType;

impl TypeDescriptor for FunctionType {
    fn name(&self) -> &str {
        "function"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Function(_))
    }

    fn encode(&self, cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        let function = value
            .as_function()
            .ok_or_else(|| mismatch(self.name(), value))?;
        let binder = cx.binder().ok_or(CodecError::FunctionOutsideExports)?;
        let key = binder.export_function(function);

        let mut payload = JsonMap::new();
        payload.insert("key".to_string(), Json::String(key));
        payload.insert("arity".to_string(), Json::from(function.arity()));
        Ok(Json::Object(payload))
    }

    fn decode(&self, cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        let key = payload
            .get("key")
            .and_then(Json::as_str)
            .ok_or_else(|| CodecError::malformed(self.name(), "missing key"))?;
        let arity = payload
            .get("arity")
            .and_then(Json::as_u64)
            .and_then(|arity| usize::try_from(arity).ok())
            .ok_or_else(|| CodecError::malformed(self.name(), "missing arity"))?;
        let binder = cx.binder().ok_or(CodecError::FunctionOutsideExports)?;
        Ok(Value::Function(binder.import_function(key, arity)))
    }
}

/// Entries are `[key, value]` pairs of encoded values.
pub struct MapType;

impl TypeDescriptor for MapType {
    fn name(&self) -> &str {
        "map"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn encode(&self, cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        let map = value.as_map().ok_or_else(|| mismatch(self.name(), value))?;
        let mut encoded = Vec::with_capacity(map.len());
        for (key, item) in map.iter() {
            let key_code = cx.encode(key, "")?;
            let item_code = cx.encode(item, &map_key_text(key))?;
            encoded.push(Json::Array(vec![key_code, item_code]));
        }
        Ok(Json::Array(encoded))
    }

    fn decode(&self, cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        let codes = entries(self.name(), payload)?;
        let mut map = Vec::with_capacity(codes.len());
        for entry in codes {
            let (key_code, item_code) = pair(self.name(), entry)?;
            let key = cx.decode(key_code, "")?;
            let item = cx.decode(item_code, &map_key_text(&key))?;
            map.push((key, item));
        }
        Ok(Value::map(map))
    }

    fn shares_identity(&self) -> bool {
        true
    }
}

pub struct SetType;

impl TypeDescriptor for SetType {
    fn name(&self) -> &str {
        "set"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Set(_))
    }

    fn encode(&self, cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        let items = value.as_set().ok_or_else(|| mismatch(self.name(), value))?;
        let mut encoded = Vec::with_capacity(items.len());
        for item in items.iter() {
            encoded.push(cx.encode(item, "")?);
        }
        Ok(Json::Array(encoded))
    }

    fn decode(&self, cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        let codes = entries(self.name(), payload)?;
        let mut items = Vec::with_capacity(codes.len());
        for code in codes {
            items.push(cx.decode(code, "")?);
        }
        Ok(Value::set(items))
    }

    fn shares_identity(&self) -> bool {
        true
    }
}

pub struct ObjectType;

impl TypeDescriptor for ObjectType {
    fn name(&self) -> &str {
        "object"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Object(_))
    }

    fn encode(&self, cx: &mut EncodeContext<'_>, value: &Value) -> Result<Json> {
        let object = value
            .as_object()
            .ok_or_else(|| mismatch(self.name(), value))?;
        encode_properties(cx, object)
    }

    fn decode(&self, cx: &mut DecodeContext<'_>, payload: &Json) -> Result<Value> {
        Ok(Value::object(decode_properties(cx, self.name(), payload)?))
    }

    fn shares_identity(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::Codec;

    #[test]
    fn number_text_matches_property_keys() {
        assert_eq!(number_text(3.0), "3");
        assert_eq!(number_text(-0.5), "-0.5");
        assert_eq!(number_text(f64::NAN), "NaN");
        assert_eq!(number_text(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn numbers_keep_their_shape() {
        let codec = Codec::default();
        let encode = |n: f64| codec.encode_without_references(&Value::Number(n)).unwrap();

        assert_eq!(encode(7.0), json!(["number", 7]));
        assert_eq!(encode(0.25), json!(["number", 0.25]));
        assert_eq!(encode(f64::INFINITY), json!(["number", "Infinity"]));

        let negative_zero = codec.decode_plain(&encode(-0.0)).unwrap();
        assert!(negative_zero.as_f64().unwrap().is_sign_negative());
    }

    #[test]
    fn undefined_and_null_are_distinct() {
        let codec = Codec::default();
        assert_eq!(
            codec.encode_without_references(&Value::Undefined).unwrap(),
            json!(["undefined", null])
        );
        assert_eq!(
            codec.decode_plain(&json!(["undefined", null])).unwrap(),
            Value::Undefined
        );
        assert_eq!(codec.decode_plain(&json!(["null", null])).unwrap(), Value::Null);
    }

    #[test]
    fn map_with_composite_keys() {
        let key = Value::array([Value::from(1)]);
        let map = Value::map([(key.clone(), Value::from("one")), (Value::from(2), key)]);

        let codec = Codec::default();
        let code = codec.encode_without_references(&map).unwrap();
        assert_eq!(
            code,
            json!(["map", [
                [["array", [["number", 1]]], ["string", "one"]],
                [["number", 2], ["ref", 1]]
            ]])
        );

        let decoded = codec.decode_plain(&code).unwrap();
        let entries = decoded.as_map().unwrap();
        assert!(entries[0].0.same(&entries[1].1));
    }

    #[test]
    fn error_without_entries_decodes() {
        let decoded = Codec::default()
            .decode_plain(&json!(["error", {"message": ["string", "plain"]}]))
            .unwrap();
        assert_eq!(decoded.as_error().map(ErrorValue::message), Some("plain"));
    }

    #[test]
    fn error_message_must_be_text() {
        let err = Codec::default()
            .decode_plain(&json!(["error", {"message": ["number", 1], "entries": []}]))
            .unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn function_decode_needs_binder() {
        let err = Codec::default()
            .decode_plain(&json!(["function", {"key": "abc", "arity": 1}]))
            .unwrap_err();
        assert!(matches!(err, CodecError::FunctionOutsideExports));
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let registry = crate::registry::TypeRegistry::standard();
        let mut cx = EncodeContext::new(&registry, None);
        let err = ArrayType.encode(&mut cx, &Value::Null).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeMismatch { actual: "null", .. }
        ));
    }
}
