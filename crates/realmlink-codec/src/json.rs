//! Conversions between plain JSON and realm values.

use serde_json::{Map as JsonMap, Value as Json};

use crate::value::{Object, Value};

/// Bound on chained custom conversions while rendering.
const MAX_CONVERSIONS: usize = 16;

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(value) => Value::Bool(value),
            Json::Number(number) => Value::Number(number.as_f64().unwrap_or(f64::NAN)),
            Json::String(text) => Value::from(text),
            Json::Array(items) => Value::array(items.into_iter().map(Value::from)),
            Json::Object(map) => Value::object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Plain JSON rendering, the way `JSON.stringify` would see the value.
    ///
    /// Lossy: undefined and non-finite numbers become null, undefined
    /// properties are skipped, maps become entry lists, sets become lists,
    /// functions become `"[function/N]"` and symbols their description.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(value) => Json::Bool(*value),
            Value::Number(number) => number_to_json(*number),
            Value::String(text) => Json::String(text.to_string()),
            Value::Array(items) | Value::Set(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => Json::Array(
                entries
                    .iter()
                    .map(|(key, value)| Json::Array(vec![key.to_json(), value.to_json()]))
                    .collect(),
            ),
            Value::Error(error) => {
                let mut map = JsonMap::new();
                map.insert("message".to_string(), Json::String(error.message().to_string()));
                insert_properties(&mut map, error.properties());
                Json::Object(map)
            }
            Value::Object(object) => {
                let mut map = JsonMap::new();
                insert_properties(&mut map, object);
                Json::Object(map)
            }
            Value::Function(function) => Json::String(format!("[function/{}]", function.arity())),
            Value::Symbol(symbol) => Json::String(format!("Symbol({})", symbol.description())),
            Value::Custom(_) => converted(self).map_or(Json::Null, |value| value.to_json()),
        }
    }
}

fn number_to_json(number: f64) -> Json {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        return Json::from(number as i64);
    }
    serde_json::Number::from_f64(number).map_or(Json::Null, Json::Number)
}

fn insert_properties(map: &mut JsonMap<String, Json>, object: &Object) {
    for (key, value) in object.iter() {
        if !value.is_undefined() {
            map.insert(key.to_string(), value.to_json());
        }
    }
}

fn converted(value: &Value) -> Option<Value> {
    let mut current = value.as_transmittable()?.to_transmittable("");
    for _ in 0..MAX_CONVERSIONS {
        match current.as_transmittable() {
            Some(transmittable) => current = transmittable.to_transmittable(""),
            None => return Some(current),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::function::Function;
    use crate::value::ErrorValue;

    #[test]
    fn json_becomes_values() {
        let value = Value::from(json!({"a": [1, "two", null], "b": {"c": true}}));
        let expected = Value::object(
            Object::new()
                .with(
                    "a",
                    Value::array([Value::from(1), Value::from("two"), Value::Null]),
                )
                .with("b", Object::new().with("c", true)),
        );
        assert_eq!(value, expected);
    }

    #[test]
    fn values_render_as_json() {
        let value = Value::object(
            Object::new()
                .with("skip", Value::Undefined)
                .with("n", f64::NAN)
                .with("f", Function::from_fn(2, |_| Ok(Value::Undefined)))
                .with("e", ErrorValue::new("bad").with("code", 7))
                .with("m", Value::map([(Value::from("k"), Value::from(1))])),
        );
        assert_eq!(
            value.to_json(),
            json!({
                "n": null,
                "f": "[function/2]",
                "e": {"message": "bad", "code": 7},
                "m": [["k", 1]]
            })
        );
    }
}
