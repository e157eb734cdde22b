//! JSON marshaling between typed values and host wire bytes.
//!
//! The host exchanges values as JSON checked against a static schema. Any
//! position the schema types as `Dynamic` carries its concrete type inline:
//!
//! ```json
//! {"value": <json value>, "type": <json type descriptor>}
//! ```
//!
//! so the static shape and its refinement always travel together.

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::RemoteStateError;
use crate::error::Result;
use crate::types::Type;
use crate::value::Data;
use crate::value::Number;
use crate::value::Value;

/// A value serialized for the host, relative to a static schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicValue {
    json: Vec<u8>,
}

impl DynamicValue {
    /// Serialize `value` against the static `schema`.
    ///
    /// Fails with `EncodingFailure` when the value does not conform.
    pub fn new(schema: &Type, value: &Value) -> Result<Self> {
        if !value.conforms_to(schema) {
            return Err(RemoteStateError::encoding(format!(
                "value of type {} does not conform to schema {}",
                value.ty(),
                schema
            )));
        }
        let json = marshal(value, schema)?;
        let bytes = serde_json::to_vec(&json).map_err(|e| RemoteStateError::encoding(e.to_string()))?;
        Ok(Self { json: bytes })
    }

    /// Wrap raw JSON bytes received from the host.
    pub fn from_json(bytes: impl Into<Vec<u8>>) -> Self {
        Self { json: bytes.into() }
    }

    /// Raw JSON bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.json
    }

    /// Decode against `schema`.
    ///
    /// Attributes absent from the JSON stay absent in the decoded object;
    /// attributes the schema does not know are rejected.
    pub fn unmarshal(&self, schema: &Type) -> Result<Value> {
        let json: serde_json::Value =
            serde_json::from_slice(&self.json).map_err(|e| RemoteStateError::decode("", format!("invalid JSON: {e}")))?;
        unmarshal(&json, schema, "")
    }
}

fn marshal(value: &Value, schema: &Type) -> Result<serde_json::Value> {
    if let Type::Dynamic = schema {
        return Ok(json!({
            "value": marshal(value, value.ty())?,
            "type": value.ty().to_json(),
        }));
    }

    match (value.data(), schema) {
        (Data::Null, _) => Ok(serde_json::Value::Null),
        (Data::String(s), _) => Ok(serde_json::Value::String(s.clone())),
        (Data::Number(n), _) => Ok(serde_json::Value::Number(n.to_json()?)),
        (Data::Bool(b), _) => Ok(serde_json::Value::Bool(*b)),
        (Data::Tuple(elements), Type::Tuple(element_types)) => elements
            .iter()
            .zip(element_types)
            .map(|(element, ty)| marshal(element, ty))
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array),
        (Data::Object(attributes), Type::Object(attribute_types)) => {
            let mut out = serde_json::Map::with_capacity(attributes.len());
            for (name, attr) in attributes {
                let ty = attribute_types
                    .get(name)
                    .ok_or_else(|| RemoteStateError::encoding(format!("attribute '{name}' not in schema")))?;
                out.insert(name.clone(), marshal(attr, ty)?);
            }
            Ok(serde_json::Value::Object(out))
        }
        _ => Err(RemoteStateError::encoding(format!(
            "{} value cannot be marshaled as {}",
            value.kind_name(),
            schema
        ))),
    }
}

fn unmarshal(json: &serde_json::Value, schema: &Type, path: &str) -> Result<Value> {
    if let Type::Dynamic = schema {
        return unmarshal_dynamic(json, path);
    }
    if json.is_null() {
        return Ok(Value::null(schema.clone()));
    }

    match schema {
        Type::String => json
            .as_str()
            .map(Value::string)
            .ok_or_else(|| mismatch(path, schema, json)),
        Type::Number => match json {
            serde_json::Value::Number(n) => Number::from_json(n)
                .map(Value::number)
                .ok_or_else(|| RemoteStateError::decode(path, format!("number {n} is not finite"))),
            _ => Err(mismatch(path, schema, json)),
        },
        Type::Bool => json.as_bool().map(Value::bool).ok_or_else(|| mismatch(path, schema, json)),
        Type::Tuple(element_types) => {
            let elements = json.as_array().ok_or_else(|| mismatch(path, schema, json))?;
            if elements.len() != element_types.len() {
                return Err(RemoteStateError::decode(
                    path,
                    format!("expected {} tuple elements, got {}", element_types.len(), elements.len()),
                ));
            }
            elements
                .iter()
                .zip(element_types)
                .enumerate()
                .map(|(i, (element, ty))| unmarshal(element, ty, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>>>()
                .map(Value::tuple)
        }
        Type::Object(attribute_types) => {
            let attrs = json.as_object().ok_or_else(|| mismatch(path, schema, json))?;
            let mut out = BTreeMap::new();
            for (name, attr) in attrs {
                let child = if path.is_empty() { name.clone() } else { format!("{path}.{name}") };
                let ty = attribute_types
                    .get(name)
                    .ok_or_else(|| RemoteStateError::decode(&child, "unsupported attribute"))?;
                out.insert(name.clone(), unmarshal(attr, ty, &child)?);
            }
            Ok(Value::object(out))
        }
        Type::Dynamic => unmarshal_dynamic(json, path),
    }
}

fn unmarshal_dynamic(json: &serde_json::Value, path: &str) -> Result<Value> {
    let wrapper = json
        .as_object()
        .ok_or_else(|| RemoteStateError::decode(path, "dynamic value must be a {value, type} object"))?;
    let ty = wrapper
        .get("type")
        .ok_or_else(|| RemoteStateError::decode(path, "dynamic value is missing 'type'"))?;
    let ty = Type::from_json(ty)?;
    if ty.contains_dynamic() {
        return Err(RemoteStateError::decode(path, "dynamic value must carry a concrete type"));
    }
    let inner = wrapper
        .get("value")
        .ok_or_else(|| RemoteStateError::decode(path, "dynamic value is missing 'value'"))?;
    unmarshal(inner, &ty, path)
}

fn mismatch(path: &str, schema: &Type, json: &serde_json::Value) -> RemoteStateError {
    RemoteStateError::decode(path, format!("expected {schema}, got {}", json_kind(json)))
}

pub(crate) fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(value: &DynamicValue) -> serde_json::Value {
        serde_json::from_slice(value.as_bytes()).expect("should be valid JSON")
    }

    #[test]
    fn static_object_marshals_plainly() {
        let schema = Type::object([("name", Type::String), ("count", Type::Number)]);
        let value = Value::object_from([("name", Value::string("x")), ("count", Value::number(3))]);
        let dv = DynamicValue::new(&schema, &value).expect("conforming value encodes");
        assert_eq!(to_json(&dv), json!({"name": "x", "count": 3}));
    }

    #[test]
    fn dynamic_position_carries_its_type() {
        let schema = Type::object([("payload", Type::Dynamic)]);
        let payload = Value::object_from([("foo", Value::tuple(vec![Value::string("a")]))]);
        let value = Value::object_from([("payload", payload)]);
        let dv = DynamicValue::new(&schema, &value).expect("conforming value encodes");
        assert_eq!(
            to_json(&dv),
            json!({
                "payload": {
                    "value": {"foo": ["a"]},
                    "type": ["object", {"foo": ["tuple", ["string"]]}],
                }
            })
        );
    }

    #[test]
    fn non_conforming_value_is_an_encoding_failure() {
        let schema = Type::object([("name", Type::String)]);
        let value = Value::object_from([("name", Value::bool(true))]);
        let err = DynamicValue::new(&schema, &value).expect_err("bool is not a string");
        assert!(matches!(err, RemoteStateError::EncodingFailure { .. }));
    }

    #[test]
    fn unmarshal_leaves_absent_attributes_out() {
        let schema = Type::object([("a", Type::String), ("b", Type::String)]);
        let record = DynamicValue::from_json(br#"{"a": "x"}"#.to_vec())
            .unmarshal(&schema)
            .expect("subset decodes");
        assert_eq!(record.get("a").and_then(Value::as_str), Some("x"));
        assert!(record.get("b").is_none());
    }

    #[test]
    fn unmarshal_keeps_nulls() {
        let schema = Type::object([("a", Type::String)]);
        let record = DynamicValue::from_json(br#"{"a": null}"#.to_vec())
            .unmarshal(&schema)
            .expect("null decodes");
        let a = record.get("a").expect("attribute present");
        assert!(a.is_null());
        assert_eq!(a.ty(), &Type::String);
    }

    #[test]
    fn unmarshal_rejects_unknown_attribute() {
        let schema = Type::object([("a", Type::String)]);
        let err = DynamicValue::from_json(br#"{"a": "x", "zzz": 1}"#.to_vec())
            .unmarshal(&schema)
            .expect_err("unknown attribute");
        assert_eq!(err, RemoteStateError::Decode {
            path: "zzz".to_string(),
            reason: "unsupported attribute".to_string(),
        });
    }

    #[test]
    fn unmarshal_reports_nested_path() {
        let schema = Type::object([("xs", Type::Tuple(vec![Type::String, Type::Bool]))]);
        let err = DynamicValue::from_json(br#"{"xs": ["a", "b"]}"#.to_vec())
            .unmarshal(&schema)
            .expect_err("second element is not a bool");
        match err {
            RemoteStateError::Decode { path, .. } => assert_eq!(path, "xs[1]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unmarshal_dynamic_wrapper() {
        let schema = Type::object([("payload", Type::Dynamic)]);
        let bytes = br#"{"payload": {"value": [1, true], "type": ["tuple", ["number", "bool"]]}}"#;
        let value = DynamicValue::from_json(bytes.to_vec()).unmarshal(&schema).expect("wrapper decodes");
        let payload = value.get("payload").expect("payload present");
        assert_eq!(payload.ty(), &Type::Tuple(vec![Type::Number, Type::Bool]));
    }

    #[test]
    fn unmarshal_dynamic_wrapper_requires_value() {
        let schema = Type::object([("payload", Type::Dynamic)]);
        let err = DynamicValue::from_json(br#"{"payload": {"type": "string"}}"#.to_vec())
            .unmarshal(&schema)
            .expect_err("wrapper without value");
        assert_eq!(err, RemoteStateError::Decode {
            path: "payload".to_string(),
            reason: "dynamic value is missing 'value'".to_string(),
        });
    }

    #[test]
    fn unmarshal_dynamic_wrapper_keeps_explicit_null() {
        let schema = Type::object([("payload", Type::Dynamic)]);
        let value = DynamicValue::from_json(br#"{"payload": {"value": null, "type": "string"}}"#.to_vec())
            .unmarshal(&schema)
            .expect("explicit null decodes");
        let payload = value.get("payload").expect("payload present");
        assert!(payload.is_null());
        assert_eq!(payload.ty(), &Type::String);
    }

    #[test]
    fn unmarshal_rejects_invalid_json() {
        let err = DynamicValue::from_json(b"{not json".to_vec())
            .unmarshal(&Type::String)
            .expect_err("garbage");
        assert!(matches!(err, RemoteStateError::Decode { .. }));
    }
}
