//! Typed values paired with their descriptors.
//!
//! A [`Value`] owns its concrete [`Type`]. The constructors derive the type
//! from the data (or take it explicitly for nulls), so a value tree and its
//! descriptor tree can only be built together and never drift apart.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RemoteStateError;
use crate::error::Result;
use crate::types::Type;

/// Arbitrary-precision decimal number kept as canonical decimal text.
///
/// Integers are stored exactly. Floats use the shortest decimal text that
/// round-trips, without exponent notation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(Box<str>);

impl Number {
    /// Build from a finite float. Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            // Fold negative zero.
            return Some(Number("0".into()));
        }
        Some(Number(value.to_string().into_boxed_str()))
    }

    /// Widen a JSON number without losing integer precision.
    pub fn from_json(number: &serde_json::Number) -> Option<Self> {
        if let Some(i) = number.as_i64() {
            return Some(Number::from(i));
        }
        if let Some(u) = number.as_u64() {
            return Some(Number::from(u));
        }
        number.as_f64().and_then(Number::from_f64)
    }

    /// Canonical decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value as `i64`, when it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// The value as `u64`, when it is a non-negative integer in range.
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// The value as the nearest `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }

    /// Narrow to a JSON number for transmission.
    ///
    /// Integers within `i64`/`u64` stay exact; everything else goes through
    /// `f64`.
    pub fn to_json(&self) -> Result<serde_json::Number> {
        if let Some(i) = self.as_i64() {
            return Ok(serde_json::Number::from(i));
        }
        if let Some(u) = self.as_u64() {
            return Ok(serde_json::Number::from(u));
        }
        self.as_f64()
            .and_then(serde_json::Number::from_f64)
            .ok_or_else(|| RemoteStateError::encoding(format!("number {} is not representable in JSON", self.0)))
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(value.to_string().into_boxed_str())
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number(value.to_string().into_boxed_str())
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::from(i64::from(value))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// Null of the paired type.
    Null,
    /// String payload.
    String(String),
    /// Number payload.
    Number(Number),
    /// Boolean payload.
    Bool(bool),
    /// Tuple elements in order.
    Tuple(Vec<Value>),
    /// Object attributes by name.
    Object(BTreeMap<String, Value>),
}

/// A concrete value together with its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    ty: Type,
    data: Data,
}

impl Value {
    /// String value.
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            ty: Type::String,
            data: Data::String(value.into()),
        }
    }

    /// Number value.
    pub fn number(value: impl Into<Number>) -> Self {
        Self {
            ty: Type::Number,
            data: Data::Number(value.into()),
        }
    }

    /// Boolean value.
    pub fn bool(value: bool) -> Self {
        Self {
            ty: Type::Bool,
            data: Data::Bool(value),
        }
    }

    /// Null of the given type.
    pub fn null(ty: Type) -> Self {
        Self { ty, data: Data::Null }
    }

    /// Tuple whose element types are taken from the elements.
    pub fn tuple(elements: Vec<Value>) -> Self {
        let ty = Type::Tuple(elements.iter().map(|e| e.ty.clone()).collect());
        Self {
            ty,
            data: Data::Tuple(elements),
        }
    }

    /// Object whose attribute types are taken from the attribute values.
    pub fn object(attributes: BTreeMap<String, Value>) -> Self {
        let ty = Type::Object(attributes.iter().map(|(name, v)| (name.clone(), v.ty.clone())).collect());
        Self {
            ty,
            data: Data::Object(attributes),
        }
    }

    /// Object built from `(name, value)` pairs.
    pub fn object_from<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::object(attributes.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Concrete type of this value.
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Payload of this value.
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Whether this is a null.
    pub fn is_null(&self) -> bool {
        matches!(self.data, Data::Null)
    }

    /// Short kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self.data {
            Data::Null => "null",
            Data::String(_) => "string",
            Data::Number(_) => "number",
            Data::Bool(_) => "bool",
            Data::Tuple(_) => "tuple",
            Data::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            Data::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match &self.data {
            Data::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            Data::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match &self.data {
            Data::Tuple(elements) => Some(elements.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.data {
            Data::Object(attributes) => Some(attributes),
            _ => None,
        }
    }

    /// Attribute lookup on an object value.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.as_object().and_then(|attrs| attrs.get(attribute))
    }

    /// Whether this value may sit at a position typed `schema`.
    ///
    /// `Dynamic` accepts anything; objects need the exact same attribute set
    /// and tuples the same length.
    pub fn conforms_to(&self, schema: &Type) -> bool {
        type_conforms(&self.ty, schema)
    }
}

fn type_conforms(actual: &Type, schema: &Type) -> bool {
    match (actual, schema) {
        (_, Type::Dynamic) => true,
        (Type::String, Type::String) | (Type::Number, Type::Number) | (Type::Bool, Type::Bool) => true,
        (Type::Tuple(actual), Type::Tuple(schema)) => {
            actual.len() == schema.len() && actual.iter().zip(schema).all(|(a, s)| type_conforms(a, s))
        }
        (Type::Object(actual), Type::Object(schema)) => {
            actual.len() == schema.len()
                && actual
                    .iter()
                    .all(|(name, a)| schema.get(name).is_some_and(|s| type_conforms(a, s)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_kept_exactly() {
        let big = Number::from(i64::MAX);
        assert_eq!(big.as_str(), "9223372036854775807");
        assert_eq!(big.as_i64(), Some(i64::MAX));

        let bigger = Number::from(u64::MAX);
        assert_eq!(bigger.to_json().expect("fits u64"), serde_json::Number::from(u64::MAX));
    }

    #[test]
    fn floats_use_plain_decimal_text() {
        assert_eq!(Number::from_f64(1.5).expect("finite").as_str(), "1.5");
        assert_eq!(Number::from_f64(3.0).expect("finite"), Number::from(3));
        assert_eq!(Number::from_f64(-0.0).expect("finite").as_str(), "0");
        assert!(Number::from_f64(f64::NAN).is_none());
        assert!(Number::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn json_numbers_widen_without_loss() {
        let n: serde_json::Number = serde_json::from_str("123").expect("valid number");
        assert_eq!(Number::from_json(&n), Some(Number::from(123)));

        let f: serde_json::Number = serde_json::from_str("0.25").expect("valid number");
        assert_eq!(Number::from_json(&f).expect("finite").as_f64(), Some(0.25));
    }

    #[test]
    fn tuple_type_follows_elements() {
        let v = Value::tuple(vec![Value::string("a"), Value::string("b")]);
        assert_eq!(v.ty(), &Type::Tuple(vec![Type::String, Type::String]));
        assert_eq!(v.as_tuple().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn object_type_follows_attributes() {
        let v = Value::object_from([("hello", Value::string("world")), ("quuz", Value::bool(false))]);
        assert_eq!(v.ty(), &Type::object([("hello", Type::String), ("quuz", Type::Bool)]));
        assert_eq!(v.get("hello").and_then(Value::as_str), Some("world"));
        assert!(v.get("missing").is_none());
    }

    #[test]
    fn conforms_to_dynamic_hole() {
        let payload = Value::object_from([("n", Value::number(1))]);
        let envelope = Value::object_from([("workspace", Value::string("ws")), ("payload", payload)]);
        let schema = Type::object([("workspace", Type::String), ("payload", Type::Dynamic)]);
        assert!(envelope.conforms_to(&schema));
    }

    #[test]
    fn conforms_requires_exact_attribute_set() {
        let v = Value::object_from([("a", Value::string("x"))]);
        assert!(!v.conforms_to(&Type::object([("a", Type::String), ("b", Type::String)])));
        assert!(!v.conforms_to(&Type::object([("b", Type::String)])));
        assert!(!v.conforms_to(&Type::object([("a", Type::Number)])));
    }

    #[test]
    fn conforms_requires_equal_tuple_length() {
        let v = Value::tuple(vec![Value::string("a")]);
        assert!(v.conforms_to(&Type::Tuple(vec![Type::String])));
        assert!(!v.conforms_to(&Type::Tuple(vec![Type::String, Type::String])));
    }

    #[test]
    fn null_conforms_to_its_type() {
        let v = Value::null(Type::String);
        assert!(v.is_null());
        assert_eq!(v.kind_name(), "null");
        assert!(v.conforms_to(&Type::String));
        assert!(!v.conforms_to(&Type::Bool));
    }
}
