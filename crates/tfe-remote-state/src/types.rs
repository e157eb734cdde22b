//! Type descriptors for self-describing dynamic values.
//!
//! A [`Type`] is the shape half of every value sent to the host. Static
//! schemas may leave holes typed [`Type::Dynamic`]; concrete values always
//! carry a fully resolved type.
//!
//! ## JSON Encoding
//!
//! Types travel as JSON next to the values they describe:
//!
//! - `"string"`, `"number"`, `"bool"`, `"dynamic"`
//! - `["tuple", [<element types>]]`
//! - `["object", {"<attribute>": <type>}]`

use std::collections::BTreeMap;
use std::fmt;

use serde_json::json;

use crate::error::RemoteStateError;
use crate::error::Result;

/// Shape of a value on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// UTF-8 string.
    String,
    /// Arbitrary-precision number.
    Number,
    /// Boolean.
    Bool,
    /// Fixed-length sequence with one type per position.
    Tuple(Vec<Type>),
    /// Fixed set of named attributes.
    Object(BTreeMap<String, Type>),
    /// Placeholder resolved from the value at encode time.
    Dynamic,
}

impl Type {
    /// Build an object type from `(name, type)` pairs.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Type)>,
        K: Into<String>,
    {
        Type::Object(attributes.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// Whether this type or any nested type is [`Type::Dynamic`].
    pub fn contains_dynamic(&self) -> bool {
        match self {
            Type::Dynamic => true,
            Type::Tuple(elements) => elements.iter().any(Type::contains_dynamic),
            Type::Object(attributes) => attributes.values().any(Type::contains_dynamic),
            Type::String | Type::Number | Type::Bool => false,
        }
    }

    /// Encode this type as its JSON descriptor.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Type::String => json!("string"),
            Type::Number => json!("number"),
            Type::Bool => json!("bool"),
            Type::Dynamic => json!("dynamic"),
            Type::Tuple(elements) => {
                json!(["tuple", elements.iter().map(Type::to_json).collect::<Vec<_>>()])
            }
            Type::Object(attributes) => {
                let attrs: serde_json::Map<String, serde_json::Value> =
                    attributes.iter().map(|(name, ty)| (name.clone(), ty.to_json())).collect();
                json!(["object", attrs])
            }
        }
    }

    /// Parse a JSON type descriptor.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(name) => match name.as_str() {
                "string" => Ok(Type::String),
                "number" => Ok(Type::Number),
                "bool" => Ok(Type::Bool),
                "dynamic" => Ok(Type::Dynamic),
                other => Err(RemoteStateError::InvalidType(format!("unknown primitive type '{other}'"))),
            },
            serde_json::Value::Array(parts) => {
                let [kind, inner] = parts.as_slice() else {
                    return Err(RemoteStateError::InvalidType(format!(
                        "expected [kind, detail], got {} items",
                        parts.len()
                    )));
                };
                match (kind.as_str(), inner) {
                    (Some("tuple"), serde_json::Value::Array(elements)) => {
                        let elements = elements.iter().map(Type::from_json).collect::<Result<Vec<_>>>()?;
                        Ok(Type::Tuple(elements))
                    }
                    (Some("object"), serde_json::Value::Object(attrs)) => {
                        let mut attributes = BTreeMap::new();
                        for (name, ty) in attrs {
                            attributes.insert(name.clone(), Type::from_json(ty)?);
                        }
                        Ok(Type::Object(attributes))
                    }
                    _ => Err(RemoteStateError::InvalidType(format!("unsupported structural type {value}"))),
                }
            }
            other => Err(RemoteStateError::InvalidType(format!("unexpected JSON {other}"))),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => f.write_str("string"),
            Type::Number => f.write_str("number"),
            Type::Bool => f.write_str("bool"),
            Type::Dynamic => f.write_str("dynamic"),
            Type::Tuple(elements) => {
                f.write_str("tuple[")?;
                for (i, ty) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str("]")
            }
            Type::Object(attributes) => {
                f.write_str("object{")?;
                for (i, (name, ty)) in attributes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("}")
            }
        }
    }
}
