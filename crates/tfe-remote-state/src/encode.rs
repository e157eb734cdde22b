//! Type inference and encoding of untyped state outputs.
//!
//! Each output value is walked once, and the value and its descriptor are
//! built in the same step (see [`Value`]), so the inferred schema always
//! matches the encoded data. The outputs are then placed in the
//! `payload` hole of the envelope:
//!
//! ```text
//! {workspace: string, organization: string, payload: dynamic}
//! ```
//!
//! ## Supported kinds
//!
//! | input               | descriptor          |
//! |---------------------|---------------------|
//! | string              | `string`            |
//! | integer / float     | `number`            |
//! | bool                | `bool`              |
//! | list of strings     | `tuple[string; n]`  |
//!
//! Lists with any other element kind fail with `UnsupportedElementKind`.
//! Top-level nulls and maps are handled per [`UnsupportedKindPolicy`].

use std::collections::BTreeMap;

use tracing::warn;

use crate::config::UnsupportedKindPolicy;
use crate::dynamic::DynamicValue;
use crate::dynamic::json_kind;
use crate::error::RemoteStateError;
use crate::error::Result;
use crate::types::Type;
use crate::value::Number;
use crate::value::Value;

/// An output left out of the payload because of its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOutput {
    pub name: String,
    pub kind: &'static str,
}

/// Encoded outputs, ready to be placed in the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Object value holding every encoded output. Its type is the inferred
    /// payload descriptor.
    pub value: Value,
    /// Outputs dropped under [`UnsupportedKindPolicy::Skip`].
    pub skipped: Vec<SkippedOutput>,
}

impl EncodedPayload {
    /// Inferred descriptor of the payload object.
    pub fn ty(&self) -> &Type {
        self.value.ty()
    }
}

/// Encode one untyped value.
///
/// Returns `Ok(None)` for kinds with no encoding (null, map).
pub fn encode_value(value: &serde_json::Value) -> Result<Option<Value>> {
    match value {
        serde_json::Value::String(s) => Ok(Some(Value::string(s.as_str()))),
        serde_json::Value::Number(n) => Number::from_json(n)
            .map(|n| Some(Value::number(n)))
            .ok_or_else(|| RemoteStateError::encoding(format!("number {n} is not finite"))),
        serde_json::Value::Bool(b) => Ok(Some(Value::bool(*b))),
        serde_json::Value::Array(elements) => encode_list(elements).map(Some),
        serde_json::Value::Null | serde_json::Value::Object(_) => Ok(None),
    }
}

fn encode_list(elements: &[serde_json::Value]) -> Result<Value> {
    let mut encoded = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        match element {
            serde_json::Value::String(s) => encoded.push(Value::string(s.as_str())),
            other => {
                return Err(RemoteStateError::UnsupportedElementKind {
                    index,
                    kind: json_kind(other),
                });
            }
        }
    }
    Ok(Value::tuple(encoded))
}

/// Encode named outputs into one payload object.
///
/// # Errors
///
/// - `EncodingFailure` when an output cannot be encoded (the message names
///   the output)
/// - `UnsupportedKind` when an output has no encoding and `policy` is
///   [`UnsupportedKindPolicy::Error`]
pub fn encode_outputs<'a, I>(outputs: I, policy: UnsupportedKindPolicy) -> Result<EncodedPayload>
where
    I: IntoIterator<Item = (&'a str, &'a serde_json::Value)>,
{
    let mut attributes = BTreeMap::new();
    let mut skipped = Vec::new();

    for (name, raw) in outputs {
        let encoded = encode_value(raw)
            .map_err(|e| RemoteStateError::encoding(format!("output '{name}': {e}")))?;
        match encoded {
            Some(value) => {
                attributes.insert(name.to_string(), value);
            }
            None => {
                let kind = json_kind(raw);
                if policy == UnsupportedKindPolicy::Error {
                    return Err(RemoteStateError::UnsupportedKind {
                        field: name.to_string(),
                        kind,
                    });
                }
                warn!(output = %name, kind, "skipping output of unsupported kind");
                skipped.push(SkippedOutput {
                    name: name.to_string(),
                    kind,
                });
            }
        }
    }

    Ok(EncodedPayload {
        value: Value::object(attributes),
        skipped,
    })
}

/// Static envelope schema with a dynamic payload hole.
pub fn envelope_schema() -> Type {
    Type::object([
        ("workspace", Type::String),
        ("organization", Type::String),
        ("payload", Type::Dynamic),
    ])
}

/// Wrap an encoded payload in the envelope and serialize it.
///
/// The concrete value carries the inferred payload type; it is serialized
/// against [`envelope_schema`], so the host receives both levels.
pub fn build_envelope(organization: &str, workspace: &str, payload: &EncodedPayload) -> Result<DynamicValue> {
    let envelope = Value::object_from([
        ("workspace", Value::string(workspace)),
        ("organization", Value::string(organization)),
        ("payload", payload.value.clone()),
    ]);
    DynamicValue::new(&envelope_schema(), &envelope)
}
