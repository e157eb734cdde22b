//! Field extraction from host-supplied records.
//!
//! Records arrive as decoded object values. Each requested field is looked
//! up and kind-checked on its own, so one bad field never hides whether
//! another would have extracted. The data source config and the provider
//! meta both go through the same [`extract_field`] path, one field at a
//! time in declaration order.

use std::fmt;

use crate::error::RemoteStateError;
use crate::error::Result;
use crate::types::Type;
use crate::value::Number;
use crate::value::Value;

/// Scalar kinds a field may be required to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    Bool,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Bool => "bool",
        }
    }
}

/// An extracted scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::String(_) => ScalarKind::String,
            Scalar::Number(_) => ScalarKind::Number,
            Scalar::Bool(_) => ScalarKind::Bool,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// One field to extract: its name and the kind it must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ScalarKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: ScalarKind) -> Self {
        Self { name, kind }
    }
}

/// Extract a single field from `record`.
///
/// # Errors
///
/// - `MissingField` if the attribute is absent
/// - `TypeMismatch` if it is present but not of `spec.kind` (null included)
pub fn extract_field(record: &Value, spec: FieldSpec) -> Result<Scalar> {
    let attributes = record.as_object().ok_or_else(|| RemoteStateError::TypeMismatch {
        field: "<record>".to_string(),
        expected: "object",
        actual: record.kind_name(),
    })?;
    let value = attributes.get(spec.name).ok_or_else(|| RemoteStateError::MissingField {
        field: spec.name.to_string(),
    })?;

    let scalar = match spec.kind {
        ScalarKind::String => value.as_str().map(|s| Scalar::String(s.to_string())),
        ScalarKind::Number => value.as_number().cloned().map(Scalar::Number),
        ScalarKind::Bool => value.as_bool().map(Scalar::Bool),
    };
    scalar.ok_or_else(|| RemoteStateError::TypeMismatch {
        field: spec.name.to_string(),
        expected: spec.kind.name(),
        actual: value.kind_name(),
    })
}

/// Extract every field in `specs`, in order.
///
/// Returns the scalars in the same order as `specs`, or the first failure.
pub fn extract_fields(record: &Value, specs: &[FieldSpec]) -> Result<Vec<Scalar>> {
    specs.iter().map(|spec| extract_field(record, *spec)).collect()
}

/// Extract `spec` and require the result to be a string.
fn extract_string(record: &Value, spec: FieldSpec) -> Result<String> {
    match extract_field(record, spec)? {
        Scalar::String(s) => Ok(s),
        other => Err(scalar_mismatch(spec, ScalarKind::String, &other)),
    }
}

/// Extract `spec` and require the result to be a bool.
fn extract_bool(record: &Value, spec: FieldSpec) -> Result<bool> {
    match extract_field(record, spec)? {
        Scalar::Bool(b) => Ok(b),
        other => Err(scalar_mismatch(spec, ScalarKind::Bool, &other)),
    }
}

fn scalar_mismatch(spec: FieldSpec, expected: ScalarKind, actual: &Scalar) -> RemoteStateError {
    RemoteStateError::TypeMismatch {
        field: spec.name.to_string(),
        expected: expected.name(),
        actual: actual.kind().name(),
    }
}

/// Read an optional string attribute: absent and null both give `None`.
fn extract_optional_string(record: &Value, name: &'static str) -> Result<Option<String>> {
    match record.get(name) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(_) => extract_string(record, FieldSpec::new(name, ScalarKind::String)).map(Some),
    }
}

const ORGANIZATION: FieldSpec = FieldSpec::new("organization", ScalarKind::String);
const WORKSPACE: FieldSpec = FieldSpec::new("workspace", ScalarKind::String);
const HOSTNAME: FieldSpec = FieldSpec::new("hostname", ScalarKind::String);
const TOKEN: FieldSpec = FieldSpec::new("token", ScalarKind::String);
const SSL_SKIP_VERIFY: FieldSpec = FieldSpec::new("ssl_skip_verify", ScalarKind::Bool);

/// Schema of the data source's own configuration.
pub fn data_source_config_type() -> Type {
    Type::object([
        ("workspace", Type::String),
        ("organization", Type::String),
        ("state_output", Type::String),
    ])
}

/// Schema of the provider-level metadata record.
pub fn provider_meta_type() -> Type {
    Type::object([
        ("hostname", Type::String),
        ("token", Type::String),
        ("ssl_skip_verify", Type::Bool),
    ])
}

/// Configuration of one `remote_state` read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceConfig {
    pub organization: String,
    pub workspace: String,
    /// Reserved attribute. It is computed, so a value set in config is
    /// reported back as ignored.
    pub state_output: Option<String>,
}

impl DataSourceConfig {
    pub fn from_record(record: &Value) -> Result<Self> {
        let organization = extract_string(record, ORGANIZATION)?;
        let workspace = extract_string(record, WORKSPACE)?;
        let state_output = extract_optional_string(record, "state_output")?;
        Ok(Self {
            organization,
            workspace,
            state_output,
        })
    }
}

/// Connection settings the host supplies alongside the data source config.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderMeta {
    pub hostname: String,
    pub token: String,
    pub ssl_skip_verify: bool,
}

impl ProviderMeta {
    pub fn from_record(record: &Value) -> Result<Self> {
        Ok(Self {
            hostname: extract_string(record, HOSTNAME)?,
            token: extract_string(record, TOKEN)?,
            ssl_skip_verify: extract_bool(record, SSL_SKIP_VERIFY)?,
        })
    }
}

impl fmt::Debug for ProviderMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderMeta")
            .field("hostname", &self.hostname)
            .field("token", &"<redacted>")
            .field("ssl_skip_verify", &self.ssl_skip_verify)
            .finish()
    }
}
