//! `remote_state` data source for a plugin host.
//!
//! Answers read requests by fetching a remote workspace's state outputs and
//! returning them as a self-describing dynamic value, wrapped in an envelope
//! with a fixed outer shape:
//!
//! ```text
//! {workspace: string, organization: string, payload: dynamic}
//! ```
//!
//! ## Request Flow
//!
//! 1. The host's config and provider-meta records are decoded against their
//!    schemas and the required fields are extracted (`extract`)
//! 2. An injected [`StateOutputProvider`] fetches the outputs (`state`)
//! 3. Each output is encoded with an inferred type descriptor (`encode`)
//! 4. The envelope is serialized against its static schema, with the payload
//!    hole refined to the inferred type (`dynamic`)
//!
//! Failures come back as [`Diagnostic`]s on the response and on the
//! per-request [`DiagnosticSink`]; the data source keeps serving.

pub mod config;
mod data_source;
pub mod diagnostics;
mod dynamic;
pub mod encode;
mod error;
pub mod extract;
pub mod state;
mod types;
mod value;

pub use config::DataSourceOptions;
pub use config::UnsupportedKindPolicy;
pub use data_source::DataSource;
pub use data_source::ReadDataSourceRequest;
pub use data_source::ReadDataSourceResponse;
pub use data_source::RemoteStateDataSource;
pub use data_source::ValidateDataSourceConfigRequest;
pub use data_source::ValidateDataSourceConfigResponse;
pub use diagnostics::Diagnostic;
pub use diagnostics::DiagnosticSink;
pub use diagnostics::Severity;
pub use dynamic::DynamicValue;
pub use error::RemoteStateError;
pub use error::Result;
pub use state::StateOutputProvider;
pub use types::Type;
pub use value::Data;
pub use value::Number;
pub use value::Value;

/// Test utilities shared by unit and integration tests.
///
/// Provides a sample state document and helpers for building host requests
/// from JSON.
#[cfg(any(test, feature = "testing"))]
pub mod test_support {
    use serde_json::json;

    pub use crate::diagnostics::CollectingSink;
    use crate::dynamic::DynamicValue;
    use crate::state::OutputValue;
    use crate::state::RemoteStateFile;
    pub use crate::state::StaticStateProvider;

    /// Outputs of the sample workspace: a string list, a number and a bool.
    pub fn sample_state() -> RemoteStateFile {
        state_from_values(json!({
            "foo": ["a", "b", "c"],
            "hello": 123,
            "quuz": false,
        }))
    }

    /// Build a state document from a JSON object of output values.
    ///
    /// Panics if `values` is not an object.
    pub fn state_from_values(values: serde_json::Value) -> RemoteStateFile {
        match values {
            serde_json::Value::Object(values) => RemoteStateFile {
                outputs: values.into_iter().map(|(name, value)| (name, OutputValue::untyped(value))).collect(),
            },
            other => panic!("state_from_values expects a JSON object, got {other}"),
        }
    }

    /// Host-encoded record from a JSON object.
    pub fn record(json: serde_json::Value) -> DynamicValue {
        DynamicValue::from_json(json.to_string())
    }
}
