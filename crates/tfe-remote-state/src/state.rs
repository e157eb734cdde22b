//! Remote state documents and the providers that fetch them.
//!
//! Fetching is behind [`StateOutputProvider`] so the data source never
//! talks to the network itself. The host wires in a provider that knows how
//! to reach the remote backend; tests and the stubbed read use
//! [`StaticStateProvider`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::extract::ProviderMeta;

/// The part of a remote state document the data source reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteStateFile {
    /// Root module outputs keyed by name.
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputValue>,
}

/// One output as recorded in state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    /// Type descriptor recorded alongside the value. The encoder infers its
    /// own descriptor from `value`, so this is informational.
    #[serde(rename = "type", default)]
    pub output_type: serde_json::Value,
    /// Untyped output value.
    pub value: serde_json::Value,
}

impl OutputValue {
    /// Output with no recorded type.
    pub fn untyped(value: serde_json::Value) -> Self {
        Self {
            output_type: serde_json::Value::Null,
            value,
        }
    }
}

impl RemoteStateFile {
    /// Iterate outputs as `(name, untyped value)`.
    pub fn values(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.outputs.iter().map(|(name, output)| (name.as_str(), &output.value))
    }
}

/// Parse a remote state document.
pub fn parse_state_file(bytes: &[u8]) -> anyhow::Result<RemoteStateFile> {
    serde_json::from_slice(bytes).map_err(|e| anyhow::anyhow!("failed to parse remote state: {e}"))
}

/// Which workspace's state to read, and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateQuery {
    pub organization: String,
    pub workspace: String,
    /// Connection settings from provider meta, when the host sent them.
    pub connection: Option<ProviderMeta>,
}

/// Source of current state outputs for a workspace.
#[async_trait::async_trait]
pub trait StateOutputProvider: Send + Sync {
    /// Fetch the current outputs for `query.workspace` in `query.organization`.
    async fn fetch_outputs(&self, query: &StateQuery) -> anyhow::Result<RemoteStateFile>;
}

#[async_trait::async_trait]
impl<T: StateOutputProvider + ?Sized> StateOutputProvider for Arc<T> {
    async fn fetch_outputs(&self, query: &StateQuery) -> anyhow::Result<RemoteStateFile> {
        (**self).fetch_outputs(query).await
    }
}

/// Provider that serves one fixed state document for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticStateProvider {
    state: RemoteStateFile,
}

impl StaticStateProvider {
    pub fn new(state: RemoteStateFile) -> Self {
        Self { state }
    }

    /// Build from a remote state document.
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        parse_state_file(bytes).map(Self::new)
    }
}

#[async_trait::async_trait]
impl StateOutputProvider for StaticStateProvider {
    async fn fetch_outputs(&self, query: &StateQuery) -> anyhow::Result<RemoteStateFile> {
        tracing::debug!(
            organization = %query.organization,
            workspace = %query.workspace,
            outputs = self.state.outputs.len(),
            "serving static remote state"
        );
        Ok(self.state.clone())
    }
}
