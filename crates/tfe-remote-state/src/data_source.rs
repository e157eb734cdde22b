//! `remote_state` data source handler.
//!
//! `RemoteStateDataSource` implements [`DataSource`] so the host can route
//! read requests to it. One read goes through:
//!
//! 1. provider meta (if sent and not null) → [`ProviderMeta`]; an invalid
//!    record only adds a warning
//! 2. config → [`DataSourceConfig`]
//! 3. [`StateOutputProvider::fetch_outputs`], bounded by the fetch timeout
//! 4. [`encode_outputs`] → payload object with an inferred descriptor
//! 5. [`build_envelope`] → [`DynamicValue`] against the envelope schema
//!
//! Any later failure ends the request with an error diagnostic; the
//! handler itself stays usable for the next request.

use tracing::debug;
use tracing::warn;

use crate::config::DATA_SOURCE_TYPE_NAME;
use crate::config::DataSourceOptions;
use crate::diagnostics::Diagnostic;
use crate::diagnostics::DiagnosticSink;
use crate::dynamic::DynamicValue;
use crate::encode::build_envelope;
use crate::encode::encode_outputs;
use crate::extract::DataSourceConfig;
use crate::extract::ProviderMeta;
use crate::extract::data_source_config_type;
use crate::extract::provider_meta_type;
use crate::state::RemoteStateFile;
use crate::state::StateOutputProvider;
use crate::state::StateQuery;

/// Request to read a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDataSourceRequest {
    /// Data source type the host is reading.
    pub type_name: String,
    /// Data source configuration.
    pub config: DynamicValue,
    /// Provider-level metadata, when the host supplies it.
    pub provider_meta: Option<DynamicValue>,
}

/// Result of a read: encoded state, diagnostics, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadDataSourceResponse {
    pub state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReadDataSourceResponse {
    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Request to validate a data source configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateDataSourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateDataSourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// A data source the host can read.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Type name requests are routed by.
    fn type_name(&self) -> &'static str;

    /// Read the data source.
    ///
    /// Failures are reported as diagnostics in the response and on `sink`.
    async fn read_data_source(
        &self,
        request: ReadDataSourceRequest,
        sink: &dyn DiagnosticSink,
    ) -> ReadDataSourceResponse;

    /// Validate a configuration before planning.
    async fn validate_data_source_config(
        &self,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse::default()
    }
}

/// Reads the outputs of a remote workspace's state.
pub struct RemoteStateDataSource<P> {
    provider: P,
    options: DataSourceOptions,
}

impl<P: StateOutputProvider> RemoteStateDataSource<P> {
    /// Create a data source with default options.
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, DataSourceOptions::default())
    }

    pub fn with_options(provider: P, options: DataSourceOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &DataSourceOptions {
        &self.options
    }

    async fn fetch(&self, query: &StateQuery) -> anyhow::Result<RemoteStateFile> {
        let Some(timeout) = self.options.fetch_timeout() else {
            return self.provider.fetch_outputs(query).await;
        };
        tokio::time::timeout(timeout, self.provider.fetch_outputs(query)).await.map_err(|_| {
            warn!(
                organization = %query.organization,
                workspace = %query.workspace,
                timeout_secs = timeout.as_secs(),
                "remote state fetch exceeded timeout"
            );
            anyhow::anyhow!("fetching remote state exceeded timeout of {}s", timeout.as_secs())
        })?
    }

    /// Run one read. Warnings are pushed onto `warnings` as they come up; the
    /// error diagnostic that ends the request is returned as `Err`.
    async fn read(
        &self,
        request: &ReadDataSourceRequest,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<DynamicValue, Diagnostic> {
        // Invalid meta is a warning; the read continues without connection settings.
        let connection = match request.provider_meta.as_ref().map(retrieve_meta) {
            None => None,
            Some(Ok(meta)) => meta,
            Some(Err(e)) => {
                warn!(error = %e, "ignoring invalid provider meta");
                warnings.push(Diagnostic::warning(
                    "Error retrieving provider metadata",
                    format!("Error retrieving provider metadata: {e}"),
                ));
                None
            }
        };

        let config = retrieve_config(&request.config).map_err(|e| {
            Diagnostic::error(
                "Error retrieving values from the config",
                format!("Error retrieving values from the config: {e}"),
            )
        })?;

        if config.state_output.is_some() {
            warnings.push(Diagnostic::warning(
                "Ignoring state_output in config",
                "state_output is computed by the data source; the configured value is ignored",
            ));
        }

        let query = StateQuery {
            organization: config.organization,
            workspace: config.workspace,
            connection,
        };
        debug!(organization = %query.organization, workspace = %query.workspace, "reading remote state");

        let state = self.fetch(&query).await.map_err(|e| {
            Diagnostic::error("Error reading remote state", format!("Error reading remote state: {e}"))
        })?;

        let payload = encode_outputs(state.values(), self.options.unsupported_kind).map_err(encoding_error)?;
        for skipped in &payload.skipped {
            warnings.push(Diagnostic::warning(
                "Skipping unsupported output",
                format!("output '{}' has unsupported kind {} and was left out of the payload", skipped.name, skipped.kind),
            ));
        }

        let envelope = build_envelope(&query.organization, &query.workspace, &payload).map_err(encoding_error)?;
        debug!(
            organization = %query.organization,
            workspace = %query.workspace,
            outputs = state.outputs.len(),
            skipped = payload.skipped.len(),
            "encoded remote state"
        );

        Ok(envelope)
    }
}

#[async_trait::async_trait]
impl<P: StateOutputProvider> DataSource for RemoteStateDataSource<P> {
    fn type_name(&self) -> &'static str {
        DATA_SOURCE_TYPE_NAME
    }

    async fn read_data_source(
        &self,
        request: ReadDataSourceRequest,
        sink: &dyn DiagnosticSink,
    ) -> ReadDataSourceResponse {
        let mut diagnostics = Vec::new();
        let state = match self.read(&request, &mut diagnostics).await {
            Ok(envelope) => Some(envelope),
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                None
            }
        };
        let response = ReadDataSourceResponse { state, diagnostics };
        for diagnostic in &response.diagnostics {
            sink.emit(diagnostic);
        }
        response
    }
}

fn retrieve_config(config: &DynamicValue) -> crate::Result<DataSourceConfig> {
    let record = config.unmarshal(&data_source_config_type())?;
    DataSourceConfig::from_record(&record)
}

/// A null record means no provider meta block is configured.
fn retrieve_meta(meta: &DynamicValue) -> crate::Result<Option<ProviderMeta>> {
    let record = meta.unmarshal(&provider_meta_type())?;
    if record.is_null() {
        return Ok(None);
    }
    let meta = ProviderMeta::from_record(&record)?;
    debug!(hostname = %meta.hostname, ssl_skip_verify = meta.ssl_skip_verify, "retrieved provider meta");
    Ok(Some(meta))
}

fn encoding_error(e: crate::RemoteStateError) -> Diagnostic {
    Diagnostic::error("Error encoding state", format!("Error encoding state: {e}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::CollectingSink;
    use crate::test_support::StaticStateProvider;
    use crate::test_support::record;
    use crate::test_support::sample_state;
    use crate::test_support::state_from_values;

    fn request(config: serde_json::Value) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: DATA_SOURCE_TYPE_NAME.to_string(),
            config: record(config),
            provider_meta: None,
        }
    }

    fn provider(outputs: serde_json::Value) -> StaticStateProvider {
        StaticStateProvider::new(state_from_values(outputs))
    }

    #[tokio::test]
    async fn read_returns_envelope() {
        let ds = RemoteStateDataSource::new(provider(json!({"hello": "world"})));
        let sink = CollectingSink::new();
        let response = ds
            .read_data_source(request(json!({"organization": "acme", "workspace": "prod"})), &sink)
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state.expect("state present");
        let json: serde_json::Value = serde_json::from_slice(state.as_bytes()).expect("valid JSON");
        assert_eq!(json["organization"], "acme");
        assert_eq!(json["workspace"], "prod");
        assert_eq!(json["payload"]["value"]["hello"], "world");
        assert!(sink.drain().is_empty());
    }

    #[tokio::test]
    async fn sample_state_reads() {
        let ds = RemoteStateDataSource::new(StaticStateProvider::new(sample_state()));
        let response = ds
            .read_data_source(request(json!({"organization": "acme", "workspace": "prod"})), &CollectingSink::new())
            .await;

        let json: serde_json::Value =
            serde_json::from_slice(response.state.expect("state present").as_bytes()).expect("valid JSON");
        assert_eq!(json["payload"]["value"]["hello"], 123);
        assert_eq!(json["payload"]["type"], json!(["object", {
            "foo": ["tuple", ["string", "string", "string"]],
            "hello": "number",
            "quuz": "bool",
        }]));
    }

    #[tokio::test]
    async fn missing_workspace_is_an_error_diagnostic() {
        let ds = RemoteStateDataSource::new(provider(json!({})));
        let sink = CollectingSink::new();
        let response = ds.read_data_source(request(json!({"organization": "acme"})), &sink).await;

        assert!(response.state.is_none());
        assert!(response.has_errors());
        let diag = &response.diagnostics[0];
        assert_eq!(diag.summary, "Error retrieving values from the config");
        assert!(diag.detail.contains("missing required attribute 'workspace'"), "{}", diag.detail);
        assert_eq!(sink.drain(), response.diagnostics);
    }

    #[tokio::test]
    async fn state_output_in_config_is_warned_about() {
        let ds = RemoteStateDataSource::new(provider(json!({})));
        let response = ds
            .read_data_source(
                request(json!({"organization": "acme", "workspace": "prod", "state_output": "x"})),
                &CollectingSink::new(),
            )
            .await;

        assert!(response.state.is_some());
        assert!(!response.has_errors());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Ignoring state_output in config");
    }

    #[test]
    fn type_name_is_stable() {
        let ds = RemoteStateDataSource::new(StaticStateProvider::default());
        assert_eq!(ds.type_name(), "tfe_remote_state");
        assert_eq!(ds.options(), &DataSourceOptions::default());
    }
}
