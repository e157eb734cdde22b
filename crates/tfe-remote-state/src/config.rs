//! Data source options and constants.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Type name the host uses to route reads to this data source.
pub const DATA_SOURCE_TYPE_NAME: &str = "tfe_remote_state";

/// Default wall-clock bound for one state fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// What to do with a top-level output whose kind the encoder does not handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedKindPolicy {
    /// Drop the output and report a warning diagnostic.
    #[default]
    Skip,
    /// Fail the read.
    Error,
}

/// Per-instance options for [`RemoteStateDataSource`](crate::RemoteStateDataSource).
///
/// Every field has a default, so `{}` is a valid options document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSourceOptions {
    /// Handling of outputs with unsupported kinds.
    pub unsupported_kind: UnsupportedKindPolicy,
    /// Fetch timeout in seconds. Zero disables the bound.
    pub fetch_timeout_secs: u64,
}

impl Default for DataSourceOptions {
    fn default() -> Self {
        Self {
            unsupported_kind: UnsupportedKindPolicy::default(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl DataSourceOptions {
    /// Parse options from a JSON document.
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| anyhow::anyhow!("invalid data source options: {e}"))
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let options = DataSourceOptions::from_json(b"{}").expect("empty options parse");
        assert_eq!(options, DataSourceOptions::default());
        assert_eq!(options.fetch_timeout(), Some(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)));
    }

    #[test]
    fn policy_parses_snake_case() {
        let options = DataSourceOptions::from_json(br#"{"unsupported_kind": "error"}"#).expect("options parse");
        assert_eq!(options.unsupported_kind, UnsupportedKindPolicy::Error);
    }

    #[test]
    fn zero_timeout_disables_bound() {
        let options = DataSourceOptions::from_json(br#"{"fetch_timeout_secs": 0}"#).expect("options parse");
        assert_eq!(options.fetch_timeout(), None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = DataSourceOptions::from_json(br#"{"retries": 3}"#).expect_err("unknown option");
        assert!(err.to_string().contains("invalid data source options"));
    }
}
