//! Error type shared by the extractor, the encoder and the wire codec.

use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, RemoteStateError>;

/// Errors produced while decoding host records and encoding state outputs.
///
/// Every variant is recoverable: the data source turns it into an error
/// diagnostic for the current request and keeps serving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteStateError {
    /// A required attribute was absent from a decoded record.
    #[error("missing required attribute '{field}'")]
    MissingField {
        /// Attribute name.
        field: String,
    },
    /// An attribute was present but held the wrong kind of value.
    #[error("attribute '{field}' has wrong type: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Attribute name.
        field: String,
        /// Expected scalar kind.
        expected: &'static str,
        /// Kind actually found.
        actual: &'static str,
    },
    /// A list element had a kind the tuple encoder does not handle.
    #[error("unsupported element kind {kind} at index {index}")]
    UnsupportedElementKind {
        /// Position of the offending element.
        index: usize,
        /// Kind of the offending element.
        kind: &'static str,
    },
    /// A top-level output had an unsupported kind and the policy rejects it.
    #[error("output '{field}' has unsupported kind {kind}")]
    UnsupportedKind {
        /// Output name.
        field: String,
        /// Kind of the output value.
        kind: &'static str,
    },
    /// A value could not be assembled or serialized.
    #[error("encoding failed: {reason}")]
    EncodingFailure {
        /// What went wrong.
        reason: String,
    },
    /// Wire bytes did not match the schema they were decoded against.
    #[error("decode failed at {path}: {reason}")]
    Decode {
        /// Attribute path to the failing position.
        path: String,
        /// What went wrong.
        reason: String,
    },
    /// A JSON type descriptor was malformed.
    #[error("invalid type descriptor: {0}")]
    InvalidType(String),
}

impl RemoteStateError {
    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Self::EncodingFailure { reason: reason.into() }
    }

    pub(crate) fn decode(path: &str, reason: impl Into<String>) -> Self {
        let path = if path.is_empty() { "<root>" } else { path };
        Self::Decode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
