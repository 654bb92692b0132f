//! # Error Types
//!
//! Error taxonomy for the operator. Absence (404 on get/delete/status) is
//! modeled as `Option` at the call sites, not as an error.

use thiserror::Error;

/// Errors surfaced by operator components.
///
/// Knowledge-base failures are a dedicated variant so that reconcile handlers
/// can route them to the `knowledgeBase` status sub-field by kind instead of
/// matching on message text.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Malformed resource payload or ConfigMap entry
    #[error("invalid payload: {0}")]
    Decode(String),

    /// Non-404 cluster API failure, carrying the HTTP status code
    #[error("cluster API request failed with status {0}")]
    External(u16),

    /// Cluster client failure below the HTTP layer (connection, auth setup)
    #[error("cluster client error: {0}")]
    Client(String),

    /// Knowledge-base resolution failure, routed to the KB status sub-field
    #[error("{0}")]
    KnowledgeBase(String),

    /// Domain-level failure (missing foundation-model service, missing
    /// pipeline, timeout waiting for a run)
    #[error("{0}")]
    Domain(String),

    /// Download exceeds the configured size limit
    #[error("{0}")]
    SizeExceeded(String),

    /// Non-200 success status returned by a pipeline source
    #[error("Unexpected status code {0} returned in response")]
    UnexpectedResponse(u16),

    /// HTTP error status (4xx/5xx) returned by a remote service
    #[error("request failed with status {0}")]
    Http(u16),

    /// Subprocess invocation failed
    #[error("`{command}` failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl OperatorError {
    /// Build the knowledge-base variant with the conventional message prefix.
    pub fn knowledge_base(message: impl std::fmt::Display) -> Self {
        Self::KnowledgeBase(format!("Knowledge base {message}"))
    }
}

impl From<kube::Error> for OperatorError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => Self::External(response.code),
            other => Self::Client(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<serde_yaml::Error> for OperatorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T, E = OperatorError> = std::result::Result<T, E>;
