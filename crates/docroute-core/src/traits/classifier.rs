//! Classification collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::routing::{AnalysisContext, RoutingDecision};

/// Error returned by a [`Classifier`] call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifyError {
    /// The call did not complete within its timeout.
    #[error("classification timed out")]
    Timeout,
    /// The service answered but the answer could not be parsed or lacked
    /// required fields.
    #[error("malformed classification response: {0}")]
    Malformed(String),
    /// The service answered with a retryable non-success status.
    #[error("classification service returned {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },
    /// The request never reached the service.
    #[error("classification transport error: {0}")]
    Transport(String),
    /// The service refused this input outright; retrying cannot help.
    #[error("classification rejected: {0}")]
    Rejected(String),
}

impl ClassifyError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// The external AI reasoning service.
#[async_trait]
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Decide whether a document belongs in the inbox or the archive.
    async fn classify(&self, text: &str) -> Result<RoutingDecision, ClassifyError>;

    /// Produce a structured analysis of a document.
    async fn analyze(&self, text: &str, context: &AnalysisContext) -> Result<Value, ClassifyError>;
}
