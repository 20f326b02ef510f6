//! Per-file outcomes and the job summary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use docroute_core::types::{Routing, RoutingDecision};

/// Whether a single file was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Classified or analyzed, possibly with the safe default.
    Success,
    /// Could not be handled.
    Error,
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Original filename.
    pub filename: String,
    /// Success or error.
    pub status: OutcomeStatus,
    /// The safe-default substitute was used.
    #[serde(default)]
    pub defaulted: bool,
    /// Routing of a classified file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<Routing>,
    /// Classification or analysis payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Value>,
    /// Leading excerpt of the extracted text (analyze jobs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    /// Outcome of a classified file.
    pub fn classified(filename: impl Into<String>, decision: &RoutingDecision, defaulted: bool) -> Self {
        Self {
            filename: filename.into(),
            status: OutcomeStatus::Success,
            defaulted,
            routing: Some(decision.routing),
            classification: serde_json::to_value(decision).ok(),
            extracted_text: None,
            error: None,
        }
    }

    /// Outcome of an analyzed file.
    pub fn analyzed(
        filename: impl Into<String>,
        analysis: Value,
        excerpt: String,
        defaulted: bool,
    ) -> Self {
        Self {
            filename: filename.into(),
            status: OutcomeStatus::Success,
            defaulted,
            routing: None,
            classification: Some(analysis),
            extracted_text: Some(excerpt),
            error: None,
        }
    }

    /// Outcome of a file that could not be handled.
    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: OutcomeStatus::Error,
            defaulted: false,
            routing: None,
            classification: None,
            extracted_text: None,
            error: Some(error.into()),
        }
    }

    /// Check if the file was handled.
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Terminal result of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Files submitted.
    pub total_files: usize,
    /// Files with a success outcome.
    pub successful: usize,
    /// Files with an error outcome.
    pub failed: usize,
    /// Successful files that used the safe default.
    pub defaulted: usize,
    /// Files routed to the inbox (classify jobs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox_count: Option<usize>,
    /// Files routed to the archive, errors included (classify jobs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_count: Option<usize>,
    /// Outcomes in submission order.
    pub results: Vec<FileOutcome>,
    /// Wall-clock processing time in seconds.
    pub processing_time: f64,
}
