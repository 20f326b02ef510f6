//! Job state and kind enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use docroute_core::error::AppError;

/// Lifecycle state of a job.
///
/// Stored records may carry the legacy value `"pending"`; it parses to
/// [`JobState::Ready`] so nothing above the store ever sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created by the producer with a complete descriptor list.
    Created,
    /// Marked ready by the producer.
    #[serde(alias = "pending")]
    Ready,
    /// Claimed by a worker.
    Processing,
    /// Finished with a result.
    Completed,
    /// Finished with a failure reason.
    Failed,
}

impl JobState {
    /// States a worker may claim.
    pub const CLAIMABLE: [JobState; 2] = [JobState::Created, JobState::Ready];

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if a worker may claim the job.
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Created | Self::Ready)
    }

    /// Return the canonical stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Ready => "ready",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Every stored string that maps to this state, legacy aliases included.
    pub fn stored_values(&self) -> &'static [&'static str] {
        match self {
            Self::Created => &["created"],
            Self::Ready => &["ready", "pending"],
            Self::Processing => &["processing"],
            Self::Completed => &["completed"],
            Self::Failed => &["failed"],
        }
    }

    /// Stored strings of every claimable state.
    pub fn claimable_stored_values() -> Vec<&'static str> {
        Self::CLAIMABLE
            .iter()
            .flat_map(|s| s.stored_values().iter().copied())
            .collect()
    }

    /// Whether moving from `self` to `next` respects the forward-only
    /// lifecycle.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match (self, next) {
            (Self::Created, Self::Ready) => true,
            (Self::Created | Self::Ready, Self::Processing) => true,
            (Self::Created | Self::Ready | Self::Processing, Self::Failed) => true,
            (Self::Processing, Self::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "ready" | "pending" => Ok(Self::Ready),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::validation(format!("Unknown job status '{other}'"))),
        }
    }
}

/// What the worker does with each file of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Route each document to the inbox or the archive.
    Classify,
    /// Produce a structured analysis of each document.
    Analyze,
}

impl JobKind {
    /// Return the kind as its stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Analyze => "analyze",
        }
    }

    /// Interpret a stored kind. Records without a recognizable kind are
    /// classification jobs.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "analyze" => Self::Analyze,
            _ => Self::Classify,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classify" => Ok(Self::Classify),
            "analyze" => Ok(Self::Analyze),
            other => Err(AppError::validation(format!("Unknown job kind '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_pending_is_ready() {
        assert_eq!("pending".parse::<JobState>().unwrap(), JobState::Ready);
        assert_eq!("PENDING".parse::<JobState>().unwrap(), JobState::Ready);
        let from_json: JobState = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(from_json, JobState::Ready);
        assert_eq!(JobState::Ready.as_str(), "ready");
    }

    #[test]
    fn test_claimable_values_cover_alias() {
        let values = JobState::claimable_stored_values();
        assert_eq!(values, vec!["created", "ready", "pending"]);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("queued".parse::<JobState>().is_err());
    }

    #[test]
    fn test_transitions_are_forward_only() {
        assert!(JobState::Ready.can_transition_to(JobState::Processing));
        assert!(JobState::Processing.can_transition_to(JobState::Completed));
        assert!(JobState::Processing.can_transition_to(JobState::Failed));
        assert!(!JobState::Completed.can_transition_to(JobState::Processing));
        assert!(!JobState::Failed.can_transition_to(JobState::Completed));
        assert!(!JobState::Processing.can_transition_to(JobState::Ready));
        assert!(!JobState::Ready.can_transition_to(JobState::Completed));
    }

    #[test]
    fn test_kind_defaults_to_classify() {
        assert_eq!(JobKind::from_stored(None), JobKind::Classify);
        assert_eq!(JobKind::from_stored(Some("weird")), JobKind::Classify);
        assert_eq!(JobKind::from_stored(Some("analyze")), JobKind::Analyze);
    }
}
